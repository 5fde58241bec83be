// harvester.rs
//
// Fetches the listing index (with WordPress pagination) and the individual
// detail pages. All fetching is strictly sequential with a courtesy delay
// between requests.

use crate::config::{Config, LIST_PATH};
use crate::scrape::ScrapeError;
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

/// Hard cap on index pages; more than 240 listings is not plausible for
/// this site, so anything past this is a pagination loop.
const MAX_INDEX_PAGES: usize = 20;

/// A full index page carries 12 listing cards. Fewer than that without a
/// "next" link means we are on the last page.
const FULL_PAGE_LINKS: usize = 12;

/// One discovered listing link plus whatever the index page showed inline.
#[derive(Debug, Clone)]
pub struct ListingLink {
    pub url: String,
    pub title: Option<String>,
}

pub struct SiteScraper {
    client: Client,
    base_url: url::Url,
    delay: Duration,
}

impl SiteScraper {
    pub fn new(config: &Config) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        let base_url = url::Url::parse(&config.base_url)
            .map_err(|_| ScrapeError::MalformedUrl(config.base_url.clone()))?;

        Ok(Self {
            client,
            base_url,
            delay: config.request_delay,
        })
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    /// Walk the paginated index and collect every detail link, deduplicated
    /// in discovery order. A fetch failure on the first page is fatal; a 404
    /// on a later page just means the pagination ran out.
    pub fn collect_detail_links(&self) -> Result<Vec<ListingLink>, ScrapeError> {
        let mut all_links: Vec<ListingLink> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut page = 1;

        loop {
            let page_url = if page == 1 {
                format!("{}{}", self.base_url.as_str().trim_end_matches('/'), LIST_PATH)
            } else {
                format!(
                    "{}{}page/{}/",
                    self.base_url.as_str().trim_end_matches('/'),
                    LIST_PATH,
                    page
                )
            };

            eprintln!("📄 Index page {page}: {page_url}");

            let html = match self.fetch_html(&page_url) {
                Ok(html) => html,
                Err(ScrapeError::HttpStatus { status: 404, .. }) => {
                    eprintln!("🏁 Page {page} not found, end of pagination");
                    break;
                }
                Err(e) => return Err(e),
            };

            let page_links = links_from_index(&html, &self.base_url);
            let mut new_on_page = 0;
            for link in page_links {
                if seen.insert(link.url.clone()) {
                    all_links.push(link);
                    new_on_page += 1;
                }
            }

            eprintln!("✅ Page {page}: {new_on_page} new listings");

            if new_on_page == 0 {
                eprintln!("🏁 No new links on page {page}, stopping");
                break;
            }

            if !has_next_page(&html, page) && new_on_page < FULL_PAGE_LINKS {
                eprintln!("🏁 Short page without next link, last page reached");
                break;
            }

            page += 1;
            if page > MAX_INDEX_PAGES {
                eprintln!("⚠️ Stopping at page {MAX_INDEX_PAGES}, pagination cap reached");
                break;
            }
        }

        eprintln!(
            "🏁 Found {} listings across {} index page(s)",
            all_links.len(),
            page
        );
        Ok(all_links)
    }

    pub fn fetch_detail(&self, url: &str) -> Result<String, ScrapeError> {
        self.fetch_html(url)
    }

    fn fetch_html(&self, url: &str) -> Result<String, ScrapeError> {
        std::thread::sleep(self.delay);

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.text().map_err(|e| ScrapeError::Network(e.to_string()))
    }
}

/// Pull `/immobilie/<slug>/` links out of an index page. Pure so it can be
/// tested against a saved fixture.
pub fn links_from_index(html: &str, base: &url::Url) -> Vec<ListingLink> {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for a in doc.select(&sel) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !href.contains("/immobilie/") || href.matches('/').count() < 3 {
            continue;
        }
        // The bare /immobilie/ archive page is not a listing.
        if href.trim_matches('/') == "immobilie" {
            continue;
        }

        let Ok(full) = base.join(href) else { continue };
        let full = full.to_string();
        if !seen.insert(full.clone()) {
            continue;
        }

        // Card links often wrap the listing title; keep it as a provisional
        // title so a thin detail page still yields a usable record.
        let text = a.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let title = (text.chars().count() >= 10).then_some(text);

        links.push(ListingLink { url: full, title });
    }

    links
}

fn has_next_page(html: &str, page: usize) -> bool {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a[href]") else {
        return false;
    };

    let next_segment = format!("/page/{}/", page + 1);
    doc.select(&sel).any(|a| {
        a.value()
            .attr("href")
            .map(|href| href.contains(&next_segment) || href.to_lowercase().contains("next"))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_SNIPPET: &str = r#"
        <html><body>
          <a href="/immobilie/">Alle Immobilien</a>
          <a href="/immobilie/einfamilienhaus-in-besigheim-3/">Einfamilienhaus in Besigheim</a>
          <a href="/immobilie/einfamilienhaus-in-besigheim-3/">mehr</a>
          <a href="https://www.immo-shop-besigheim.de/immobilie/bauplatz-loechgau-7/">Bauplatz in Löchgau</a>
          <a href="/impressum/">Impressum</a>
        </body></html>
    "#;

    fn base() -> url::Url {
        url::Url::parse("https://www.immo-shop-besigheim.de").unwrap()
    }

    #[test]
    fn index_links_are_discovered_and_deduplicated() {
        let links = links_from_index(INDEX_SNIPPET, &base());
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.immo-shop-besigheim.de/immobilie/einfamilienhaus-in-besigheim-3/",
                "https://www.immo-shop-besigheim.de/immobilie/bauplatz-loechgau-7/",
            ]
        );
    }

    #[test]
    fn card_text_becomes_provisional_title() {
        let links = links_from_index(INDEX_SNIPPET, &base());
        assert_eq!(links[0].title.as_deref(), Some("Einfamilienhaus in Besigheim"));
    }

    #[test]
    fn archive_and_navigation_links_are_ignored() {
        let links = links_from_index(INDEX_SNIPPET, &base());
        assert!(links.iter().all(|l| !l.url.ends_with("/immobilie/")));
        assert!(links.iter().all(|l| !l.url.contains("impressum")));
    }

    #[test]
    fn next_page_link_is_detected() {
        let html = r#"<a href="/immobilienangebote/page/2/">2</a>"#;
        assert!(has_next_page(html, 1));
        assert!(!has_next_page(html, 2));
    }
}
