// extract.rs
//
// Pure field extraction over one detail page. No network access, no side
// effects, so everything here is testable against saved HTML fixtures.
// Every field fails softly: a missing heading, price or image leaves that
// field unset, it never fails the record.

use crate::domain::PartialListing;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

const MAX_DESCRIPTION_PARAGRAPHS: usize = 10;
const MAX_DESCRIPTION_CHARS: usize = 12_000;
const MIN_PARAGRAPH_CHARS: usize = 50;
const MIN_IMAGE_WIDTH: u32 = 200;

/// Boilerplate markers. Any paragraph containing one of these is navigation,
/// legal or contact chrome, not listing text.
const STOP_STRINGS: &[&str] = &[
    "Cookie",
    "Datenschutz",
    "Impressum",
    "Sie haben Fragen",
    "kontakt@",
    "Tel:",
    "Fax:",
    "E-Mail:",
    "www.",
    "http",
    "© ",
    "JavaScript",
    "Alle Rechte",
    "Rufen Sie uns an",
    "Kontaktieren Sie mich",
    "IMMO-SHOP",
];

fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:Kaufpreis|Preis)[:\s]+€?\s*([\d.]+(?:,\d+)?)\s*€").unwrap()
    })
}

fn plz_ort_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{5})\s+([A-ZÄÖÜ][a-zäöüß\-\s/]+)").unwrap())
}

fn title_fallback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:Wohnung|Haus|Villa|Doppelhaushälfte|Einfamilienhaus|Mehrfamilienhaus)\s+(?:in|im)\s+[A-ZÄÖÜ][\wäöüß\s-]+",
        )
        .unwrap()
    })
}

/// Collapse all whitespace runs to single spaces.
fn norm(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef) -> String {
    norm(&el.text().collect::<Vec<_>>().join(" "))
}

/// Extract every field available on a detail page.
pub fn extract_listing(html: &str, base: &Url) -> PartialListing {
    let doc = Html::parse_document(html);
    let page_text = doc.root_element().text().collect::<Vec<_>>().join("\n");

    let title = extract_title(&doc, &page_text);
    let location = extract_location(&page_text, title.as_deref());

    PartialListing {
        title,
        description: extract_description(&doc),
        price: extract_price(&page_text),
        location,
        image: extract_image(&doc, base),
    }
}

/// Title is normally the `h1`. Some pages carry only a generic heading, so a
/// text pattern ("Einfamilienhaus in Besigheim" etc.) serves as fallback.
fn extract_title(doc: &Html, page_text: &str) -> Option<String> {
    let mut title = String::new();

    if let Ok(sel) = Selector::parse("h1") {
        if let Some(h1) = doc.select(&sel).next() {
            title = element_text(h1);
        }
    }

    if title.chars().count() < 10 {
        if let Some(m) = title_fallback_re().find(page_text) {
            title = norm(m.as_str());
        }
    }

    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Labeled price ("Kaufpreis: 489.250 €"). German number format: dots are
/// thousands separators, comma is the decimal mark.
pub fn extract_price(page_text: &str) -> Option<f64> {
    let caps = price_re().captures(page_text)?;
    let raw = caps.get(1)?.as_str();

    let cleaned = raw.replace('.', "").replace(',', ".");
    let value: f64 = cleaned.parse().ok()?;

    // Plausibility floor; single digits here are page furniture, not prices.
    if value > 100.0 {
        Some(value)
    } else {
        None
    }
}

/// "71717 Beilstein" style location. The postal code is frequently absent on
/// this site, in which case the town name from the title has to do.
pub fn extract_location(page_text: &str, title: Option<&str>) -> Option<String> {
    if let Some(caps) = plz_ort_re().captures(page_text) {
        let plz = caps.get(1)?.as_str();
        let mut ort = caps.get(2)?.as_str().trim().to_string();

        // Cut at dashes/slashes and trailing filler words.
        if let Some(idx) = ort.find(&['-', '–', '/'][..]) {
            ort.truncate(idx);
        }
        static FILLER: OnceLock<Regex> = OnceLock::new();
        let filler = FILLER.get_or_init(|| {
            Regex::new(r"(?i)\s+(angeboten|von|der|die|das|GmbH|Immobilien)\b.*$").unwrap()
        });
        let ort = norm(&filler.replace(&ort, ""));

        let words: Vec<&str> = ort.split_whitespace().collect();
        let ort = if words.len() > 2 {
            words[..2].join(" ")
        } else {
            ort
        };

        if !ort.is_empty() {
            return Some(format!("{plz} {ort}"));
        }
    }

    // Fallback: a capitalized town name in the title.
    let title = title?;
    static TOWN: OnceLock<Regex> = OnceLock::new();
    let town = TOWN.get_or_init(|| Regex::new(r"\b[A-ZÄÖÜ][a-zäöüß]{3,}\b").unwrap());
    for m in town.find_iter(title) {
        let word = m.as_str();
        if !matches!(
            word,
            "Wohnung"
                | "Haus"
                | "Villa"
                | "Modernes"
                | "Einfamilienhaus"
                | "Mehrfamilienhaus"
                | "Doppelhaushälfte"
                | "Wohnen"
                | "Grundstück"
                | "Bauplatz"
                | "Ortskern"
        ) {
            return Some(word.to_string());
        }
    }

    None
}

/// Concatenate the substantial paragraphs of the main content block,
/// dropping boilerplate and duplicates.
fn extract_description(doc: &Html) -> Option<String> {
    let sel = Selector::parse("p").ok()?;

    let mut seen: Vec<String> = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();

    for p in doc.select(&sel) {
        let text = element_text(p);
        if text.chars().count() < MIN_PARAGRAPH_CHARS {
            continue;
        }
        if STOP_STRINGS.iter().any(|stop| text.contains(stop)) {
            continue;
        }
        let lower = text.to_lowercase();
        if seen.contains(&lower) {
            continue;
        }
        seen.push(lower);
        paragraphs.push(text);

        if paragraphs.len() == MAX_DESCRIPTION_PARAGRAPHS {
            break;
        }
    }

    if paragraphs.is_empty() {
        return None;
    }

    let mut description = paragraphs.join("\n\n");
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        description = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
    }
    Some(description)
}

/// First property photo. Small images are icons or the logo. The site runs
/// PhastPress, which hides the real upload URL inside a base64 segment; with
/// it disabled the `wp-content/uploads` URL appears directly. Lazy-loading
/// themes park the real URL in `data-src`.
fn extract_image(doc: &Html, base: &Url) -> Option<String> {
    let sel = Selector::parse("img").ok()?;

    for img in doc.select(&sel) {
        let src = img
            .value()
            .attr("data-src")
            .or_else(|| img.value().attr("src"))
            .unwrap_or("");
        if src.is_empty() {
            continue;
        }

        if let Some(width) = img.value().attr("width").and_then(|w| w.parse::<u32>().ok()) {
            if width < MIN_IMAGE_WIDTH {
                continue;
            }
        }

        if src.contains("phastpress/phast.php") {
            if let Some(real) = decode_phastpress_url(src) {
                return Some(real);
            }
        } else if src.contains("wp-content/uploads") && !src.to_lowercase().contains("logo") {
            if src.starts_with("http") {
                return Some(src.to_string());
            }
            if let Ok(absolute) = base.join(src) {
                return Some(absolute.to_string());
            }
        }
    }

    None
}

/// PhastPress URLs look like `/phastpress/phast.php/<base64>.q.jpg`. The
/// decoded payload is a query string whose `src` parameter carries the
/// percent-encoded upload URL.
pub fn decode_phastpress_url(src: &str) -> Option<String> {
    let encoded = src.split("/phast.php/").nth(1)?;
    let mut encoded = encoded.split('?').next()?.to_string();

    // Strip trailing format suffixes (".q.jpg", ".webp", ...).
    loop {
        let stripped = ["q", "webp", "jpg", "jpeg", "png"].iter().find_map(|ext| {
            let suffix = format!(".{ext}");
            encoded
                .to_lowercase()
                .ends_with(&suffix)
                .then(|| encoded[..encoded.len() - suffix.len()].to_string())
        });
        match stripped {
            Some(s) => encoded = s,
            None => break,
        }
    }

    // Re-pad; PhastPress drops the trailing '='.
    let missing = encoded.len() % 4;
    if missing != 0 {
        encoded.push_str(&"=".repeat(4 - missing));
    }

    let decoded = STANDARD
        .decode(&encoded)
        .or_else(|_| URL_SAFE.decode(&encoded))
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;

    let real_url = url::form_urlencoded::parse(decoded.as_bytes())
        .find(|(key, _)| key == "src")
        .map(|(_, value)| value.into_owned())?;

    if real_url.contains("wp-content/uploads") && !real_url.to_lowercase().contains("logo") {
        Some(real_url)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_price_parses_german_number_format() {
        let price = extract_price("Eckdaten\nKaufpreis: 489.250 €\nWohnfläche: 120 m²");
        assert_eq!(price, Some(489_250.0));
    }

    #[test]
    fn price_label_variant_and_decimal_comma() {
        let price = extract_price("Preis: 1.234,56 €");
        assert_eq!(price, Some(1234.56));
    }

    #[test]
    fn missing_price_is_none_not_error() {
        assert_eq!(extract_price("Wohnfläche: 120 m², Baujahr 1998"), None);
    }

    #[test]
    fn implausibly_small_price_is_rejected() {
        assert_eq!(extract_price("Preis: 3 €"), None);
    }

    #[test]
    fn location_with_postal_code() {
        let loc = extract_location("Das Haus liegt in 74354 Besigheim. Die Lage ist ruhig.", None);
        assert_eq!(loc.as_deref(), Some("74354 Besigheim"));
    }

    #[test]
    fn location_falls_back_to_town_in_title() {
        let loc = extract_location(
            "Keine Adresse auf dieser Seite.",
            Some("Modernes Einfamilienhaus in Löchgau"),
        );
        assert_eq!(loc.as_deref(), Some("Löchgau"));
    }

    #[test]
    fn phastpress_url_decodes_to_upload_url() {
        // service=images&src=https%3A%2F%2Fwww.immo-shop-besigheim.de%2Fwp-content%2Fuploads%2Fhaus.jpg
        let payload =
            "service=images&src=https%3A%2F%2Fwww.immo-shop-besigheim.de%2Fwp-content%2Fuploads%2Fhaus.jpg";
        let encoded = STANDARD.encode(payload);
        let src = format!("/phastpress/phast.php/{}.q.jpg", encoded.trim_end_matches('='));

        let decoded = decode_phastpress_url(&src);
        assert_eq!(
            decoded.as_deref(),
            Some("https://www.immo-shop-besigheim.de/wp-content/uploads/haus.jpg")
        );
    }

    #[test]
    fn phastpress_logo_is_not_a_property_image() {
        let payload = "service=images&src=https%3A%2F%2Fwww.immo-shop-besigheim.de%2Fwp-content%2Fuploads%2Flogo.png";
        let encoded = STANDARD.encode(payload);
        let src = format!("/phastpress/phast.php/{encoded}");
        assert_eq!(decode_phastpress_url(&src), None);
    }
}
