// src/domain/listing.rs

use crate::scrape::ScrapeError;
use url::Url;

/// The single category this site carries; there are no rental listings.
pub const CATEGORY_KAUFEN: &str = "Kaufen";

/// One normalized real-estate listing, ready for the CSV backup and the
/// Airtable sync. Absent optional fields are expected, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Natural key: the last path segment of the detail URL.
    pub id: String,
    pub title: String,
    pub category: String,
    pub url: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
}

/// Fields as far as one source (index page or detail page) could fill them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialListing {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
}

impl PartialListing {
    /// Field-wise merge, `self` winning over `base`.
    pub fn merge_over(self, base: PartialListing) -> PartialListing {
        PartialListing {
            title: self.title.or(base.title),
            description: self.description.or(base.description),
            image: self.image.or(base.image),
            price: self.price.or(base.price),
            location: self.location.or(base.location),
        }
    }
}

impl Listing {
    /// Merge index-page and detail-page fields into one record, detail
    /// values taking precedence.
    pub fn from_parts(
        url: &str,
        summary: PartialListing,
        detail: PartialListing,
    ) -> Result<Self, ScrapeError> {
        let merged = detail.merge_over(summary);
        let id = listing_id(url)?;

        Ok(Self {
            id,
            title: merged.title.unwrap_or_default(),
            category: CATEGORY_KAUFEN.to_string(),
            url: url.to_string(),
            description: merged.description,
            image: merged.image,
            price: merged.price,
            location: merged.location,
        })
    }
}

/// Derive the stable listing id from the URL's last non-empty path segment.
/// Well-formed site URLs always have one; this is a defensive check.
pub fn listing_id(url: &str) -> Result<String, ScrapeError> {
    let parsed = Url::parse(url).map_err(|_| ScrapeError::MalformedUrl(url.to_string()))?;

    parsed
        .path_segments()
        .and_then(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .last()
                .map(str::to_string)
        })
        .ok_or_else(|| ScrapeError::MalformedUrl(url.to_string()))
}

/// Collapse duplicate slugs from one scrape run to a single record. The
/// record with the longer description wins; otherwise the first stays.
pub fn dedupe_listings(listings: Vec<Listing>) -> Vec<Listing> {
    let mut out: Vec<Listing> = Vec::new();

    for listing in listings {
        match out.iter_mut().find(|l| l.id == listing.id) {
            Some(existing) => {
                let new_len = listing.description.as_deref().map_or(0, str::len);
                let old_len = existing.description.as_deref().map_or(0, str::len);
                if new_len > old_len {
                    *existing = listing;
                }
            }
            None => out.push(listing),
        }
    }

    out
}
