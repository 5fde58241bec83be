mod extract;
mod harvester;
mod scraper_error;

pub use extract::extract_listing;
pub use harvester::{ListingLink, SiteScraper};
pub use scraper_error::ScrapeError;
