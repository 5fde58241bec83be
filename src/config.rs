// config.rs
//
// All configuration is environmental (Airtable credentials) plus two
// compiled-in constants (site base URL, inter-request delay). The struct is
// passed into the scraper and the sync engine explicitly so tests can inject
// a fake endpoint and a zero delay.

use std::time::Duration;

pub const BASE_URL: &str = "https://www.immo-shop-besigheim.de";
pub const LIST_PATH: &str = "/immobilienangebote/";

/// Courtesy throttle between consecutive page fetches.
pub const REQUEST_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub request_delay: Duration,
    pub airtable: Option<AirtableConfig>,
}

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub token: String,
    pub base_id: String,
    pub table_id: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            request_delay: REQUEST_DELAY,
            airtable: AirtableConfig::from_env(),
        }
    }
}

impl AirtableConfig {
    /// Returns `None` unless all three variables are present and non-empty.
    /// The scrape and the CSV backup still run without them.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("AIRTABLE_TOKEN").ok()?;
        let base_id = std::env::var("AIRTABLE_BASE").ok()?;
        let table_id = std::env::var("AIRTABLE_TABLE_ID").ok()?;

        if token.is_empty() || base_id.is_empty() || table_id.is_empty() {
            return None;
        }

        Some(Self {
            token,
            base_id,
            table_id,
        })
    }
}
