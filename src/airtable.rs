// airtable.rs
//
// Blocking client for the Airtable records API: paged listing plus batched
// create/update/delete. Batch limits and pacing follow the documented API
// limits (10 records per write call, 100 per page, 5 requests/second).

use crate::config::AirtableConfig;
use crate::domain::{Listing, SyncPlan};
use crate::errors::SyncError;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const API_ROOT: &str = "https://api.airtable.com/v0";
const PAGE_SIZE: usize = 100;
const BATCH_SIZE: usize = 10;
const REQUEST_PAUSE: Duration = Duration::from_millis(200);

/// The Airtable column schema for one listing. Empty text fields are
/// omitted on the wire; Airtable likewise omits empty cells in its
/// responses, so "absent" and "empty" compare equal after a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFields {
    #[serde(rename = "Titel", default, skip_serializing_if = "String::is_empty")]
    pub titel: String,
    #[serde(rename = "Kategorie", default, skip_serializing_if = "String::is_empty")]
    pub kategorie: String,
    #[serde(rename = "Webseite", default, skip_serializing_if = "String::is_empty")]
    pub webseite: String,
    #[serde(rename = "Objektnummer", default, skip_serializing_if = "String::is_empty")]
    pub objektnummer: String,
    #[serde(rename = "Beschreibung", default, skip_serializing_if = "String::is_empty")]
    pub beschreibung: String,
    #[serde(rename = "Bild", default, skip_serializing_if = "String::is_empty")]
    pub bild: String,
    #[serde(rename = "Preis", default, skip_serializing_if = "Option::is_none")]
    pub preis: Option<f64>,
    #[serde(rename = "Standort", default, skip_serializing_if = "String::is_empty")]
    pub standort: String,
}

impl From<&Listing> for ListingFields {
    fn from(listing: &Listing) -> Self {
        Self {
            titel: listing.title.clone(),
            kategorie: listing.category.clone(),
            webseite: listing.url.clone(),
            objektnummer: listing.id.clone(),
            beschreibung: listing.description.clone().unwrap_or_default(),
            bild: listing.image.clone().unwrap_or_default(),
            preis: listing.price,
            standort: listing.location.clone().unwrap_or_default(),
        }
    }
}

/// One record as stored remotely: Airtable's own record handle plus the
/// listing fields keyed by `Objektnummer`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    #[serde(default)]
    pub fields: ListingFields,
}

#[derive(Debug, Deserialize)]
struct RecordPage {
    #[serde(default)]
    records: Vec<RemoteRecord>,
    offset: Option<String>,
}

pub struct AirtableClient {
    client: Client,
    config: AirtableConfig,
    api_root: String,
}

impl AirtableClient {
    pub fn new(config: AirtableConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            api_root: API_ROOT.to_string(),
        })
    }

    /// Point the client at a different endpoint. Used by tests with a fake
    /// server instead of the real API.
    #[allow(dead_code)]
    pub fn with_api_root(mut self, api_root: &str) -> Self {
        self.api_root = api_root.trim_end_matches('/').to_string();
        self
    }

    fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.api_root, self.config.base_id, self.config.table_id
        )
    }

    /// List every record in the table, following the offset cursor.
    pub fn list_all(&self) -> Result<Vec<RemoteRecord>, SyncError> {
        let url = self.table_url();
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut params = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(cursor) = &offset {
                params.push(("offset", cursor.clone()));
            }

            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.config.token)
                .query(&params)
                .send()
                .map_err(|e| SyncError::Network(e.to_string()))?;
            let body = check_response(resp)?;

            let page: RecordPage = serde_json::from_str(&body)
                .map_err(|e| SyncError::UnexpectedShape(e.to_string()))?;

            records.extend(page.records);
            offset = page.offset;
            if offset.is_none() {
                break;
            }
            std::thread::sleep(REQUEST_PAUSE);
        }

        Ok(records)
    }

    /// Apply a plan in create → update → delete order. A failed batch
    /// aborts the remaining operations; batches already applied stand.
    pub fn apply(&self, plan: &SyncPlan) -> Result<(), SyncError> {
        if !plan.to_create.is_empty() {
            eprintln!("🔄 Creating {} records...", plan.to_create.len());
            self.batch_create(&plan.to_create)?;
        }
        if !plan.to_update.is_empty() {
            eprintln!("🔄 Updating {} records...", plan.to_update.len());
            self.batch_update(&plan.to_update)?;
        }
        if !plan.to_delete.is_empty() {
            eprintln!("🔄 Deleting {} records...", plan.to_delete.len());
            self.batch_delete(&plan.to_delete)?;
        }
        Ok(())
    }

    pub fn batch_create(&self, fields: &[ListingFields]) -> Result<(), SyncError> {
        for batch in fields.chunks(BATCH_SIZE) {
            let payload = json!({
                "records": batch
                    .iter()
                    .map(|f| json!({ "fields": f }))
                    .collect::<Vec<_>>(),
            });

            let resp = self
                .client
                .post(self.table_url())
                .bearer_auth(&self.config.token)
                .json(&payload)
                .send()
                .map_err(|e| SyncError::Network(e.to_string()))?;
            check_response(resp)?;

            std::thread::sleep(REQUEST_PAUSE);
        }
        Ok(())
    }

    pub fn batch_update(&self, updates: &[(String, ListingFields)]) -> Result<(), SyncError> {
        for batch in updates.chunks(BATCH_SIZE) {
            let payload = json!({
                "records": batch
                    .iter()
                    .map(|(record_id, f)| json!({ "id": record_id, "fields": f }))
                    .collect::<Vec<_>>(),
            });

            let resp = self
                .client
                .patch(self.table_url())
                .bearer_auth(&self.config.token)
                .json(&payload)
                .send()
                .map_err(|e| SyncError::Network(e.to_string()))?;
            check_response(resp)?;

            std::thread::sleep(REQUEST_PAUSE);
        }
        Ok(())
    }

    pub fn batch_delete(&self, record_ids: &[String]) -> Result<(), SyncError> {
        for batch in record_ids.chunks(BATCH_SIZE) {
            let params: Vec<(&str, &str)> = batch
                .iter()
                .map(|id| ("records[]", id.as_str()))
                .collect();

            let resp = self
                .client
                .delete(self.table_url())
                .bearer_auth(&self.config.token)
                .query(&params)
                .send()
                .map_err(|e| SyncError::Network(e.to_string()))?;
            check_response(resp)?;

            std::thread::sleep(REQUEST_PAUSE);
        }
        Ok(())
    }
}

fn check_response(resp: reqwest::blocking::Response) -> Result<String, SyncError> {
    let status = resp.status();
    let body = resp.text().unwrap_or_else(|_| "(no body)".to_string());

    if status.is_success() {
        Ok(body)
    } else {
        Err(SyncError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CATEGORY_KAUFEN;

    fn sample_listing() -> Listing {
        Listing {
            id: "einfamilienhaus-in-besigheim-3".to_string(),
            title: "Einfamilienhaus in Besigheim".to_string(),
            category: CATEGORY_KAUFEN.to_string(),
            url: "https://www.immo-shop-besigheim.de/immobilie/einfamilienhaus-in-besigheim-3/"
                .to_string(),
            description: None,
            image: None,
            price: Some(489_250.0),
            location: Some("74354 Besigheim".to_string()),
        }
    }

    #[test]
    fn empty_fields_are_omitted_on_the_wire() {
        let fields = ListingFields::from(&sample_listing());
        let value = serde_json::to_value(&fields).unwrap();

        assert_eq!(value["Titel"], "Einfamilienhaus in Besigheim");
        assert_eq!(value["Kategorie"], "Kaufen");
        assert_eq!(value["Preis"], 489_250.0);
        // No description or image scraped, so the keys must be absent.
        assert!(value.get("Beschreibung").is_none());
        assert!(value.get("Bild").is_none());
    }

    #[test]
    fn remote_record_with_sparse_fields_deserializes_to_defaults() {
        let body = r#"{
            "id": "recAAA111",
            "fields": { "Objektnummer": "haus-1", "Titel": "Haus" }
        }"#;
        let record: RemoteRecord = serde_json::from_str(body).unwrap();

        assert_eq!(record.id, "recAAA111");
        assert_eq!(record.fields.objektnummer, "haus-1");
        assert_eq!(record.fields.beschreibung, "");
        assert_eq!(record.fields.preis, None);
    }

    #[test]
    fn round_trip_preserves_equality() {
        let fields = ListingFields::from(&sample_listing());
        let json = serde_json::to_string(&fields).unwrap();
        let back: ListingFields = serde_json::from_str(&json).unwrap();
        assert_eq!(fields, back);
    }
}
