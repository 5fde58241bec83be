// csv_export.rs
//
// Local CSV backup of the full scraped record set. Backup artifact only,
// not a source of truth; the file is overwritten on every run.

use crate::domain::Listing;
use std::path::Path;

pub const CSV_FILE: &str = "besigheim_immobilien.csv";

/// Fixed column order shared with the Airtable schema.
pub const CSV_HEADER: [&str; 8] = [
    "Titel",
    "Kategorie",
    "Webseite",
    "Objektnummer",
    "Beschreibung",
    "Bild",
    "Preis",
    "Standort",
];

pub fn write_backup(path: &Path, listings: &[Listing]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(CSV_HEADER)?;
    for listing in listings {
        let price = listing.price.map(format_price).unwrap_or_default();
        writer.write_record([
            listing.title.as_str(),
            listing.category.as_str(),
            listing.url.as_str(),
            listing.id.as_str(),
            listing.description.as_deref().unwrap_or(""),
            listing.image.as_deref().unwrap_or(""),
            price.as_str(),
            listing.location.as_deref().unwrap_or(""),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Prices on this site are whole Euro amounts; keep decimals only when the
/// parsed value actually has them.
fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        price.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CATEGORY_KAUFEN;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_csv_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "besigheim_csv_test_{}.csv",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    fn mk_listing(id: &str, price: Option<f64>) -> Listing {
        Listing {
            id: id.to_string(),
            title: format!("Haus {id} mit Umlauten äöü"),
            category: CATEGORY_KAUFEN.to_string(),
            url: format!("https://example.de/immobilie/{id}/"),
            description: Some("Beschreibung,\nmit Komma und Zeilenumbruch".to_string()),
            image: None,
            price,
            location: Some("74354 Besigheim".to_string()),
        }
    }

    #[test]
    fn header_and_row_count_match_the_listing_set() {
        let path = temp_csv_path();
        let listings = vec![
            mk_listing("haus-1", Some(489_250.0)),
            mk_listing("haus-2", None),
            mk_listing("haus-3", Some(1234.5)),
        ];

        write_backup(&path, &listings).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap(),
            &csv::StringRecord::from(CSV_HEADER.to_vec())
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), listings.len());

        // Quoted commas/newlines and non-ASCII text survive the round trip.
        assert_eq!(rows[0][0], *"Haus haus-1 mit Umlauten äöü");
        assert_eq!(rows[0][6], *"489250");
        assert_eq!(rows[1][6], *"");
        assert_eq!(rows[2][6], *"1234.5");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn empty_listing_set_writes_header_only() {
        let path = temp_csv_path();
        write_backup(&path, &[]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 0);

        std::fs::remove_file(&path).unwrap();
    }
}
