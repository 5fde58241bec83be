use crate::airtable::{AirtableClient, ListingFields};
use crate::config::Config;
use crate::csv_export::CSV_FILE;
use crate::domain::{dedupe_listings, plan_sync, Listing};
use crate::scrape::{extract_listing, SiteScraper};
use chrono::Utc;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

mod airtable;
mod config;
mod csv_export;
mod domain;
mod errors;
mod scrape;


fn main() {
    let config = Config::from_env();

    eprintln!(
        "🏠 Besigheim scraper starting at {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );

    if let Err(e) = run(&config) {
        eprintln!("❌ Run failed: {e}");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    let site = SiteScraper::new(config)?;

    // 1️⃣ Harvest detail links from the paginated index
    let links = site.collect_detail_links()?;
    if links.is_empty() {
        // Layout change or transient failure; do not touch CSV or remote
        // state on an empty harvest.
        eprintln!("⚠️ No listings found on the index page, skipping CSV and sync");
        return Ok(());
    }

    // 2️⃣ Fetch and extract each detail page; failures skip the listing
    let mut listings: Vec<Listing> = Vec::new();
    for (i, link) in links.iter().enumerate() {
        eprintln!("📄 {}/{} {}", i + 1, links.len(), link.url);

        let html = match site.fetch_detail(&link.url) {
            Ok(html) => html,
            Err(e) => {
                eprintln!("⚠️ Skipping {}: {e}", link.url);
                continue;
            }
        };

        let summary = domain::PartialListing {
            title: link.title.clone(),
            ..Default::default()
        };
        let detail = extract_listing(&html, site.base_url());

        match Listing::from_parts(&link.url, summary, detail) {
            Ok(listing) => {
                eprintln!(
                    "  ✅ {} | {} | Preis: {}",
                    listing.id,
                    listing.title,
                    listing
                        .price
                        .map(|p| format!("{p:.0} €"))
                        .unwrap_or_else(|| "n/a".to_string())
                );
                listings.push(listing);
            }
            Err(e) => eprintln!("⚠️ Skipping {}: {e}", link.url),
        }
    }

    if listings.is_empty() {
        eprintln!("⚠️ No listing could be parsed, skipping CSV and sync");
        return Ok(());
    }

    let listings = dedupe_listings(listings);

    // 3️⃣ CSV backup
    csv_export::write_backup(Path::new(CSV_FILE), &listings)?;
    eprintln!("💾 CSV written: {CSV_FILE} ({} rows)", listings.len());

    // 4️⃣ Airtable sync
    match &config.airtable {
        Some(airtable_config) => sync_to_airtable(airtable_config, &listings)?,
        None => eprintln!("⚠️ Airtable env not set, sync skipped"),
    }

    Ok(())
}

fn sync_to_airtable(
    airtable_config: &config::AirtableConfig,
    listings: &[Listing],
) -> Result<(), Box<dyn Error>> {
    let client = AirtableClient::new(airtable_config.clone())?;

    eprintln!("🔄 Fetching remote records...");
    let remote_records = client.list_all()?;

    let scraped: BTreeMap<String, ListingFields> = listings
        .iter()
        .map(|l| (l.id.clone(), ListingFields::from(l)))
        .collect();

    let plan = plan_sync(&scraped, &remote_records);
    let (created, updated, deleted) = (
        plan.to_create.len(),
        plan.to_update.len(),
        plan.to_delete.len(),
    );

    if plan.is_empty() {
        println!("[SYNC] create: 0, update: 0, delete: 0 (nothing to do)");
        return Ok(());
    }

    client.apply(&plan)?;

    println!("[SYNC] create: {created}, update: {updated}, delete: {deleted}");
    Ok(())
}
