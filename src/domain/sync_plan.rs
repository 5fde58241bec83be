// src/domain/sync_plan.rs
//
// Set reconciliation between the freshly scraped listings and the remote
// table. Pure over the scraped map and the raw remote record list, so the
// whole sync decision is testable without any API.

use crate::airtable::{ListingFields, RemoteRecord};
use std::collections::BTreeMap;

/// The three disjoint action sets of one sync run, applied in create →
/// update → delete order.
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub to_create: Vec<ListingFields>,
    /// Remote record handle plus the full new field set.
    pub to_update: Vec<(String, ListingFields)>,
    /// Remote record handles of delisted records.
    pub to_delete: Vec<String>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Partition by natural key (`Objektnummer`):
/// - scraped but not remote        → create
/// - both present, any field diff  → update (full record, not a field diff)
/// - remote but not scraped        → delete
///
/// All eight fields are significant for the update check; `ListingFields`
/// normalizes absent and empty to the same value, so equality is plain
/// `PartialEq`. A remote record without an `Objektnummer`, or sharing one
/// with an earlier record, can never match a scraped listing; every such
/// handle goes into the delete set individually.
pub fn plan_sync(scraped: &BTreeMap<String, ListingFields>, remote: &[RemoteRecord]) -> SyncPlan {
    let mut plan = SyncPlan::default();

    let mut by_key: BTreeMap<&str, &RemoteRecord> = BTreeMap::new();
    for record in remote {
        let key = record.fields.objektnummer.as_str();
        if key.is_empty() || by_key.contains_key(key) {
            plan.to_delete.push(record.id.clone());
            continue;
        }
        by_key.insert(key, record);
    }

    for (id, fields) in scraped {
        match by_key.get(id.as_str()) {
            None => plan.to_create.push(fields.clone()),
            Some(record) => {
                if *fields != record.fields {
                    plan.to_update.push((record.id.clone(), fields.clone()));
                }
            }
        }
    }

    for (key, record) in &by_key {
        if !scraped.contains_key(*key) {
            plan.to_delete.push(record.id.clone());
        }
    }

    plan
}
