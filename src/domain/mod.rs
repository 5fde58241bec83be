mod listing;
mod sync_plan;

pub use listing::{dedupe_listings, listing_id, Listing, PartialListing, CATEGORY_KAUFEN};
pub use sync_plan::{plan_sync, SyncPlan};
