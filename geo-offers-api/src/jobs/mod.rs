//! Background Jobs for the Geo Offers API
//!
//! - `offer_sync`: upstream feed sync with cache invalidation
//!
//! # Usage
//!
//! ```ignore
//! use geo_offers_api::jobs::{OfferSync, SyncConfig, SyncScheduler};
//!
//! let sync = OfferSync::new(records, cache, feed, config.max_pages);
//! let scheduler = SyncScheduler::new(sync, config);
//! scheduler.start();
//!
//! // On shutdown
//! scheduler.shutdown().await;
//! ```

pub mod offer_sync;

pub use offer_sync::{
    upsert_offer, OfferSync, SyncConfig, SyncMetrics, SyncMetricsSnapshot, SyncReport,
    SyncScheduler, SyncTrigger, UpsertAction,
};
