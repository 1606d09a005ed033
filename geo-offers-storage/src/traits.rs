//! Collaborator traits.
//!
//! All three traits are object safe so the composition root can hand out
//! `Arc<dyn Trait>` handles.

use std::time::Duration;

use async_trait::async_trait;
use geo_offers_core::{
    CacheResult, ExternalId, FeedPage, FeedResult, GeoStat, ListingFilter, NewRequestLog, Offer,
    PageRequest, StorageResult,
};

/// Durable storage of offers and request audit rows.
///
/// Offers are keyed by external identifier only.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// One page of offers ordered by rating descending, then external id
    /// ascending.
    async fn list_offers(
        &self,
        filter: &ListingFilter,
        page: &PageRequest,
    ) -> StorageResult<Vec<Offer>>;

    /// Total offers matching the filter.
    async fn count_offers(&self, filter: &ListingFilter) -> StorageResult<i64>;

    async fn find_offer(&self, external_id: ExternalId) -> StorageResult<Option<Offer>>;

    /// Insert a new offer. Fails with `DuplicateOffer` if the id exists.
    async fn insert_offer(&self, offer: &Offer) -> StorageResult<()>;

    /// Overwrite every field of the offer stored under `offer.external_id`.
    /// Fails with `OfferNotFound` if there is none.
    async fn update_offer(&self, offer: &Offer) -> StorageResult<()>;

    /// Offer counts grouped by geo code, ordered by geo code.
    async fn geo_stats(&self) -> StorageResult<Vec<GeoStat>>;

    async fn append_request_log(&self, entry: &NewRequestLog) -> StorageResult<()>;

    /// Cheap connectivity check for health reporting.
    async fn ping(&self) -> StorageResult<()>;
}

/// Key-value store with expiry.
///
/// Serves both the listing cache and the rate limiter counters. Nothing in
/// it is authoritative; every value can be rebuilt or reset.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Delete every key starting with `prefix`. Returns how many were removed.
    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64>;

    /// Atomically increment the counter under `key`. When the increment
    /// creates the counter (value becomes 1) the key expires after `window`.
    /// Both steps happen as one store operation.
    async fn increment_in_window(&self, key: &str, window: Duration) -> CacheResult<i64>;

    /// Cheap connectivity check for health reporting.
    async fn ping(&self) -> CacheResult<()>;

    /// Backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// The paginated upstream offer feed.
#[async_trait]
pub trait OfferFeed: Send + Sync {
    /// Fetch one 1-based page. An empty `offers` list marks the end of the feed.
    async fn fetch_page(&self, page: u32) -> FeedResult<FeedPage>;
}
