//! Geo Offers Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Scripted and failing collaborator doubles
//! - Proptest generators for offers and feed records
//! - Fixtures for common scenarios
//! - Assertions for listing payloads

// Re-export in-memory backends from their source crate
pub use geo_offers_storage::{
    CacheStore, InMemoryCache, InMemoryRecordStore, OfferFeed, RecordStore,
};

// Re-export core types for convenience
pub use geo_offers_core::{
    CacheError, CacheResult, ExternalId, ExternalOffer, FeedError, FeedPage, FeedResult, GeoStat,
    ListingFilter, NewRequestLog, Offer, OfferPage, PageRequest, StorageError, StorageResult,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// COLLABORATOR DOUBLES
// ============================================================================

/// Scripted upstream feed.
///
/// Serves pre-built pages by 1-based number and answers with an empty page
/// past the end. Individual pages can be made to fail. Every requested page
/// number is recorded.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    pages: Arc<Vec<FeedPage>>,
    failures: Arc<HashMap<u32, FeedError>>,
    requested: Arc<Mutex<Vec<u32>>>,
}

impl StaticFeed {
    pub fn new(pages: Vec<FeedPage>) -> Self {
        Self {
            pages: Arc::new(pages),
            ..Self::default()
        }
    }

    /// Build from raw JSON page bodies, as the provider would send them.
    pub fn from_json(pages: &[&str]) -> Result<Self, serde_json::Error> {
        let decoded = pages
            .iter()
            .map(|body| serde_json::from_str(body))
            .collect::<Result<Vec<FeedPage>, _>>()?;
        Ok(Self::new(decoded))
    }

    /// Make `page` fail with `error` instead of returning data.
    pub fn failing_at(mut self, page: u32, error: FeedError) -> Self {
        let mut failures = (*self.failures).clone();
        failures.insert(page, error);
        self.failures = Arc::new(failures);
        self
    }

    /// Page numbers requested so far, in order.
    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested
            .lock()
            .map(|pages| pages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OfferFeed for StaticFeed {
    async fn fetch_page(&self, page: u32) -> FeedResult<FeedPage> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(page);
        }
        if let Some(error) = self.failures.get(&page) {
            return Err(error.clone());
        }
        let index = page.saturating_sub(1) as usize;
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}

/// Cache whose every operation fails as if the store were down.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCache;

fn cache_down() -> CacheError {
    CacheError::Unavailable {
        reason: "connection refused".to_string(),
    }
}

#[async_trait]
impl CacheStore for UnavailableCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(cache_down())
    }

    async fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(cache_down())
    }

    async fn delete_by_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        Err(cache_down())
    }

    async fn increment_in_window(&self, _key: &str, _window: Duration) -> CacheResult<i64> {
        Err(cache_down())
    }

    async fn ping(&self) -> CacheResult<()> {
        Err(cache_down())
    }

    fn backend_name(&self) -> &'static str {
        "unavailable"
    }
}

/// Record store whose every operation fails as if the database were down.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRecordStore;

fn store_down() -> StorageError {
    StorageError::Unavailable {
        reason: "connection refused".to_string(),
    }
}

#[async_trait]
impl RecordStore for UnavailableRecordStore {
    async fn list_offers(
        &self,
        _filter: &ListingFilter,
        _page: &PageRequest,
    ) -> StorageResult<Vec<Offer>> {
        Err(store_down())
    }

    async fn count_offers(&self, _filter: &ListingFilter) -> StorageResult<i64> {
        Err(store_down())
    }

    async fn find_offer(&self, _external_id: ExternalId) -> StorageResult<Option<Offer>> {
        Err(store_down())
    }

    async fn insert_offer(&self, _offer: &Offer) -> StorageResult<()> {
        Err(store_down())
    }

    async fn update_offer(&self, _offer: &Offer) -> StorageResult<()> {
        Err(store_down())
    }

    async fn geo_stats(&self) -> StorageResult<Vec<GeoStat>> {
        Err(store_down())
    }

    async fn append_request_log(&self, _entry: &NewRequestLog) -> StorageResult<()> {
        Err(store_down())
    }

    async fn ping(&self) -> StorageResult<()> {
        Err(store_down())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for offers and upstream feed records.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_geo_code() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("RU".to_string()),
            Just("KZ".to_string()),
            Just("US".to_string()),
            Just("DE".to_string()),
            "[A-Z]{2}",
        ]
    }

    pub fn arb_rating() -> impl Strategy<Value = f64> {
        prop_oneof![Just(0.0), 0.0f64..10_000.0, -100.0f64..0.0]
    }

    pub fn arb_offer() -> impl Strategy<Value = Offer> {
        (
            1i64..1_000_000,
            "[a-zA-Z ]{0,24}",
            arb_geo_code(),
            arb_rating(),
            0i64..120,
        )
            .prop_map(|(id, name, geo, rating, approval)| {
                let mut offer = Offer::new(id, geo, rating);
                offer.name = name;
                offer.approval_time = approval;
                offer.currency = "RUB".to_string();
                offer
            })
    }

    /// A small catalogue with unique external ids.
    pub fn arb_catalogue(max: usize) -> impl Strategy<Value = Vec<Offer>> {
        proptest::collection::vec(arb_offer(), 0..=max).prop_map(|offers| {
            let mut seen = std::collections::HashSet::new();
            offers
                .into_iter()
                .filter(|o| seen.insert(o.external_id))
                .collect()
        })
    }

    /// An upstream record in the provider's string-typed wire shape.
    pub fn arb_external_offer() -> impl Strategy<Value = ExternalOffer> {
        (
            1i64..1_000_000,
            proptest::collection::vec(prop_oneof![arb_geo_code(), Just("Wrld".to_string())], 0..4),
            0i64..200,
            0i64..200,
            0.0f64..50.0,
        )
            .prop_map(|(id, geos, approval, payment, ecpl)| {
                let record = serde_json::json!({
                    "id": id.to_string(),
                    "name": format!("Offer {id}"),
                    "offer_currency": {"name": "RUB"},
                    "approval_time": approval.to_string(),
                    "payment_time": payment.to_string(),
                    "site_url": format!("https://offer{id}.example"),
                    "logo": "",
                    "geo": geos
                        .iter()
                        .map(|code| serde_json::json!({"code": code, "name": code}))
                        .collect::<Vec<_>>(),
                    "stat": {"ecpl": format!("{ecpl:.2}")},
                });
                serde_json::from_value(record).unwrap_or_default()
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made offers and feed bodies.

    use super::*;

    /// A fully populated offer.
    pub fn offer(external_id: ExternalId, geo_code: &str, rating: f64) -> Offer {
        Offer {
            external_id,
            name: format!("Offer {external_id}"),
            currency: "RUB".to_string(),
            approval_time: 30,
            site_url: format!("https://offer{external_id}.example"),
            logo: format!("https://offer{external_id}.example/logo.png"),
            geo_code: geo_code.to_string(),
            geo_name: geo_code.to_string(),
            rating,
        }
    }

    /// Five offers across three geos with distinct ratings.
    pub fn mixed_catalogue() -> Vec<Offer> {
        vec![
            offer(1, "RU", 120.0),
            offer(2, "RU", 480.0),
            offer(3, "KZ", 75.5),
            offer(4, "US", 300.0),
            offer(5, "RU", 10.0),
        ]
    }

    /// One provider record JSON body for a feed page.
    ///
    /// `geos` pairs are (code, name). With ecpl 1.5, approval 30 and payment
    /// 45 the computed rating is 500.
    pub fn feed_record(id: ExternalId, geos: &[(&str, &str)]) -> serde_json::Value {
        serde_json::json!({
            "id": id.to_string(),
            "name": format!("Feed offer {id}"),
            "offer_currency": {"name": "RUB"},
            "approval_time": "30",
            "payment_time": "45",
            "site_url": format!("https://feed{id}.example"),
            "logo": format!("https://feed{id}.example/logo.png"),
            "geo": geos
                .iter()
                .map(|(code, name)| serde_json::json!({"code": code, "name": name}))
                .collect::<Vec<_>>(),
            "stat": {"ecpl": "1.5"},
        })
    }

    /// A full feed page body wrapping `records`.
    pub fn feed_page_body(records: Vec<serde_json::Value>) -> String {
        serde_json::json!({ "offers": records }).to_string()
    }

    /// A decoded feed page wrapping `records`.
    pub fn feed_page(records: Vec<serde_json::Value>) -> FeedPage {
        serde_json::from_value(serde_json::json!({ "offers": records })).unwrap_or_default()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for listing payloads.

    use super::*;

    /// Assert offers are sorted by rating descending, ties by external id.
    pub fn assert_listing_order(offers: &[Offer]) {
        for pair in offers.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let ordered = a.rating > b.rating
                || (a.rating == b.rating && a.external_id < b.external_id);
            assert!(
                ordered,
                "offers out of order: {} ({}) before {} ({})",
                a.external_id, a.rating, b.external_id, b.rating
            );
        }
    }

    /// Assert the page metadata agrees with the request and total.
    pub fn assert_page_metadata(page: &OfferPage, request: PageRequest, total: i64) {
        assert_eq!(page.total, total, "total mismatch");
        assert_eq!(page.page, request.page(), "page mismatch");
        assert_eq!(page.limit, request.limit(), "limit mismatch");
        assert_eq!(page.total_pages, request.total_pages(total), "total_pages mismatch");
        assert!(page.offers.len() <= request.limit() as usize);
    }

    /// Assert every offer belongs to `geo_code`.
    pub fn assert_all_in_geo(offers: &[Offer], geo_code: &str) {
        for offer in offers {
            assert_eq!(offer.geo_code, geo_code, "offer {} in wrong geo", offer.external_id);
        }
    }
}
