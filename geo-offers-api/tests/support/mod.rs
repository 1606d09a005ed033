//! Shared harness for router-level integration tests.
//!
//! Builds the full production router over in-memory stores and a scripted
//! feed, and drives it with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use geo_offers_api::{
    create_api_router, ApiConfig, AppState, OfferSync, SyncConfig, SyncScheduler,
};
use geo_offers_core::{FeedPage, Offer};
use geo_offers_storage::{CacheStore, InMemoryCache, InMemoryRecordStore, RecordStore};
use geo_offers_test_utils::StaticFeed;
use tower::ServiceExt;

pub const TEST_TOKEN: &str = "test-token";

const MAX_BODY_BYTES: usize = 1024 * 1024;

// ============================================================================
// APP BUILDER
// ============================================================================

pub struct TestAppBuilder {
    offers: Vec<Offer>,
    feed: StaticFeed,
    config: ApiConfig,
    records_override: Option<Arc<dyn RecordStore>>,
    cache_override: Option<Arc<dyn CacheStore>>,
}

impl TestAppBuilder {
    pub fn offers(mut self, offers: Vec<Offer>) -> Self {
        self.offers = offers;
        self
    }

    pub fn feed_pages(mut self, pages: Vec<FeedPage>) -> Self {
        self.feed = StaticFeed::new(pages);
        self
    }

    pub fn feed(mut self, feed: StaticFeed) -> Self {
        self.feed = feed;
        self
    }

    pub fn config(mut self, configure: impl FnOnce(&mut ApiConfig)) -> Self {
        configure(&mut self.config);
        self
    }

    pub fn without_rate_limit(self) -> Self {
        self.config(|c| c.rate_limit_enabled = false)
    }

    /// Serve requests from `records` instead of the in-memory store.
    pub fn records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records_override = Some(records);
        self
    }

    /// Serve requests from `cache` instead of the in-memory cache.
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache_override = Some(cache);
        self
    }

    pub fn build(self) -> TestApp {
        let memory_records = Arc::new(InMemoryRecordStore::with_offers(self.offers));
        let memory_cache = Arc::new(InMemoryCache::new());
        let feed = Arc::new(self.feed);

        let records: Arc<dyn RecordStore> = match self.records_override {
            Some(records) => records,
            None => memory_records.clone(),
        };
        let cache: Arc<dyn CacheStore> = match self.cache_override {
            Some(cache) => cache,
            None => memory_cache.clone(),
        };

        let sync = OfferSync::new(records.clone(), cache.clone(), feed.clone(), 10);
        let scheduler = SyncScheduler::new(
            sync.clone(),
            SyncConfig {
                interval: None,
                run_on_startup: false,
                ..SyncConfig::default()
            },
        );

        let router = create_api_router(AppState::new(
            records,
            cache,
            scheduler.clone(),
            self.config,
        ));

        TestApp {
            router,
            records: memory_records,
            cache: memory_cache,
            feed,
            sync,
            scheduler,
        }
    }
}

// ============================================================================
// APP
// ============================================================================

pub struct TestApp {
    pub router: Router,
    pub records: Arc<InMemoryRecordStore>,
    pub cache: Arc<InMemoryCache>,
    pub feed: Arc<StaticFeed>,
    pub sync: OfferSync,
    pub scheduler: SyncScheduler,
}

/// A buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Result<serde_json::Value, String> {
        serde_json::from_slice(&self.body).map_err(|e| format!("Body is not JSON: {}", e))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            offers: Vec::new(),
            feed: StaticFeed::default(),
            config: ApiConfig::default().with_api_token(TEST_TOKEN),
            records_override: None,
            cache_override: None,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse, String> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| format!("Router failed: {}", e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| format!("Failed to read body: {}", e))?
            .to_vec();

        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse, String> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        self.send(request).await
    }

    /// POST `body` to `uri`, optionally with an Authorization header value.
    pub async fn post(
        &self,
        uri: &str,
        authorization: Option<&str>,
        body: impl Into<Body>,
    ) -> Result<TestResponse, String> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let request = builder.body(body.into()).map_err(|e| e.to_string())?;
        self.send(request).await
    }

    pub async fn create_offer(&self, body: serde_json::Value) -> Result<TestResponse, String> {
        let auth = format!("Bearer {}", TEST_TOKEN);
        self.post("/offers", Some(&auth), body.to_string()).await
    }

    /// Wait until the scheduler has finished `runs` sync runs.
    pub async fn wait_for_completed_runs(&self, runs: u64) -> Result<(), String> {
        for _ in 0..1_000 {
            let snapshot = self.scheduler.metrics().snapshot();
            if snapshot.runs_completed + snapshot.runs_aborted + snapshot.runs_cancelled >= runs {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Err(format!("Sync did not finish {} runs in time", runs))
    }
}
