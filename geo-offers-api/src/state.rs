//! Unified application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use geo_offers_storage::{CacheStore, RecordStore};

use crate::config::ApiConfig;
use crate::jobs::SyncScheduler;
use crate::query::OfferQueryService;

/// Shared handles for every handler. Built once by the composition root.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub cache: Arc<dyn CacheStore>,
    pub queries: OfferQueryService,
    pub sync: SyncScheduler,
    pub config: Arc<ApiConfig>,
    pub start_time: Instant,
}

impl AppState {
    /// Assemble state around existing stores and scheduler.
    pub fn new(
        records: Arc<dyn RecordStore>,
        cache: Arc<dyn CacheStore>,
        sync: SyncScheduler,
        config: ApiConfig,
    ) -> Self {
        let queries = OfferQueryService::new(records.clone(), cache.clone(), config.query_cache_ttl);
        Self {
            records,
            cache,
            queries,
            sync,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(OfferQueryService, queries);
crate::impl_from_ref!(SyncScheduler, sync);
crate::impl_from_ref!(Arc<ApiConfig>, config);
