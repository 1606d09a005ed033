//! Geo Offers API - HTTP Service Layer
//!
//! Axum service for geo-tagged offers: cached paginated listings, offer
//! creation behind a static token, a background sync from the upstream feed
//! that purges the listings it touched, and a fixed-window rate limiter on
//! the shared cache store.
//!
//! Stores are injected as `Arc<dyn RecordStore>` / `Arc<dyn CacheStore>`.
//! Production wires PostgreSQL ([`DbClient`]) and Redis ([`RedisCache`]);
//! tests wire the in-memory backends from `geo-offers-storage`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod feed;
pub mod jobs;
mod macros;
pub mod middleware;
pub mod openapi;
pub mod query;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use cache::RedisCache;
pub use config::{ApiConfig, CacheConfig};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use feed::{HttpOfferFeed, UnconfiguredFeed};
pub use jobs::{OfferSync, SyncConfig, SyncReport, SyncScheduler, SyncTrigger};
pub use openapi::ApiDoc;
pub use query::{Listing, OfferQueryService};
pub use routes::create_api_router;
pub use state::AppState;
