//! Geo Offers Storage - Collaborator Traits and In-Memory Implementations
//!
//! Defines the three external collaborators the service talks to:
//! - [`RecordStore`]: durable offers and request audit rows
//! - [`CacheStore`]: key-value store with TTL, prefix delete and counters
//! - [`OfferFeed`]: the paginated upstream offer feed
//!
//! Production implementations (PostgreSQL, Redis, HTTP) live in the API
//! crate. The in-memory implementations here back tests and local runs.

pub mod memory;
pub mod memory_cache;
pub mod traits;

pub use memory::InMemoryRecordStore;
pub use memory_cache::InMemoryCache;
pub use traits::{CacheStore, OfferFeed, RecordStore};
