//! Geo Offers Core - Domain Types
//!
//! Pure data structures and the small amount of pure logic every other crate
//! shares: the offer model, request audit rows, the upstream feed wire format,
//! the rating formula, pagination normalization and cache key namespaces.
//! No I/O lives here.

pub mod cache_key;
pub mod error;
pub mod feed;
pub mod offer;
pub mod pagination;
pub mod rating;

pub use cache_key::{rate_limit_key, ListingFilter};
pub use error::{CacheError, CacheResult, FeedError, FeedResult, StorageError, StorageResult};
pub use feed::{ExternalCurrency, ExternalGeo, ExternalOffer, ExternalStat, FeedPage, WORLD_GEO_CODE};
pub use offer::{GeoStat, NewRequestLog, Offer, RequestLog};
pub use pagination::{OfferPage, PageRequest, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use rating::{compute_rating, RATING_HORIZON_DAYS};

use chrono::{DateTime, Utc};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Upstream-assigned offer identity, used as the primary key locally.
pub type ExternalId = i64;
