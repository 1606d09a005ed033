//! Offer Query Service
//!
//! Read-through listing cache. A listing is looked up under its
//! deterministic key first; on a miss the page and total are read from the
//! record store, serialized once, stored with a TTL and returned. A hit
//! returns the stored bytes untouched.
//!
//! The cache is never authoritative. Read failures count as misses and
//! write failures are logged and ignored.

use std::sync::Arc;
use std::time::Duration;

use geo_offers_core::{GeoStat, ListingFilter, OfferPage, PageRequest};
use geo_offers_storage::{CacheStore, RecordStore};

use crate::error::{ApiError, ApiResult};
use crate::telemetry::METRICS;

/// A serialized listing payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// JSON body, byte-identical to what was cached
    pub body: String,
    pub cache_hit: bool,
}

/// Answers paginated offer listings through the cache.
#[derive(Clone)]
pub struct OfferQueryService {
    records: Arc<dyn RecordStore>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl OfferQueryService {
    pub fn new(records: Arc<dyn RecordStore>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            records,
            cache,
            ttl,
        }
    }

    /// One page of a listing, from cache when possible.
    ///
    /// An empty page is `OffersNotFound`, whatever the total.
    pub async fn listing(&self, filter: &ListingFilter, request: PageRequest) -> ApiResult<Listing> {
        let key = filter.cache_key(&request);
        let namespace = filter.namespace_label();

        match self.cache.get(&key).await {
            Ok(Some(body)) => {
                record_lookup(namespace, "hit");
                tracing::debug!(%key, "Listing served from cache");
                return Ok(Listing {
                    body,
                    cache_hit: true,
                });
            }
            Ok(None) => record_lookup(namespace, "miss"),
            Err(e) => {
                record_lookup(namespace, "error");
                tracing::warn!(%key, error = %e, "Cache read failed, falling back to record store");
            }
        }

        let offers = self.records.list_offers(filter, &request).await?;
        if offers.is_empty() {
            return Err(ApiError::offers_not_found(filter.geo_code()));
        }
        let total = self.records.count_offers(filter).await?;

        let body = serde_json::to_string(&OfferPage::new(request, total, offers))?;

        if let Err(e) = self.cache.set_with_ttl(&key, &body, self.ttl).await {
            tracing::warn!(%key, error = %e, "Failed to cache listing");
        }

        Ok(Listing {
            body,
            cache_hit: false,
        })
    }

    /// Offer counts per geo code. Not cached.
    pub async fn geo_stats(&self) -> ApiResult<Vec<GeoStat>> {
        Ok(self.records.geo_stats().await?)
    }

    /// Purge the cached listings for `geos` and the global listing.
    pub async fn invalidate_geos<I, S>(&self, geos: I) -> PurgeOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        purge_listings(self.cache.as_ref(), geos).await
    }
}

/// Result of a best-effort listing purge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    /// Keys deleted across all prefixes
    pub keys_removed: u64,
    /// Prefixes whose delete failed
    pub failed_prefixes: Vec<String>,
}

/// Delete every cached page of each geo listing in `geos`, then of the
/// global listing if any geo was given.
///
/// Failures are logged per prefix and do not stop the remaining deletes.
pub async fn purge_listings<I, S>(cache: &dyn CacheStore, geos: I) -> PurgeOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut prefixes: Vec<String> = geos
        .into_iter()
        .map(|geo| ListingFilter::geo(geo.as_ref()).invalidation_prefix())
        .collect();
    if prefixes.is_empty() {
        return PurgeOutcome::default();
    }
    prefixes.sort();
    prefixes.dedup();
    prefixes.push(ListingFilter::All.invalidation_prefix());

    let mut outcome = PurgeOutcome::default();
    for prefix in prefixes {
        match cache.delete_by_prefix(&prefix).await {
            Ok(removed) => {
                tracing::debug!(%prefix, removed, "Purged cached listings");
                outcome.keys_removed += removed;
            }
            Err(e) => {
                tracing::warn!(%prefix, error = %e, "Failed to purge cached listings");
                outcome.failed_prefixes.push(prefix);
            }
        }
    }
    outcome
}

fn record_lookup(namespace: &str, result: &str) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_cache_lookup(namespace, result);
    }
}
