//! In-memory RecordStore implementation.
//!
//! Offers live in a BTreeMap keyed by external id behind an RwLock. Suitable
//! for tests and for running the service without PostgreSQL.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use geo_offers_core::{
    ExternalId, GeoStat, ListingFilter, NewRequestLog, Offer, PageRequest, RequestLog,
    StorageError, StorageResult,
};

use crate::traits::RecordStore;

/// In-memory record store.
///
/// Clones share state. `listing_reads` counts calls to `list_offers`, which
/// lets tests observe whether a listing was served from the cache.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    offers: Arc<RwLock<BTreeMap<ExternalId, Offer>>>,
    request_logs: Arc<RwLock<Vec<RequestLog>>>,
    listing_reads: Arc<AtomicU64>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `offers`. Later duplicates win.
    pub fn with_offers(offers: impl IntoIterator<Item = Offer>) -> Self {
        let map = offers.into_iter().map(|o| (o.external_id, o)).collect();
        Self {
            offers: Arc::new(RwLock::new(map)),
            ..Self::default()
        }
    }

    /// Number of `list_offers` calls served so far.
    pub fn listing_reads(&self) -> u64 {
        self.listing_reads.load(Ordering::Relaxed)
    }

    pub fn offer_count(&self) -> StorageResult<usize> {
        Ok(self.read_offers()?.len())
    }

    /// Snapshot of every stored offer, ordered by external id.
    pub fn offers(&self) -> StorageResult<Vec<Offer>> {
        Ok(self.read_offers()?.values().cloned().collect())
    }

    /// Snapshot of every request audit row in insertion order.
    pub fn request_logs(&self) -> StorageResult<Vec<RequestLog>> {
        Ok(self
            .request_logs
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .clone())
    }

    fn read_offers(
        &self,
    ) -> StorageResult<std::sync::RwLockReadGuard<'_, BTreeMap<ExternalId, Offer>>> {
        self.offers.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write_offers(
        &self,
    ) -> StorageResult<std::sync::RwLockWriteGuard<'_, BTreeMap<ExternalId, Offer>>> {
        self.offers.write().map_err(|_| StorageError::LockPoisoned)
    }
}

fn matches(filter: &ListingFilter, offer: &Offer) -> bool {
    match filter.geo_code() {
        Some(code) => offer.geo_code == code,
        None => true,
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_offers(
        &self,
        filter: &ListingFilter,
        page: &PageRequest,
    ) -> StorageResult<Vec<Offer>> {
        self.listing_reads.fetch_add(1, Ordering::Relaxed);

        let offers = self.read_offers()?;
        let mut selected: Vec<Offer> = offers
            .values()
            .filter(|o| matches(filter, o))
            .cloned()
            .collect();
        drop(offers);

        selected.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then(a.external_id.cmp(&b.external_id))
        });

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        Ok(selected
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .collect())
    }

    async fn count_offers(&self, filter: &ListingFilter) -> StorageResult<i64> {
        let offers = self.read_offers()?;
        Ok(offers.values().filter(|o| matches(filter, o)).count() as i64)
    }

    async fn find_offer(&self, external_id: ExternalId) -> StorageResult<Option<Offer>> {
        Ok(self.read_offers()?.get(&external_id).cloned())
    }

    async fn insert_offer(&self, offer: &Offer) -> StorageResult<()> {
        let mut offers = self.write_offers()?;
        if offers.contains_key(&offer.external_id) {
            return Err(StorageError::DuplicateOffer {
                external_id: offer.external_id,
            });
        }
        offers.insert(offer.external_id, offer.clone());
        Ok(())
    }

    async fn update_offer(&self, offer: &Offer) -> StorageResult<()> {
        let mut offers = self.write_offers()?;
        match offers.get_mut(&offer.external_id) {
            Some(existing) => {
                *existing = offer.clone();
                Ok(())
            }
            None => Err(StorageError::OfferNotFound {
                external_id: offer.external_id,
            }),
        }
    }

    async fn geo_stats(&self) -> StorageResult<Vec<GeoStat>> {
        let offers = self.read_offers()?;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for offer in offers.values() {
            *counts.entry(offer.geo_code.as_str()).or_default() += 1;
        }
        let mut stats: Vec<GeoStat> = counts
            .into_iter()
            .map(|(geo_code, count)| GeoStat {
                geo_code: geo_code.to_string(),
                count,
            })
            .collect();
        stats.sort_by(|a, b| a.geo_code.cmp(&b.geo_code));
        Ok(stats)
    }

    async fn append_request_log(&self, entry: &NewRequestLog) -> StorageResult<()> {
        let mut logs = self
            .request_logs
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let now = Utc::now();
        let id = logs.len() as i64 + 1;
        logs.push(RequestLog {
            id,
            method: entry.method.clone(),
            endpoint: entry.endpoint.clone(),
            ip: entry.ip.clone(),
            user_agent: entry.user_agent.clone(),
            status_code: entry.status_code,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });
        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        self.read_offers().map(|_| ())
    }
}
