//! Offer Sync Job
//!
//! Pulls the upstream feed page by page, upserts every geo variant into the
//! record store and purges the cached listings it touched.
//!
//! A run:
//!
//! 1. Requests pages `1..=max_pages` in order. An empty page ends the run;
//!    a fetch or decode error aborts it. Offers written before the abort
//!    stay written.
//! 2. Expands each record into one candidate per geo variant, skipping the
//!    worldwide sentinel and records without a usable identifier.
//! 3. Upserts each candidate by external id alone. Variants of one record
//!    share an id, so only the last one processed survives.
//! 4. Purges the geo listings of every touched geo, plus the global listing.
//!
//! Runs are owned by [`SyncScheduler`]: one at startup, one per interval
//! tick and one per manual trigger. Runs may overlap. On shutdown the
//! scheduler signals every run to stop between pages and joins them.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use geo_offers_core::{ExternalId, Offer, StorageError, StorageResult};
use geo_offers_storage::{CacheStore, OfferFeed, RecordStore};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::constants::{
    DEFAULT_SYNC_INTERVAL_SECS, DEFAULT_SYNC_MAX_PAGES, DEFAULT_SYNC_REQUEST_TIMEOUT_SECS,
};
use crate::query::purge_listings;
use crate::telemetry::METRICS;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the offer sync job.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upstream feed endpoint. `None` leaves the sync unconfigured.
    pub feed_url: Option<String>,

    /// Hard cap on pages fetched per run (default: 100)
    pub max_pages: u32,

    /// Timeout of a single feed request (default: 30 seconds)
    pub request_timeout: Duration,

    /// Period of scheduled runs. `None` disables the schedule.
    pub interval: Option<Duration>,

    /// Run once when the scheduler starts (default: true)
    pub run_on_startup: bool,

    /// Skip TLS certificate verification for the feed (default: false)
    pub accept_invalid_certs: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            max_pages: DEFAULT_SYNC_MAX_PAGES,
            request_timeout: Duration::from_secs(DEFAULT_SYNC_REQUEST_TIMEOUT_SECS),
            interval: Some(Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS)),
            run_on_startup: true,
            accept_invalid_certs: false,
        }
    }
}

impl SyncConfig {
    /// Create SyncConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `GEO_OFFERS_FEED_URL` (fallback `API_URL`): upstream feed endpoint
    /// - `GEO_OFFERS_SYNC_MAX_PAGES`: page cap per run (default: 100)
    /// - `GEO_OFFERS_SYNC_TIMEOUT_SECS`: feed request timeout (default: 30)
    /// - `GEO_OFFERS_SYNC_INTERVAL_SECS`: schedule period, 0 disables (default: 3600)
    /// - `GEO_OFFERS_SYNC_ON_STARTUP`: "true" or "false" (default: true)
    /// - `GEO_OFFERS_FEED_ACCEPT_INVALID_CERTS`: "true" or "false" (default: false)
    pub fn from_env() -> Self {
        let feed_url = std::env::var("GEO_OFFERS_FEED_URL")
            .or_else(|_| std::env::var("API_URL"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let max_pages = std::env::var("GEO_OFFERS_SYNC_MAX_PAGES")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &u32| *n > 0)
            .unwrap_or(DEFAULT_SYNC_MAX_PAGES);

        let request_timeout = Duration::from_secs(
            std::env::var("GEO_OFFERS_SYNC_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SYNC_REQUEST_TIMEOUT_SECS),
        );

        let interval_secs: u64 = std::env::var("GEO_OFFERS_SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS);

        let run_on_startup = std::env::var("GEO_OFFERS_SYNC_ON_STARTUP")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        let accept_invalid_certs = std::env::var("GEO_OFFERS_FEED_ACCEPT_INVALID_CERTS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            feed_url,
            max_pages,
            request_timeout,
            interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
            run_on_startup,
            accept_invalid_certs,
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for sync activity since startup.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    pub runs_started: AtomicU64,
    pub runs_completed: AtomicU64,
    pub runs_aborted: AtomicU64,
    pub runs_cancelled: AtomicU64,
    pub offers_created: AtomicU64,
    pub offers_updated: AtomicU64,
    pub upsert_failures: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_aborted: self.runs_aborted.load(Ordering::Relaxed),
            runs_cancelled: self.runs_cancelled.load(Ordering::Relaxed),
            offers_created: self.offers_created.load(Ordering::Relaxed),
            offers_updated: self.offers_updated.load(Ordering::Relaxed),
            upsert_failures: self.upsert_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of sync metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMetricsSnapshot {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_aborted: u64,
    pub runs_cancelled: u64,
    pub offers_created: u64,
    pub offers_updated: u64,
    pub upsert_failures: u64,
}

// ============================================================================
// REPORT
// ============================================================================

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Startup,
    Interval,
    Manual,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncTrigger::Startup => "startup",
            SyncTrigger::Interval => "interval",
            SyncTrigger::Manual => "manual",
        };
        f.write_str(label)
    }
}

/// Outcome of a single upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

/// Summary of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Pages fetched successfully, including the terminating empty page
    pub pages_fetched: u32,
    /// Distinct ids of updated offers
    pub updated_ids: BTreeSet<ExternalId>,
    /// Distinct ids of inserted offers
    pub created_ids: BTreeSet<ExternalId>,
    /// Geo codes written by this run
    pub touched_geos: BTreeSet<String>,
    /// Records dropped for a bad identifier or no geo variants
    pub skipped_records: usize,
    /// Worldwide variants dropped
    pub skipped_variants: usize,
    /// Candidates whose upsert failed
    pub failed_upserts: usize,
    /// Cache keys removed after the run
    pub cache_keys_purged: u64,
    /// Reason the run stopped early on an error
    pub aborted: Option<String>,
    /// Run stopped early for shutdown
    pub cancelled: bool,
}

impl SyncReport {
    fn outcome(&self) -> &'static str {
        if self.aborted.is_some() {
            "aborted"
        } else if self.cancelled {
            "cancelled"
        } else {
            "completed"
        }
    }
}

// ============================================================================
// SYNC RUN
// ============================================================================

/// One configured sync pipeline. Cheap to clone.
#[derive(Clone)]
pub struct OfferSync {
    records: Arc<dyn RecordStore>,
    cache: Arc<dyn CacheStore>,
    feed: Arc<dyn OfferFeed>,
    max_pages: u32,
    metrics: Arc<SyncMetrics>,
}

impl OfferSync {
    pub fn new(
        records: Arc<dyn RecordStore>,
        cache: Arc<dyn CacheStore>,
        feed: Arc<dyn OfferFeed>,
        max_pages: u32,
    ) -> Self {
        Self {
            records,
            cache,
            feed,
            max_pages,
            metrics: Arc::new(SyncMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Execute one full run. Never fails; problems land in the report.
    pub async fn run(&self, shutdown: &watch::Receiver<bool>) -> SyncReport {
        self.metrics.runs_started.fetch_add(1, Ordering::Relaxed);
        let mut report = SyncReport::default();

        for page in 1..=self.max_pages {
            if *shutdown.borrow() {
                tracing::info!(page, "Sync cancelled by shutdown");
                report.cancelled = true;
                break;
            }

            let feed_page = match self.feed.fetch_page(page).await {
                Ok(feed_page) => feed_page,
                Err(e) => {
                    tracing::error!(page, error = %e, "Sync aborted: feed page failed");
                    report.aborted = Some(e.to_string());
                    break;
                }
            };
            report.pages_fetched += 1;

            if feed_page.offers.is_empty() {
                tracing::debug!(page, "Feed exhausted");
                break;
            }

            for record in &feed_page.offers {
                let Some(external_id) = record.external_id() else {
                    tracing::warn!(page, id = %record.id, "Skipping feed record with invalid id");
                    report.skipped_records += 1;
                    continue;
                };
                if record.geo.is_empty() {
                    report.skipped_records += 1;
                    continue;
                }

                let candidates = record.candidates(external_id);
                report.skipped_variants += record.geo.len() - candidates.len();

                for offer in candidates {
                    self.apply(&offer, &mut report).await;
                }
            }
        }

        if !report.touched_geos.is_empty() {
            let purge = purge_listings(self.cache.as_ref(), &report.touched_geos).await;
            report.cache_keys_purged = purge.keys_removed;
        }

        self.finish(&report);
        report
    }

    async fn apply(&self, offer: &Offer, report: &mut SyncReport) {
        match upsert_offer(self.records.as_ref(), offer).await {
            Ok(action) => {
                match action {
                    UpsertAction::Created => {
                        self.metrics.offers_created.fetch_add(1, Ordering::Relaxed);
                        report.created_ids.insert(offer.external_id);
                    }
                    UpsertAction::Updated => {
                        self.metrics.offers_updated.fetch_add(1, Ordering::Relaxed);
                        report.updated_ids.insert(offer.external_id);
                    }
                }
                report.touched_geos.insert(offer.geo_code.clone());
            }
            Err(e) => {
                tracing::error!(
                    external_id = offer.external_id,
                    geo = %offer.geo_code,
                    error = %e,
                    "Failed to upsert offer"
                );
                self.metrics.upsert_failures.fetch_add(1, Ordering::Relaxed);
                report.failed_upserts += 1;
            }
        }
    }

    fn finish(&self, report: &SyncReport) {
        let counter = if report.aborted.is_some() {
            &self.metrics.runs_aborted
        } else if report.cancelled {
            &self.metrics.runs_cancelled
        } else {
            &self.metrics.runs_completed
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_sync_run(
                report.outcome(),
                report.created_ids.len(),
                report.updated_ids.len(),
                report.failed_upserts,
            );
        }

        tracing::info!(
            outcome = report.outcome(),
            pages = report.pages_fetched,
            updated = report.updated_ids.len(),
            created = report.created_ids.len(),
            updated_ids = ?report.updated_ids,
            created_ids = ?report.created_ids,
            geos = ?report.touched_geos,
            skipped_records = report.skipped_records,
            skipped_variants = report.skipped_variants,
            failed_upserts = report.failed_upserts,
            cache_keys_purged = report.cache_keys_purged,
            "Offer sync finished"
        );
    }
}

/// Insert `offer`, or overwrite the stored row with the same external id.
///
/// A concurrent insert of the same id that wins the race is retried as an
/// update.
pub async fn upsert_offer(records: &dyn RecordStore, offer: &Offer) -> StorageResult<UpsertAction> {
    if records.find_offer(offer.external_id).await?.is_some() {
        records.update_offer(offer).await?;
        return Ok(UpsertAction::Updated);
    }
    match records.insert_offer(offer).await {
        Ok(()) => Ok(UpsertAction::Created),
        Err(StorageError::DuplicateOffer { .. }) => {
            records.update_offer(offer).await?;
            Ok(UpsertAction::Updated)
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Owns every spawned sync run and the shutdown signal. Cheap to clone.
#[derive(Clone)]
pub struct SyncScheduler {
    sync: OfferSync,
    config: Arc<SyncConfig>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl SyncScheduler {
    pub fn new(sync: OfferSync, config: SyncConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            sync,
            config: Arc::new(config),
            shutdown_tx: Arc::new(shutdown_tx),
            tasks: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn metrics(&self) -> &SyncMetrics {
        self.sync.metrics()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Spawn the startup run and the interval loop, as configured.
    pub fn start(&self) {
        if self.config.run_on_startup {
            self.trigger(SyncTrigger::Startup);
        }

        let Some(period) = self.config.interval else {
            tracing::info!("Scheduled offer sync disabled");
            return;
        };

        let scheduler = self.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        if !self.spawn(async move { scheduler.schedule_loop(period, shutdown_rx).await }) {
            return;
        }

        tracing::info!(interval_secs = period.as_secs(), "Scheduled offer sync started");
    }

    /// Spawn one run in the background. Returns false once shutdown began.
    pub fn trigger(&self, trigger: SyncTrigger) -> bool {
        if self.is_shutting_down() {
            tracing::warn!(%trigger, "Sync trigger ignored during shutdown");
            return false;
        }

        let sync = self.sync.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let spawned = self.spawn(async move {
            tracing::info!(%trigger, "Offer sync started");
            sync.run(&shutdown_rx).await;
        });
        if !spawned {
            tracing::warn!(%trigger, "Sync trigger ignored during shutdown");
        }
        spawned
    }

    /// Signal every run to stop and wait for all of them.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);

        let mut tasks = match self.tasks.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let mut joined = 0usize;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Sync task failed");
            }
            joined += 1;
        }

        let snapshot = self.metrics().snapshot();
        tracing::info!(
            joined,
            runs_started = snapshot.runs_started,
            runs_completed = snapshot.runs_completed,
            runs_aborted = snapshot.runs_aborted,
            runs_cancelled = snapshot.runs_cancelled,
            offers_created = snapshot.offers_created,
            offers_updated = snapshot.offers_updated,
            upsert_failures = snapshot.upsert_failures,
            "Sync scheduler stopped"
        );
    }

    /// Add `task` to the joined set. Returns false if shutdown already
    /// took the set.
    fn spawn<F>(&self, task: F) -> bool
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        match self.tasks.lock() {
            Ok(mut tasks) => {
                // shutdown raises the flag before taking the set, so checking
                // under the lock means no task lands in an abandoned set
                if self.is_shutting_down() {
                    return false;
                }
                // Reap finished runs so the set does not grow without bound
                while tasks.try_join_next().is_some() {}
                tasks.spawn(task);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Sync task set poisoned, run not started");
                false
            }
        }
    }

    async fn schedule_loop(self, period: Duration, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("Scheduled offer sync shutting down");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    self.trigger(SyncTrigger::Interval);
                }
            }
        }
    }
}
