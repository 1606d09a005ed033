//! In-memory CacheStore implementation.
//!
//! Entries carry an optional deadline measured on the tokio clock, so tests
//! running with a paused runtime can step over TTLs with `time::advance`.
//! Expired entries are dropped on read of their key and swept on every write.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use geo_offers_core::{CacheError, CacheResult};
use tokio::time::Instant;

use crate::traits::CacheStore;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// DashMap-backed cache. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live (unexpired) entry exists under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Sorted snapshot of every live key.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Time left before `key` expires. `None` if absent or without deadline.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        let deadline = entry.expires_at?;
        deadline.checked_duration_since(now)
    }

    fn sweep_expired(&self, now: Instant) {
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        self.sweep_expired(now);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    async fn increment_in_window(&self, key: &str, window: Duration) -> CacheResult<i64> {
        let now = Instant::now();
        // Sweep before taking the entry guard; retain locks every shard.
        self.sweep_expired(now);
        // The entry guard holds the shard lock, so read-modify-write is atomic.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                let entry = occupied.get_mut();
                let current: i64 = entry.value.parse().map_err(|_| CacheError::InvalidValue {
                    key: key.to_string(),
                    reason: "value is not an integer".to_string(),
                })?;
                let next = current.checked_add(1).ok_or_else(|| CacheError::CommandFailed {
                    command: "INCR".to_string(),
                    reason: "increment would overflow".to_string(),
                })?;
                entry.value = next.to_string();
                Ok(next)
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(CacheEntry {
                    value: "1".to_string(),
                    expires_at: Some(now + window),
                });
                Ok(1)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry {
                    value: "1".to_string(),
                    expires_at: Some(now + window),
                });
                Ok(1)
            }
        }
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
