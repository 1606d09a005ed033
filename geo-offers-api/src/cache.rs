//! Redis Cache Store
//!
//! [`CacheStore`] implementation over a multiplexed Redis connection.
//! `ConnectionManager` reconnects on its own, so one instance is shared by
//! every request and the sync job.

use std::time::Duration;

use async_trait::async_trait;
use geo_offers_core::{CacheError, CacheResult};
use geo_offers_storage::CacheStore;
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, Script};

use crate::config::CacheConfig;
use crate::error::{ApiError, ApiResult};

/// Keys fetched per SCAN round trip during prefix deletes.
const SCAN_BATCH: usize = 500;

/// INCR and, when the counter was just created, EXPIRE in one atomic step.
static INCREMENT_IN_WINDOW: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
",
    )
});

/// Redis-backed cache store.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis. Fails if the server cannot be reached.
    pub async fn connect(config: &CacheConfig) -> ApiResult<Self> {
        let client = Client::open(config.redis_url.as_str()).map_err(|e| {
            ApiError::internal_error(format!("Invalid Redis URL {}: {}", config.redis_url, e))
        })?;
        let connection = ConnectionManager::new(client).await.map_err(|e| {
            ApiError::service_unavailable(format!("Failed to connect to Redis: {}", e))
        })?;
        tracing::info!(url = %config.redis_url, "Connected to Redis");
        Ok(Self { connection })
    }
}

fn command_failed(command: &str) -> impl Fn(RedisError) -> CacheError + '_ {
    move |err| {
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
            CacheError::Unavailable {
                reason: err.to_string(),
            }
        } else {
            CacheError::CommandFailed {
                command: command.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

/// Escape glob metacharacters so a literal prefix can be used in MATCH.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 4);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Whole seconds for EXPIRE, never below one.
fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(command_failed("GET"))?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(key, value, whole_seconds(ttl))
            .await
            .map_err(command_failed("SETEX"))?;
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut removed = 0u64;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(command_failed("SCAN"))?;

            if !keys.is_empty() {
                let deleted: u64 = conn.del(&keys).await.map_err(command_failed("DEL"))?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }

    async fn increment_in_window(&self, key: &str, window: Duration) -> CacheResult<i64> {
        let mut conn = self.connection.clone();
        let count: i64 = INCREMENT_IN_WINDOW
            .key(key)
            .arg(whole_seconds(window))
            .invoke_async(&mut conn)
            .await
            .map_err(command_failed("EVALSHA"))?;
        Ok(count)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_failed("PING"))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
