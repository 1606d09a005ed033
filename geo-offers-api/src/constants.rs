//! Constants for the geo offers API
//!
//! Default values for configuration and a few fixed protocol values.

// ============================================================================
// QUERY CACHE
// ============================================================================

/// TTL of a cached listing payload (10 minutes)
pub const DEFAULT_QUERY_CACHE_TTL_SECS: u64 = 600;

// ============================================================================
// RATE LIMITING
// ============================================================================

/// Requests allowed per client per window
pub const DEFAULT_RATE_LIMIT_REQUESTS: i64 = 30;

/// Length of the fixed rate limit window in seconds
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Client discriminator used when the peer address is unknown
pub const UNKNOWN_CLIENT: &str = "unknown";

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// SYNC JOB
// ============================================================================

/// Hard cap on upstream pages fetched per sync run
pub const DEFAULT_SYNC_MAX_PAGES: u32 = 100;

/// Per-request timeout for upstream feed calls
pub const DEFAULT_SYNC_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Interval between scheduled sync runs (1 hour); 0 disables the schedule
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3600;

// ============================================================================
// DATABASE
// ============================================================================

pub const DEFAULT_DB_POOL_SIZE: usize = 16;

pub const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// SERVER
// ============================================================================

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default Redis endpoint
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// File name used for the rolling log file
pub const LOG_FILE_NAME: &str = "app.log";
