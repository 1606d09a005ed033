//! API Configuration Module
//!
//! Configuration for the HTTP surface (CORS, rate limiting, the static API
//! token, query cache TTL) and the cache store connection. Loaded from
//! environment variables with development defaults.

use std::time::Duration;

use crate::constants::{
    DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_QUERY_CACHE_TTL_SECS, DEFAULT_RATE_LIMIT_REQUESTS,
    DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_REDIS_URL,
};
use crate::middleware::auth::ApiToken;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS, rate limiting, authentication and caching.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // Authentication
    // ========================================================================
    /// Static token required by `POST /offers`. `None` rejects every
    /// creation request.
    pub api_token: Option<ApiToken>,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================
    /// Whether rate limiting is enabled.
    pub rate_limit_enabled: bool,

    /// Requests allowed per client within one window.
    pub rate_limit_requests: i64,

    /// Fixed window length.
    pub rate_limit_window: Duration,

    /// Derive the client address from `X-Forwarded-For` / `X-Real-IP`.
    /// Only enable behind a proxy that overwrites these headers.
    pub trust_proxy_headers: bool,

    // ========================================================================
    // Query Cache
    // ========================================================================
    /// TTL of cached listing payloads.
    pub query_cache_ttl: Duration,

    // ========================================================================
    // Observability
    // ========================================================================
    /// Serve Prometheus metrics at `/api/v1/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            rate_limit_enabled: true,
            rate_limit_requests: DEFAULT_RATE_LIMIT_REQUESTS,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            trust_proxy_headers: false,
            query_cache_ttl: Duration::from_secs(DEFAULT_QUERY_CACHE_TTL_SECS),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `GEO_OFFERS_API_TOKEN` (fallback `API_TOKEN`): token for offer creation
    /// - `GEO_OFFERS_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `GEO_OFFERS_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `GEO_OFFERS_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `GEO_OFFERS_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `GEO_OFFERS_RATE_LIMIT_REQUESTS`: Requests per window per client (default: 30)
    /// - `GEO_OFFERS_RATE_LIMIT_WINDOW_SECS`: Window length (default: 60)
    /// - `GEO_OFFERS_TRUST_PROXY_HEADERS`: "true" or "false" (default: false)
    /// - `GEO_OFFERS_QUERY_CACHE_TTL_SECS`: Listing cache TTL (default: 600)
    /// - `GEO_OFFERS_METRICS_ENABLED`: "true"/"1" or "false" (default: true)
    pub fn from_env() -> Self {
        let api_token = std::env::var("GEO_OFFERS_API_TOKEN")
            .or_else(|_| std::env::var("API_TOKEN"))
            .ok()
            .and_then(ApiToken::new);

        let cors_origins = std::env::var("GEO_OFFERS_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("GEO_OFFERS_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("GEO_OFFERS_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CORS_MAX_AGE_SECS);

        let rate_limit_enabled = std::env::var("GEO_OFFERS_RATE_LIMIT_ENABLED")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limit_requests = std::env::var("GEO_OFFERS_RATE_LIMIT_REQUESTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &i64| *n > 0)
            .unwrap_or(DEFAULT_RATE_LIMIT_REQUESTS);

        let rate_limit_window = Duration::from_secs(
            std::env::var("GEO_OFFERS_RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u64| *n > 0)
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        );

        let trust_proxy_headers = std::env::var("GEO_OFFERS_TRUST_PROXY_HEADERS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let query_cache_ttl = Duration::from_secs(
            std::env::var("GEO_OFFERS_QUERY_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_QUERY_CACHE_TTL_SECS),
        );

        let metrics_enabled = std::env::var("GEO_OFFERS_METRICS_ENABLED")
            .map(|s| s == "true" || s == "1")
            .unwrap_or(true);

        Self {
            api_token,
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_window,
            trust_proxy_headers,
            query_cache_ttl,
            metrics_enabled,
        }
    }

    /// Set the API token, ignoring empty values.
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = ApiToken::new(token.into());
        self
    }
}

// ============================================================================
// CACHE STORE CONFIGURATION
// ============================================================================

/// Connection settings for the Redis-backed cache store.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
        }
    }
}

impl CacheConfig {
    /// Create CacheConfig from environment variables.
    ///
    /// - `GEO_OFFERS_REDIS_URL`: full connection URL
    /// - `REDIS_HOST`: `host:port`, used when the URL is not set
    pub fn from_env() -> Self {
        let redis_url = std::env::var("GEO_OFFERS_REDIS_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                std::env::var("REDIS_HOST")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(|host| format!("redis://{}", host.trim()))
            })
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
        Self { redis_url }
    }
}
