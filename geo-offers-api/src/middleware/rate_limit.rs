//! Fixed-Window Rate Limiting
//!
//! One counter per client address in the shared cache store, under
//! `ratelimit:{client}`. The first increment in a window sets the window's
//! expiry; both happen in one atomic store operation. Counts above the limit
//! are rejected with 429 until the counter expires.
//!
//! A counter store failure rejects the request with 500. The limiter fails
//! closed.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use geo_offers_core::rate_limit_key;
use geo_offers_storage::CacheStore;

use crate::config::ApiConfig;
use crate::constants::UNKNOWN_CLIENT;
use crate::error::ApiError;
use crate::telemetry::METRICS;

/// State for the rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    cache: Arc<dyn CacheStore>,
    config: Arc<ApiConfig>,
}

impl RateLimitState {
    pub fn new(cache: Arc<dyn CacheStore>, config: Arc<ApiConfig>) -> Self {
        Self { cache, config }
    }
}

/// Error type for rate limit middleware.
#[derive(Debug)]
pub enum RateLimitError {
    /// Window budget exhausted
    Exceeded {
        /// Seconds until the client may retry
        retry_after: u64,
    },
    /// Counter store failed
    Store(ApiError),
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        match self {
            RateLimitError::Exceeded { retry_after } => {
                let mut response = ApiError::too_many_requests(Some(retry_after)).into_response();
                response.headers_mut().insert(
                    RETRY_AFTER,
                    HeaderValue::from_str(&retry_after.to_string())
                        .unwrap_or_else(|_| HeaderValue::from_static("60")),
                );
                response
            }
            RateLimitError::Store(err) => err.into_response(),
        }
    }
}

/// Client address used as the rate limit discriminator.
///
/// Proxy headers are consulted only when `trust_proxy_headers` is set;
/// otherwise a client could pick its own bucket.
pub fn extract_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> Option<IpAddr> {
    if trust_proxy_headers {
        // X-Forwarded-For can contain multiple IPs, take the first one
        if let Some(first) = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
        {
            if let Ok(ip) = first.trim().parse() {
                return Some(ip);
            }
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
        {
            return Some(ip);
        }
    }

    peer.map(|addr| addr.ip())
}

/// Client address of a request as a string, `"unknown"` when the server was
/// not started with connect info and no trusted header is present.
pub fn client_address(request: &Request, trust_proxy_headers: bool) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    extract_client_ip(request.headers(), peer, trust_proxy_headers)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn retry_after_secs(window: Duration) -> u64 {
    window.as_secs().max(1)
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !state.config.rate_limit_enabled {
        return Ok(next.run(request).await);
    }

    let client = client_address(&request, state.config.trust_proxy_headers);
    let key = rate_limit_key(&client);

    let count = state
        .cache
        .increment_in_window(&key, state.config.rate_limit_window)
        .await
        .map_err(|e| {
            tracing::error!(%client, error = %e, "Rate limit counter unavailable");
            RateLimitError::Store(ApiError::cache_error("Rate limiter unavailable"))
        })?;

    if count > state.config.rate_limit_requests {
        tracing::warn!(%client, count, limit = state.config.rate_limit_requests, "Rate limit exceeded");
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_rate_limited();
        }
        return Err(RateLimitError::Exceeded {
            retry_after: retry_after_secs(state.config.rate_limit_window),
        });
    }

    Ok(next.run(request).await)
}
