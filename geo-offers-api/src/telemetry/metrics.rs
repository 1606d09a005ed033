//! Prometheus Metrics Definitions
//!
//! Defines the service metrics and the text exposition handler.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec, Encoder,
    HistogramVec, IntCounter, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<OfferMetrics>> = Lazy::new(OfferMetrics::new);

/// Container for all service metrics.
#[derive(Clone)]
pub struct OfferMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Listing cache lookups - labels: namespace (geo/all), result (hit/miss/error)
    pub cache_lookups_total: CounterVec,

    /// Requests rejected by the rate limiter
    pub rate_limited_total: IntCounter,

    /// Sync runs - labels: outcome (completed/aborted/cancelled)
    pub sync_runs_total: CounterVec,

    /// Offers written by sync - labels: action (created/updated/failed)
    pub sync_offers_total: CounterVec,
}

impl OfferMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "geo_offers_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "geo_offers_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            cache_lookups_total: register_counter_vec!(
                "geo_offers_cache_lookups_total",
                "Listing cache lookups by outcome",
                &["namespace", "result"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_lookups_total: {}", e)))?,

            rate_limited_total: register_int_counter!(
                "geo_offers_rate_limited_total",
                "Requests rejected by the rate limiter"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register rate_limited_total: {}", e)))?,

            sync_runs_total: register_counter_vec!(
                "geo_offers_sync_runs_total",
                "Offer sync runs by outcome",
                &["outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register sync_runs_total: {}", e)))?,

            sync_offers_total: register_counter_vec!(
                "geo_offers_sync_offers_total",
                "Offers written by sync runs",
                &["action"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register sync_offers_total: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_cache_lookup(&self, namespace: &str, result: &str) {
        self.cache_lookups_total
            .with_label_values(&[namespace, result])
            .inc();
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited_total.inc();
    }

    /// Record a finished sync run and the offers it wrote.
    pub fn record_sync_run(&self, outcome: &str, created: usize, updated: usize, failed: usize) {
        self.sync_runs_total.with_label_values(&[outcome]).inc();
        for (action, count) in [("created", created), ("updated", updated), ("failed", failed)] {
            if count > 0 {
                self.sync_offers_total
                    .with_label_values(&[action])
                    .inc_by(count as f64);
            }
        }
    }
}

/// Handler for GET /api/v1/metrics.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/api/v1/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // Register on first scrape even if no request was recorded yet
    if let Err(e) = METRICS.as_ref() {
        tracing::error!(error = %e, "Metrics registry unavailable");
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> Result<&'static OfferMetrics, String> {
        METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))
    }

    #[test]
    fn test_record_cache_lookup() -> Result<(), String> {
        let metrics = metrics()?;
        let before = metrics
            .cache_lookups_total
            .with_label_values(&["geo", "hit"])
            .get();
        metrics.record_cache_lookup("geo", "hit");
        let after = metrics
            .cache_lookups_total
            .with_label_values(&["geo", "hit"])
            .get();
        assert!(after >= before + 1.0);
        Ok(())
    }

    #[test]
    fn test_record_sync_run_skips_zero_counts() -> Result<(), String> {
        let metrics = metrics()?;
        metrics.record_sync_run("completed", 2, 0, 0);
        assert!(
            metrics
                .sync_offers_total
                .with_label_values(&["created"])
                .get()
                >= 2.0
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_metrics_handler_exposes_service_metrics() -> Result<(), String> {
        metrics()?.record_rate_limited();
        let response = metrics_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        let text = String::from_utf8(body.to_vec()).map_err(|e| e.to_string())?;
        assert!(text.contains("geo_offers_rate_limited_total"));
        Ok(())
    }
}
