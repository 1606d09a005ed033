//! REST API Routes Module
//!
//! - Offer listings, geo stats and offer creation
//! - On-demand sync trigger
//! - Health, ping and metrics endpoints
//! - OpenAPI document
//! - CORS support for browser-based clients

pub mod health;
pub mod offers;
pub mod sync;

use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::middleware::{
    rate_limit_middleware, request_log_middleware, require_api_token, RateLimitState,
    RequestLogState,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// CORS
// ============================================================================

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            HeaderName::from_static("retry-after"),
            HeaderName::from_static("x-cache"),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        // Development mode: allow all origins
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
///
/// Every route sits behind, from the outside in: CORS, observability, the
/// rate limiter and the request logger. `POST /offers` additionally
/// requires the API token.
pub fn create_api_router(state: AppState) -> Router {
    let config = state.config.clone();

    let rate_limit_state = RateLimitState::new(state.cache.clone(), config.clone());
    let request_log_state = RequestLogState::new(state.records.clone(), config.trust_proxy_headers);

    let mut api_v1 = Router::new()
        .route("/offers/:geo", get(offers::list_geo_offers))
        .route("/offers-sorted", get(offers::list_sorted_offers))
        .route("/geo-stats", get(offers::geo_stats))
        .route("/health", get(health::health))
        .route("/ping", get(health::ping));
    if config.metrics_enabled {
        api_v1 = api_v1.route("/metrics", get(metrics_handler));
    }

    let writes = Router::new()
        .route(
            "/offers",
            post(offers::create_offer)
                .route_layer(from_fn_with_state(config.clone(), require_api_token)),
        )
        .route("/sync-offers", post(sync::trigger_sync));

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(writes)
        .route("/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(from_fn_with_state(request_log_state, request_log_middleware))
        .layer(from_fn_with_state(rate_limit_state, rate_limit_middleware))
        .layer(from_fn(observability_middleware))
        .layer(build_cors_layer(&config))
}
