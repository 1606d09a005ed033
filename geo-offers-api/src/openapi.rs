//! OpenAPI Specification for the Geo Offers API
//!
//! Generated by utoipa from the route annotations and schema derives.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use geo_offers_core::{GeoStat, Offer, OfferPage};

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthComponents, HealthResponse, HealthStatus};
use crate::routes::offers::CreateOfferResponse;
use crate::routes::sync::SyncResponse;
use crate::routes::{health, offers, sync};
use crate::telemetry::metrics;

/// OpenAPI document for the Geo Offers API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geo Offers API",
        version = "0.3.0",
        description = "Geo-tagged offer listings with a cached query path and upstream feed sync",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Offers", description = "Offer listings and creation"),
        (name = "Sync", description = "Upstream feed synchronization"),
        (name = "Health", description = "Liveness and dependency checks"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        offers::list_geo_offers,
        offers::list_sorted_offers,
        offers::geo_stats,
        offers::create_offer,
        sync::trigger_sync,
        health::health,
        health::ping,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            Offer, OfferPage, GeoStat,
            CreateOfferResponse, SyncResponse,
            HealthResponse, HealthStatus, HealthComponents, ComponentHealth
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security scheme modifier for OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Static API token, with or without the Bearer prefix"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate the OpenAPI document as a JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
