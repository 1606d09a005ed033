//! Health Check Endpoints
//!
//! - `/api/v1/health`: database and cache checks
//! - `/api/v1/ping`: liveness
//!
//! The database is required; a failed check answers 500. The cache only
//! degrades the service, because listings fall back to the database.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: HealthComponents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthComponents {
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn from_check(
        backend: Option<&str>,
        started: Instant,
        result: Result<(), String>,
        failed_status: HealthStatus,
    ) -> Self {
        let backend = backend.map(str::to_string);
        match result {
            Ok(()) => Self {
                status: HealthStatus::Ok,
                backend,
                latency_ms: Some(started.elapsed().as_millis() as u64),
                error: None,
            },
            Err(error) => Self {
                status: failed_status,
                backend,
                latency_ms: None,
                error: Some(error),
            },
        }
    }
}

/// Overall status from the two component checks.
fn overall_status(database: HealthStatus, cache: HealthStatus) -> HealthStatus {
    match (database, cache) {
        (HealthStatus::Ok, HealthStatus::Ok) => HealthStatus::Ok,
        (HealthStatus::Ok, _) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/v1/ping - Simple pong response
#[utoipa::path(
    get,
    path = "/api/v1/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is responding", body = String),
    ),
)]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /api/v1/health - Dependency checks
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy or degraded", body = HealthResponse),
        (status = 500, description = "Database is unreachable", body = HealthResponse),
    ),
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let database_check = state.records.ping().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        "Database check failed".to_string()
    });
    let database =
        ComponentHealth::from_check(None, started, database_check, HealthStatus::Unhealthy);

    let started = Instant::now();
    let cache_check = state.cache.ping().await.map_err(|e| {
        tracing::warn!(error = %e, "Cache health check failed");
        "Cache check failed".to_string()
    });
    let cache = ComponentHealth::from_check(
        Some(state.cache.backend_name()),
        started,
        cache_check,
        HealthStatus::Degraded,
    );

    let status = overall_status(database.status, cache.status);
    let status_code = if status == HealthStatus::Unhealthy {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: HealthComponents { database, cache },
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status() {
        assert_eq!(overall_status(HealthStatus::Ok, HealthStatus::Ok), HealthStatus::Ok);
        assert_eq!(
            overall_status(HealthStatus::Ok, HealthStatus::Degraded),
            HealthStatus::Degraded
        );
        assert_eq!(
            overall_status(HealthStatus::Unhealthy, HealthStatus::Ok),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_status_serializes_lowercase() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&HealthStatus::Ok)?, "\"ok\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Degraded)?, "\"degraded\"");
        Ok(())
    }

    #[test]
    fn test_component_error_omits_latency() -> Result<(), serde_json::Error> {
        let component = ComponentHealth::from_check(
            Some("redis"),
            Instant::now(),
            Err("Cache check failed".to_string()),
            HealthStatus::Degraded,
        );
        let json = serde_json::to_value(&component)?;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["backend"], "redis");
        assert!(json.get("latency_ms").is_none());
        Ok(())
    }
}
