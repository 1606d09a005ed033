//! Health, ping, metrics and OpenAPI endpoints.

mod support;

use std::sync::Arc;

use axum::http::StatusCode;
use geo_offers_test_utils::{UnavailableCache, UnavailableRecordStore};
use support::TestApp;

#[tokio::test]
async fn test_ping() -> Result<(), String> {
    let app = TestApp::builder().build();
    let response = app.get("/api/v1/ping").await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "pong");
    Ok(())
}

#[tokio::test]
async fn test_health_ok_with_in_memory_backends() -> Result<(), String> {
    let app = TestApp::builder().build();

    let response = app.get("/api/v1/health").await?;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json()?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["database"]["status"], "ok");
    assert_eq!(body["components"]["cache"]["status"], "ok");
    assert_eq!(body["components"]["cache"]["backend"], "memory");
    Ok(())
}

#[tokio::test]
async fn test_health_unhealthy_without_database() -> Result<(), String> {
    let app = TestApp::builder()
        .records(Arc::new(UnavailableRecordStore))
        .build();

    let response = app.get("/api/v1/health").await?;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json()?;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["components"]["database"]["status"], "unhealthy");
    assert_eq!(body["components"]["database"]["error"], "Database check failed");
    Ok(())
}

#[tokio::test]
async fn test_health_degraded_without_cache() -> Result<(), String> {
    let app = TestApp::builder()
        .cache(Arc::new(UnavailableCache))
        .without_rate_limit()
        .build();

    let response = app.get("/api/v1/health").await?;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json()?;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["database"]["status"], "ok");
    assert_eq!(body["components"]["cache"]["status"], "degraded");
    Ok(())
}

#[tokio::test]
async fn test_listing_survives_cache_outage() -> Result<(), String> {
    let app = TestApp::builder()
        .offers(geo_offers_test_utils::fixtures::mixed_catalogue())
        .cache(Arc::new(UnavailableCache))
        .without_rate_limit()
        .build();

    let response = app.get("/api/v1/offers/RU").await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-cache"), Some("MISS"));
    assert_eq!(response.json()?["total"], 3);
    Ok(())
}

#[tokio::test]
async fn test_metrics_exposition() -> Result<(), String> {
    let app = TestApp::builder().build();
    app.get("/api/v1/ping").await?;

    let response = app.get("/api/v1/metrics").await?;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("geo_offers_http_requests_total"));
    Ok(())
}

#[tokio::test]
async fn test_metrics_route_can_be_disabled() -> Result<(), String> {
    let app = TestApp::builder()
        .config(|c| c.metrics_enabled = false)
        .build();

    let response = app.get("/api/v1/metrics").await?;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_openapi_document_served() -> Result<(), String> {
    let app = TestApp::builder().build();

    let response = app.get("/openapi.json").await?;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json()?;
    assert_eq!(body["info"]["title"], "Geo Offers API");
    assert!(body["paths"]["/offers"].is_object());
    Ok(())
}
