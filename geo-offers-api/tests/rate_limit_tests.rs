//! Fixed-window rate limiting through the full router.

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use geo_offers_test_utils::{fixtures, UnavailableCache};
use support::TestApp;

#[tokio::test(start_paused = true)]
async fn test_window_limit_then_reset() -> Result<(), String> {
    let app = TestApp::builder().offers(fixtures::mixed_catalogue()).build();

    for i in 0..30 {
        let response = app.get("/api/v1/ping").await?;
        assert_eq!(response.status, StatusCode::OK, "request {} rejected", i + 1);
    }

    let limited = app.get("/api/v1/offers/RU").await?;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.header("retry-after"), Some("60"));
    assert_eq!(limited.json()?["code"], "TOO_MANY_REQUESTS");

    tokio::time::advance(Duration::from_secs(61)).await;

    let after_reset = app.get("/api/v1/ping").await?;
    assert_eq!(after_reset.status, StatusCode::OK);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_limit_covers_writes_too() -> Result<(), String> {
    let app = TestApp::builder()
        .config(|c| c.rate_limit_requests = 2)
        .build();

    assert_eq!(app.get("/api/v1/ping").await?.status, StatusCode::OK);
    let write = app.post("/offers", None, "{}").await?;
    assert_eq!(write.status, StatusCode::UNAUTHORIZED);

    let limited = app.post("/offers", None, "{}").await?;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}

#[tokio::test]
async fn test_clients_are_counted_separately_behind_trusted_proxy() -> Result<(), String> {
    let app = TestApp::builder()
        .config(|c| {
            c.rate_limit_requests = 1;
            c.trust_proxy_headers = true;
        })
        .build();

    let from = |ip: &str| {
        Request::builder()
            .uri("/api/v1/ping")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .map_err(|e| e.to_string())
    };

    assert_eq!(app.send(from("203.0.113.7")?).await?.status, StatusCode::OK);
    assert_eq!(app.send(from("203.0.113.8")?).await?.status, StatusCode::OK);
    assert_eq!(
        app.send(from("203.0.113.7")?).await?.status,
        StatusCode::TOO_MANY_REQUESTS
    );

    assert!(app.cache.contains_key("ratelimit:203.0.113.7"));
    assert!(app.cache.contains_key("ratelimit:203.0.113.8"));
    Ok(())
}

#[tokio::test]
async fn test_rejected_requests_are_not_audited() -> Result<(), String> {
    let app = TestApp::builder()
        .config(|c| c.rate_limit_requests = 1)
        .build();

    app.get("/api/v1/ping").await?;
    let limited = app.get("/api/v1/ping").await?;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);

    let logs = app.records.request_logs().map_err(|e| e.to_string())?;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status_code, 200);
    Ok(())
}

#[tokio::test]
async fn test_counter_store_failure_fails_closed() -> Result<(), String> {
    let app = TestApp::builder().cache(Arc::new(UnavailableCache)).build();

    let response = app.get("/api/v1/ping").await?;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()?["code"], "CACHE_ERROR");
    Ok(())
}

#[tokio::test]
async fn test_disabled_limiter_ignores_counter_store() -> Result<(), String> {
    let app = TestApp::builder()
        .cache(Arc::new(UnavailableCache))
        .without_rate_limit()
        .build();

    let response = app.get("/api/v1/ping").await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "pong");
    Ok(())
}
