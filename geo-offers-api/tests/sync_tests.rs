//! Upstream sync against the router: invalidation, idempotence and the
//! manual trigger endpoint.

mod support;

use std::collections::BTreeSet;

use axum::http::StatusCode;
use geo_offers_test_utils::fixtures::{feed_page, feed_record, offer};
use support::TestApp;
use tokio::sync::watch;

#[tokio::test]
async fn test_sync_purges_listings_it_touched() -> Result<(), String> {
    let app = TestApp::builder()
        .offers(vec![offer(1, "RU", 100.0), offer(2, "KZ", 50.0)])
        .feed_pages(vec![feed_page(vec![feed_record(1, &[("RU", "Russia")])])])
        .build();

    app.get("/api/v1/offers/RU").await?;
    app.get("/api/v1/offers/KZ").await?;
    app.get("/api/v1/offers-sorted").await?;

    let (_tx, rx) = watch::channel(false);
    let report = app.sync.run(&rx).await;
    assert_eq!(report.updated_ids, BTreeSet::from([1]));
    assert!(report.aborted.is_none());
    assert_eq!(report.cache_keys_purged, 2);

    assert!(!app.cache.contains_key("offers:RU:page:1:limit:5"));
    assert!(!app.cache.contains_key("offers_sorted:page:1:limit:5"));
    assert!(app.cache.contains_key("offers:KZ:page:1:limit:5"));

    let fresh = app.get("/api/v1/offers/RU").await?;
    assert_eq!(fresh.header("x-cache"), Some("MISS"));
    let body = fresh.json()?;
    assert_eq!(body["offers"][0]["name"], "Feed offer 1");
    let rating = body["offers"][0]["rating"]
        .as_f64()
        .ok_or_else(|| "rating is not a number".to_string())?;
    assert!((rating - 500.0).abs() < 1e-6);
    Ok(())
}

#[tokio::test]
async fn test_repeated_sync_is_idempotent() -> Result<(), String> {
    let app = TestApp::builder()
        .feed_pages(vec![
            feed_page(vec![
                feed_record(10, &[("RU", "Russia")]),
                feed_record(11, &[("US", "United States"), ("Wrld", "World")]),
            ]),
            feed_page(vec![feed_record(12, &[("KZ", "Kazakhstan")])]),
        ])
        .build();
    let (_tx, rx) = watch::channel(false);

    let first = app.sync.run(&rx).await;
    assert_eq!(first.created_ids, BTreeSet::from([10, 11, 12]));
    assert_eq!(first.skipped_variants, 1);
    let after_first = app.records.offers().map_err(|e| e.to_string())?;

    let second = app.sync.run(&rx).await;
    assert!(second.created_ids.is_empty());
    assert_eq!(second.updated_ids, BTreeSet::from([10, 11, 12]));
    assert_eq!(app.records.offers().map_err(|e| e.to_string())?, after_first);
    Ok(())
}

#[tokio::test]
async fn test_multi_geo_record_keeps_last_variant() -> Result<(), String> {
    let app = TestApp::builder()
        .feed_pages(vec![feed_page(vec![feed_record(
            20,
            &[("RU", "Russia"), ("KZ", "Kazakhstan")],
        )])])
        .build();
    let (_tx, rx) = watch::channel(false);

    let report = app.sync.run(&rx).await;
    assert_eq!(report.created_ids, BTreeSet::from([20]));
    assert_eq!(report.updated_ids, BTreeSet::from([20]));
    assert_eq!(app.records.offer_count().map_err(|e| e.to_string())?, 1);

    let ru = app.get("/api/v1/offers/RU").await?;
    assert_eq!(ru.status, StatusCode::NOT_FOUND);
    let kz = app.get("/api/v1/offers/KZ").await?;
    assert_eq!(kz.status, StatusCode::OK);
    assert_eq!(kz.json()?["offers"][0]["geo_name"], "Kazakhstan");
    Ok(())
}

#[tokio::test]
async fn test_trigger_endpoint_runs_sync_in_background() -> Result<(), String> {
    let app = TestApp::builder()
        .feed_pages(vec![feed_page(vec![feed_record(30, &[("US", "United States")])])])
        .build();

    let response = app.post("/sync-offers", None, "").await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()?["message"], "Offer sync started");

    app.wait_for_completed_runs(1).await?;
    assert_eq!(app.records.offer_count().map_err(|e| e.to_string())?, 1);
    assert_eq!(app.feed.requested_pages(), vec![1, 2]);

    app.scheduler.shutdown().await;
    let refused = app.post("/sync-offers", None, "").await?;
    assert_eq!(refused.status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}
