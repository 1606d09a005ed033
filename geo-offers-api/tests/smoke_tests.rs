//! End-to-end smoke tests against PostgreSQL and Redis.
//!
//! Run with `--features db-tests` and the usual `GEO_OFFERS_DB_*` /
//! `GEO_OFFERS_REDIS_URL` environment.

#![cfg(feature = "db-tests")]

use std::time::Duration;

use geo_offers_api::query::purge_listings;
use geo_offers_api::{ApiResult, CacheConfig, DbClient, DbConfig, RedisCache};
use geo_offers_core::{ListingFilter, PageRequest};
use geo_offers_storage::{CacheStore, RecordStore};
use geo_offers_test_utils::fixtures::offer;

async fn test_db() -> ApiResult<DbClient> {
    let db = DbClient::from_config(&DbConfig::from_env())?;
    db.migrate().await?;
    Ok(db)
}

/// Ids far from anything a real feed produces.
fn smoke_id(offset: i64) -> i64 {
    9_000_000_000 + offset
}

#[tokio::test]
async fn smoke_test_offer_crud_chain() -> ApiResult<()> {
    let db = test_db().await?;
    let geo = "ZZ";

    let mut created = offer(smoke_id(1), geo, 42.0);
    if db.find_offer(created.external_id).await?.is_none() {
        db.insert_offer(&created).await?;
    }

    created.rating = 84.0;
    created.geo_name = "Smokeland".to_string();
    db.update_offer(&created).await?;

    let found = db.find_offer(created.external_id).await?;
    assert_eq!(found.as_ref().map(|o| o.rating), Some(84.0));

    let filter = ListingFilter::geo(geo);
    let page = db
        .list_offers(&filter, &PageRequest::new(Some(1), Some(20)))
        .await?;
    assert!(page.iter().any(|o| o.external_id == created.external_id));
    assert!(db.count_offers(&filter).await? >= 1);

    let stats = db.geo_stats().await?;
    assert!(stats.iter().any(|s| s.geo_code == geo));

    db.ping().await?;
    Ok(())
}

#[tokio::test]
async fn smoke_test_redis_cache_and_counter() -> ApiResult<()> {
    let cache = RedisCache::connect(&CacheConfig::from_env()).await?;
    cache.ping().await?;

    let key = ListingFilter::geo("ZZ").cache_key(&PageRequest::default());
    cache.set_with_ttl(&key, "{}", Duration::from_secs(30)).await?;
    assert_eq!(cache.get(&key).await?.as_deref(), Some("{}"));

    let purged = purge_listings(&cache, ["ZZ"]).await;
    assert!(purged.keys_removed >= 1);
    assert!(purged.failed_prefixes.is_empty());
    assert_eq!(cache.get(&key).await?, None);

    let counter = format!("ratelimit:smoke-{}", std::process::id());
    assert_eq!(cache.increment_in_window(&counter, Duration::from_secs(5)).await?, 1);
    assert_eq!(cache.increment_in_window(&counter, Duration::from_secs(5)).await?, 2);
    Ok(())
}
