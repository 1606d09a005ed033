//! Geo Offers API Server Entry Point
//!
//! Builds the stores from the environment, migrates the schema, starts the
//! sync scheduler and serves the Axum router until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use geo_offers_api::constants::DEFAULT_PORT;
use geo_offers_api::telemetry::{init_logging, TelemetryConfig};
use geo_offers_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, CacheConfig, DbClient, DbConfig,
    HttpOfferFeed, OfferSync, RedisCache, SyncConfig, SyncScheduler, UnconfiguredFeed,
};
use geo_offers_storage::{CacheStore, OfferFeed, RecordStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    let _log_guard = init_logging(&telemetry_config)?;

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;
    db.migrate().await?;
    let records: Arc<dyn RecordStore> = Arc::new(db);

    let cache: Arc<dyn CacheStore> = Arc::new(RedisCache::connect(&CacheConfig::from_env()).await?);

    let sync_config = SyncConfig::from_env();
    let feed: Arc<dyn OfferFeed> = match &sync_config.feed_url {
        Some(url) => Arc::new(HttpOfferFeed::new(
            url,
            sync_config.request_timeout,
            sync_config.accept_invalid_certs,
        )?),
        None => {
            tracing::warn!("No feed URL configured; offer sync runs will abort");
            Arc::new(UnconfiguredFeed)
        }
    };
    let sync = OfferSync::new(records.clone(), cache.clone(), feed, sync_config.max_pages);
    let scheduler = SyncScheduler::new(sync, sync_config);
    scheduler.start();

    let api_config = ApiConfig::from_env();
    if api_config.api_token.is_none() {
        tracing::warn!("No API token configured; POST /offers will reject every request");
    }

    let app = create_api_router(AppState::new(records, cache, scheduler.clone(), api_config));

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting geo offers API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    scheduler.shutdown().await;
    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("GEO_OFFERS_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
