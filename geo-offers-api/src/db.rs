//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres and the
//! [`RecordStore`] implementation over the `offers` and `request_logs`
//! tables.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use geo_offers_core::{
    ExternalId, GeoStat, ListingFilter, NewRequestLog, Offer, PageRequest, StorageError,
    StorageResult,
};
use geo_offers_storage::RecordStore;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::constants::{DEFAULT_DB_POOL_SIZE, DEFAULT_DB_TIMEOUT_SECS};
use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection wait timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "geo_offers".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: DEFAULT_DB_POOL_SIZE,
            timeout: Duration::from_secs(DEFAULT_DB_TIMEOUT_SECS),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// Reads `GEO_OFFERS_DB_HOST`, `_PORT`, `_NAME`, `_USER`, `_PASSWORD`,
    /// `_POOL_SIZE` and `_TIMEOUT` (seconds).
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("GEO_OFFERS_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("GEO_OFFERS_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("GEO_OFFERS_DB_NAME")
                .unwrap_or_else(|_| "geo_offers".to_string()),
            user: std::env::var("GEO_OFFERS_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("GEO_OFFERS_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("GEO_OFFERS_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_POOL_SIZE),
            timeout: Duration::from_secs(
                std::env::var("GEO_OFFERS_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DB_TIMEOUT_SECS),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS offers (
    external_id   BIGINT PRIMARY KEY,
    name          TEXT NOT NULL DEFAULT '',
    currency      TEXT NOT NULL DEFAULT '',
    approval_time BIGINT NOT NULL DEFAULT 0,
    site_url      TEXT NOT NULL DEFAULT '',
    logo          TEXT NOT NULL DEFAULT '',
    geo_code      TEXT NOT NULL DEFAULT '',
    geo_name      TEXT NOT NULL DEFAULT '',
    rating        DOUBLE PRECISION NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_offers_geo_code ON offers (geo_code);
CREATE INDEX IF NOT EXISTS idx_offers_rating ON offers (rating DESC, external_id ASC);

CREATE TABLE IF NOT EXISTS request_logs (
    id          BIGSERIAL PRIMARY KEY,
    method      TEXT NOT NULL,
    endpoint    TEXT NOT NULL,
    ip          TEXT NOT NULL,
    user_agent  TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at  TIMESTAMPTZ
);
CREATE INDEX IF NOT EXISTS idx_request_logs_deleted_at ON request_logs (deleted_at);
"#;

const OFFER_COLUMNS: &str =
    "external_id, name, currency, approval_time, site_url, logo, geo_code, geo_name, rating";

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get a connection from the pool.
    pub async fn get_conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Create tables and indexes if they do not exist. Idempotent.
    pub async fn migrate(&self) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA).await?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }

    async fn store_conn(&self) -> StorageResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| StorageError::Unavailable {
            reason: e.to_string(),
        })
    }
}

fn query_failed(err: tokio_postgres::Error) -> StorageError {
    StorageError::QueryFailed {
        reason: err.to_string(),
    }
}

fn offer_from_row(row: &Row) -> Result<Offer, tokio_postgres::Error> {
    Ok(Offer {
        external_id: row.try_get("external_id")?,
        name: row.try_get("name")?,
        currency: row.try_get("currency")?,
        approval_time: row.try_get("approval_time")?,
        site_url: row.try_get("site_url")?,
        logo: row.try_get("logo")?,
        geo_code: row.try_get("geo_code")?,
        geo_name: row.try_get("geo_name")?,
        rating: row.try_get("rating")?,
    })
}

fn offers_from_rows(rows: &[Row]) -> StorageResult<Vec<Offer>> {
    rows.iter()
        .map(|row| offer_from_row(row).map_err(query_failed))
        .collect()
}

#[async_trait]
impl RecordStore for DbClient {
    async fn list_offers(
        &self,
        filter: &ListingFilter,
        page: &PageRequest,
    ) -> StorageResult<Vec<Offer>> {
        let conn = self.store_conn().await?;
        let limit = i64::from(page.limit());
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let rows = match filter.geo_code() {
            Some(geo) => {
                let sql = format!(
                    "SELECT {OFFER_COLUMNS} FROM offers WHERE geo_code = $1 \
                     ORDER BY rating DESC, external_id ASC LIMIT $2 OFFSET $3"
                );
                conn.query(sql.as_str(), &[&geo, &limit, &offset]).await
            }
            None => {
                let sql = format!(
                    "SELECT {OFFER_COLUMNS} FROM offers \
                     ORDER BY rating DESC, external_id ASC LIMIT $1 OFFSET $2"
                );
                conn.query(sql.as_str(), &[&limit, &offset]).await
            }
        }
        .map_err(query_failed)?;

        offers_from_rows(&rows)
    }

    async fn count_offers(&self, filter: &ListingFilter) -> StorageResult<i64> {
        let conn = self.store_conn().await?;
        let row = match filter.geo_code() {
            Some(geo) => {
                conn.query_one("SELECT COUNT(*) FROM offers WHERE geo_code = $1", &[&geo])
                    .await
            }
            None => conn.query_one("SELECT COUNT(*) FROM offers", &[]).await,
        }
        .map_err(query_failed)?;
        row.try_get(0).map_err(query_failed)
    }

    async fn find_offer(&self, external_id: ExternalId) -> StorageResult<Option<Offer>> {
        let conn = self.store_conn().await?;
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offers WHERE external_id = $1");
        let row = conn
            .query_opt(sql.as_str(), &[&external_id])
            .await
            .map_err(query_failed)?;
        row.as_ref()
            .map(offer_from_row)
            .transpose()
            .map_err(query_failed)
    }

    async fn insert_offer(&self, offer: &Offer) -> StorageResult<()> {
        let conn = self.store_conn().await?;
        let sql = format!(
            "INSERT INTO offers ({OFFER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        );
        conn.execute(
            sql.as_str(),
            &[
                &offer.external_id,
                &offer.name,
                &offer.currency,
                &offer.approval_time,
                &offer.site_url,
                &offer.logo,
                &offer.geo_code,
                &offer.geo_name,
                &offer.rating,
            ],
        )
        .await
        .map_err(|e| {
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                StorageError::DuplicateOffer {
                    external_id: offer.external_id,
                }
            } else {
                query_failed(e)
            }
        })?;
        Ok(())
    }

    async fn update_offer(&self, offer: &Offer) -> StorageResult<()> {
        let conn = self.store_conn().await?;
        let updated = conn
            .execute(
                "UPDATE offers SET name = $2, currency = $3, approval_time = $4, site_url = $5, \
                 logo = $6, geo_code = $7, geo_name = $8, rating = $9 WHERE external_id = $1",
                &[
                    &offer.external_id,
                    &offer.name,
                    &offer.currency,
                    &offer.approval_time,
                    &offer.site_url,
                    &offer.logo,
                    &offer.geo_code,
                    &offer.geo_name,
                    &offer.rating,
                ],
            )
            .await
            .map_err(query_failed)?;
        if updated == 0 {
            return Err(StorageError::OfferNotFound {
                external_id: offer.external_id,
            });
        }
        Ok(())
    }

    async fn geo_stats(&self) -> StorageResult<Vec<GeoStat>> {
        let conn = self.store_conn().await?;
        let rows = conn
            .query(
                "SELECT geo_code, COUNT(*) AS count FROM offers GROUP BY geo_code ORDER BY geo_code",
                &[],
            )
            .await
            .map_err(query_failed)?;
        rows.iter()
            .map(|row| {
                Ok(GeoStat {
                    geo_code: row.try_get("geo_code").map_err(query_failed)?,
                    count: row.try_get("count").map_err(query_failed)?,
                })
            })
            .collect()
    }

    async fn append_request_log(&self, entry: &NewRequestLog) -> StorageResult<()> {
        let conn = self.store_conn().await?;
        conn.execute(
            "INSERT INTO request_logs (method, endpoint, ip, user_agent, status_code) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &entry.method,
                &entry.endpoint,
                &entry.ip,
                &entry.user_agent,
                &entry.status_code,
            ],
        )
        .await
        .map_err(query_failed)?;
        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        let conn = self.store_conn().await?;
        conn.simple_query("SELECT 1").await.map_err(query_failed)?;
        Ok(())
    }
}
