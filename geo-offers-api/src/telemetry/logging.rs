//! Tracing Subscriber Initialization
//!
//! Console output in JSON or human format, plus an optional daily-rolling
//! JSON log file.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::constants::LOG_FILE_NAME;
use crate::error::{ApiError, ApiResult};

const DEFAULT_LOG_FILTER: &str = "geo_offers_api=debug,tower_http=info,info";

/// Console log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" | "text" | "human" => Some(LogFormat::Pretty),
            _ => None,
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    pub log_format: LogFormat,
    /// Directory for `app.log` rotation. `None` disables file output.
    pub log_dir: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "geo-offers-api".to_string(),
            log_format: LogFormat::Json,
            log_dir: None,
        }
    }
}

impl TelemetryConfig {
    /// Create TelemetryConfig from environment variables.
    ///
    /// - `GEO_OFFERS_SERVICE_NAME` (default: geo-offers-api)
    /// - `GEO_OFFERS_LOG_FORMAT`: "json" or "pretty" (default: json)
    /// - `GEO_OFFERS_LOG_DIR`: enables file logging into this directory
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: std::env::var("GEO_OFFERS_SERVICE_NAME")
                .unwrap_or(defaults.service_name),
            log_format: std::env::var("GEO_OFFERS_LOG_FORMAT")
                .ok()
                .and_then(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.log_format),
            log_dir: std::env::var("GEO_OFFERS_LOG_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. The returned guard flushes the file writer on drop
/// and must be held for the life of the process.
pub fn init_logging(config: &TelemetryConfig) -> ApiResult<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(match config.log_format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().boxed(),
    });

    let mut guard = None;
    if let Some(dir) = &config.log_dir {
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        log_format = ?config.log_format,
        log_dir = ?config.log_dir,
        "Logging initialized"
    );

    Ok(guard)
}
