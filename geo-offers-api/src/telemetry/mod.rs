//! Geo Offers Telemetry
//!
//! Structured logging setup, Prometheus metrics and the request
//! instrumentation middleware.

pub mod logging;
pub mod metrics;
pub mod middleware;

pub use logging::{init_logging, LogFormat, TelemetryConfig};
pub use metrics::{metrics_handler, OfferMetrics, METRICS};
pub use middleware::observability_middleware;
