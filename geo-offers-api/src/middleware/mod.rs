//! Middleware modules for the Geo Offers API
//!
//! - `auth`: static API token check for write routes
//! - `rate_limit`: fixed-window rate limiting on the cache store
//! - `request_log`: request audit rows in the record store
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .route("/offers", post(handler).route_layer(from_fn_with_state(config, require_api_token)))
//!     // Innermost: sees the final status, including 401/404
//!     .layer(from_fn_with_state(request_log_state, request_log_middleware))
//!     // Rejected requests never reach the audit log
//!     .layer(from_fn_with_state(rate_limit_state, rate_limit_middleware))
//!     // Outermost
//! ```

pub mod auth;
pub mod rate_limit;
pub mod request_log;

pub use auth::{authorize, presented_credential, require_api_token, ApiToken};
pub use rate_limit::{
    client_address, extract_client_ip, rate_limit_middleware, RateLimitError, RateLimitState,
};
pub use request_log::{request_log_middleware, RequestLogState};
