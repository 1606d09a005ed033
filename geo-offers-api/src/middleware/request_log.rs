//! Request Audit Logging
//!
//! Appends one `request_logs` row per completed request. A failed write is
//! logged and the response is returned unchanged.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::USER_AGENT,
    middleware::Next,
    response::Response,
};
use geo_offers_core::NewRequestLog;
use geo_offers_storage::RecordStore;

use super::rate_limit::client_address;

/// State for the request logging middleware.
#[derive(Clone)]
pub struct RequestLogState {
    records: Arc<dyn RecordStore>,
    trust_proxy_headers: bool,
}

impl RequestLogState {
    pub fn new(records: Arc<dyn RecordStore>, trust_proxy_headers: bool) -> Self {
        Self {
            records,
            trust_proxy_headers,
        }
    }
}

pub async fn request_log_middleware(
    State(state): State<RequestLogState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let endpoint = request.uri().path().to_string();
    let ip = client_address(&request, state.trust_proxy_headers);
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let response = next.run(request).await;

    let entry = NewRequestLog {
        method,
        endpoint,
        ip,
        user_agent,
        status_code: i32::from(response.status().as_u16()),
    };
    if let Err(e) = state.records.append_request_log(&entry).await {
        tracing::error!(
            method = %entry.method,
            endpoint = %entry.endpoint,
            error = %e,
            "Failed to write request log"
        );
    }

    response
}
