//! Static API Token Check
//!
//! Offer creation is guarded by one process-wide token. The `Authorization`
//! header may carry it as `Bearer <token>` or bare.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::config::ApiConfig;
use crate::error::ApiError;

// ============================================================================
// API TOKEN (TYPE-SAFE)
// ============================================================================

/// Configured API token. Never printed.
#[derive(Clone)]
pub struct ApiToken(SecretString);

impl ApiToken {
    /// Wrap a token. Empty or whitespace-only input yields `None`.
    pub fn new(token: String) -> Option<Self> {
        if token.trim().is_empty() {
            return None;
        }
        Some(Self(SecretString::new(token.into())))
    }

    /// Check a presented credential in constant time.
    pub fn verify(&self, presented: &str) -> bool {
        let expected = self.0.expose_secret().as_bytes();
        presented.as_bytes().ct_eq(expected).into()
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ApiToken([REDACTED, {} chars])",
            self.0.expose_secret().len()
        )
    }
}

/// Credential carried by the `Authorization` header, with any `Bearer`
/// scheme stripped.
pub fn presented_credential(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let credential = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    };
    if credential.is_empty() {
        None
    } else {
        Some(credential)
    }
}

/// Authorize a request against the configured token.
pub fn authorize(token: Option<&ApiToken>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(token) = token else {
        tracing::warn!("Rejected write: no API token configured");
        return Err(ApiError::unauthorized());
    };
    match presented_credential(headers) {
        Some(credential) if token.verify(credential) => Ok(()),
        Some(_) => {
            tracing::warn!("Rejected write: API token mismatch");
            Err(ApiError::unauthorized())
        }
        None => {
            tracing::debug!("Rejected write: missing Authorization header");
            Err(ApiError::unauthorized())
        }
    }
}

// ============================================================================
// MIDDLEWARE
// ============================================================================

/// Route layer that rejects requests without the configured token.
pub async fn require_api_token(
    State(config): State<Arc<ApiConfig>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(config.api_token.as_ref(), request.headers())?;
    Ok(next.run(request).await)
}
