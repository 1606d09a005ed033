//! On-demand offer sync.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::jobs::{SyncScheduler, SyncTrigger};

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SyncResponse {
    pub message: String,
}

/// Start a sync run in the background and return immediately.
#[utoipa::path(
    post,
    path = "/sync-offers",
    tag = "Sync",
    responses(
        (status = 200, description = "Sync started", body = SyncResponse),
        (status = 503, description = "Server is shutting down", body = ApiError),
    ),
)]
pub async fn trigger_sync(
    State(scheduler): State<SyncScheduler>,
) -> ApiResult<(StatusCode, Json<SyncResponse>)> {
    if !scheduler.trigger(SyncTrigger::Manual) {
        return Err(ApiError::service_unavailable("Server is shutting down"));
    }
    Ok((
        StatusCode::OK,
        Json(SyncResponse {
            message: "Offer sync started".to_string(),
        }),
    ))
}
