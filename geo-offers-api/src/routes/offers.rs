//! Offer REST API Routes
//!
//! Listings are served through the query cache. The cached body is written
//! to the wire as-is, so a hit costs one cache read and no serialization.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use geo_offers_core::{GeoStat, ListingFilter, Offer, OfferPage, PageRequest};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::query::{Listing, OfferQueryService};
use crate::state::AppState;

/// `x-cache: HIT|MISS` on listing responses.
const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");

// ============================================================================
// TYPES
// ============================================================================

/// Raw pagination query. Values are normalized, never rejected.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingParams {
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Page size, 1 to 20 (default 5)
    pub limit: Option<String>,
}

impl ListingParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref())
    }
}

/// Response body of a successful offer creation.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateOfferResponse {
    pub message: String,
    pub offer: Offer,
}

fn listing_response(listing: Listing) -> Response {
    let cache_status = if listing.cache_hit { "HIT" } else { "MISS" };
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (CACHE_STATUS_HEADER, HeaderValue::from_static(cache_status)),
        ],
        listing.body,
    )
        .into_response()
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Offers for one geo code, best rated first.
#[utoipa::path(
    get,
    path = "/api/v1/offers/{geo}",
    tag = "Offers",
    params(
        ("geo" = String, Path, description = "Geo code, e.g. RU"),
        ListingParams,
    ),
    responses(
        (status = 200, description = "One page of offers", body = OfferPage),
        (status = 404, description = "No offers on this page", body = ApiError),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
        (status = 500, description = "Record store failure", body = ApiError),
    ),
)]
pub async fn list_geo_offers(
    State(queries): State<OfferQueryService>,
    Path(geo): Path<String>,
    Query(params): Query<ListingParams>,
) -> ApiResult<Response> {
    let listing = queries
        .listing(&ListingFilter::geo(geo), params.page_request())
        .await?;
    Ok(listing_response(listing))
}

/// All offers, best rated first.
#[utoipa::path(
    get,
    path = "/api/v1/offers-sorted",
    tag = "Offers",
    params(ListingParams),
    responses(
        (status = 200, description = "One page of offers", body = OfferPage),
        (status = 404, description = "No offers on this page", body = ApiError),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
        (status = 500, description = "Record store failure", body = ApiError),
    ),
)]
pub async fn list_sorted_offers(
    State(queries): State<OfferQueryService>,
    Query(params): Query<ListingParams>,
) -> ApiResult<Response> {
    let listing = queries
        .listing(&ListingFilter::All, params.page_request())
        .await?;
    Ok(listing_response(listing))
}

/// Offer counts per geo code.
#[utoipa::path(
    get,
    path = "/api/v1/geo-stats",
    tag = "Offers",
    responses(
        (status = 200, description = "Counts ordered by geo code", body = Vec<GeoStat>),
        (status = 500, description = "Record store failure", body = ApiError),
    ),
)]
pub async fn geo_stats(State(queries): State<OfferQueryService>) -> ApiResult<Json<Vec<GeoStat>>> {
    Ok(Json(queries.geo_stats().await?))
}

/// Create one offer. Requires the API token.
#[utoipa::path(
    post,
    path = "/offers",
    tag = "Offers",
    request_body = Offer,
    responses(
        (status = 201, description = "Offer created", body = CreateOfferResponse),
        (status = 400, description = "Malformed body", body = ApiError),
        (status = 401, description = "Missing or wrong API token", body = ApiError),
        (status = 409, description = "External id already exists", body = ApiError),
    ),
    security(("api_token" = [])),
)]
pub async fn create_offer(State(state): State<AppState>, body: Bytes) -> ApiResult<impl IntoResponse> {
    let offer = parse_offer(&body)?;

    if state.records.find_offer(offer.external_id).await?.is_some() {
        return Err(ApiError::offer_already_exists(offer.external_id));
    }
    state.records.insert_offer(&offer).await?;

    let purge = state.queries.invalidate_geos([offer.geo_code.as_str()]).await;
    tracing::info!(
        external_id = offer.external_id,
        geo = %offer.geo_code,
        cache_keys_purged = purge.keys_removed,
        "Offer created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateOfferResponse {
            message: "Offer created successfully".to_string(),
            offer,
        }),
    ))
}

/// Decode a creation body, distinguishing a missing id from other garbage.
fn parse_offer(body: &[u8]) -> ApiResult<Offer> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::invalid_input(format!("Malformed JSON body: {}", e)))?;

    match value.get("external_id") {
        None | Some(serde_json::Value::Null) if value.is_object() => {
            return Err(ApiError::missing_field("external_id"));
        }
        _ => {}
    }

    serde_json::from_value(value)
        .map_err(|e| ApiError::invalid_input(format!("Invalid offer: {}", e)))
}
