//! Offer and request audit entities.

use serde::{Deserialize, Serialize};

use crate::{ExternalId, Timestamp};

/// A geo-tagged marketing listing with a computed rating.
///
/// The store keys offers by `external_id` alone. An upstream offer that is
/// published in several geos therefore occupies a single row, holding the
/// geo fields of whichever variant was written last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Offer {
    /// Upstream identifier (primary key)
    pub external_id: ExternalId,
    #[serde(default)]
    pub name: String,
    /// Currency code, e.g. "RUB"
    #[serde(default)]
    pub currency: String,
    /// Approval time in days
    #[serde(default)]
    pub approval_time: i64,
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub geo_code: String,
    #[serde(default)]
    pub geo_name: String,
    #[serde(default)]
    pub rating: f64,
}

impl Offer {
    /// Create an offer with only identity, geo and rating populated.
    pub fn new(external_id: ExternalId, geo_code: impl Into<String>, rating: f64) -> Self {
        Self {
            external_id,
            name: String::new(),
            currency: String::new(),
            approval_time: 0,
            site_url: String::new(),
            logo: String::new(),
            geo_code: geo_code.into(),
            geo_name: String::new(),
            rating,
        }
    }
}

/// Number of offers stored for one geo code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GeoStat {
    pub geo_code: String,
    pub count: i64,
}

/// Audit row describing one completed inbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RequestLog {
    pub id: i64,
    pub method: String,
    pub endpoint: String,
    pub ip: String,
    pub user_agent: String,
    pub status_code: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub updated_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = DateTime))]
    pub deleted_at: Option<Timestamp>,
}

/// Insert payload for a request audit row. Identity and timestamps are
/// assigned by the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequestLog {
    pub method: String,
    pub endpoint: String,
    pub ip: String,
    pub user_agent: String,
    pub status_code: i32,
}
