//! Pagination normalization and the listing payload.
//!
//! Listing endpoints never reject pagination input. Anything unparsable or out
//! of range falls back to a default instead.

use serde::{Deserialize, Serialize};

use crate::Offer;

/// Page used when the caller omits or garbles the page number.
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when the caller omits or garbles the limit.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 20;

/// A normalized 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u64,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Normalize already-parsed values.
    ///
    /// - `limit < 1` or missing → 5, `limit > 20` → 20
    /// - `page < 1` or missing → 1, no upper bound
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l < 1 => DEFAULT_PAGE_SIZE,
            Some(l) if l > MAX_PAGE_SIZE as i64 => MAX_PAGE_SIZE,
            Some(l) => l as u32,
            None => DEFAULT_PAGE_SIZE,
        };
        let page = match page {
            Some(p) if p >= 1 => p as u64,
            _ => DEFAULT_PAGE,
        };
        Self { page, limit }
    }

    /// Normalize raw query-string values. Unparsable input counts as missing.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|s| s.trim().parse::<i64>().ok());
        Self::new(parse(page), parse(limit))
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows to skip, saturating for absurd page numbers.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit as u64)
    }

    /// Pages needed to hold `total` rows at this page size.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        let limit = self.limit as i64;
        (total + limit - 1) / limit
    }
}

/// Listing payload returned by both listing flavors and stored verbatim in
/// the query cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OfferPage {
    pub total: i64,
    pub limit: u32,
    pub page: u64,
    pub total_pages: i64,
    pub offers: Vec<Offer>,
}

impl OfferPage {
    pub fn new(request: PageRequest, total: i64, offers: Vec<Offer>) -> Self {
        Self {
            total,
            limit: request.limit(),
            page: request.page(),
            total_pages: request.total_pages(total),
            offers,
        }
    }
}
