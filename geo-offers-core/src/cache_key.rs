//! Cache key namespaces.
//!
//! Three disjoint namespaces share one key-value store:
//!
//! ```text
//! offers:{geo}:page:{page}:limit:{limit}    geo-filtered listing
//! offers_sorted:page:{page}:limit:{limit}   global listing
//! ratelimit:{client}                        fixed-window request counter
//! ```
//!
//! Invalidation works on key prefixes, so every page/limit combination of a
//! listing shares the prefix returned by [`ListingFilter::invalidation_prefix`].

use crate::PageRequest;

const GEO_LISTING_NAMESPACE: &str = "offers";
const GLOBAL_LISTING_NAMESPACE: &str = "offers_sorted";
const RATE_LIMIT_NAMESPACE: &str = "ratelimit";

/// Which listing a query targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListingFilter {
    /// Offers for one geo code.
    Geo(String),
    /// All offers, globally sorted.
    All,
}

impl ListingFilter {
    pub fn geo(code: impl Into<String>) -> Self {
        ListingFilter::Geo(code.into())
    }

    /// Geo code to filter on, if any.
    pub fn geo_code(&self) -> Option<&str> {
        match self {
            ListingFilter::Geo(code) => Some(code),
            ListingFilter::All => None,
        }
    }

    /// Deterministic cache key for one page of this listing.
    pub fn cache_key(&self, request: &PageRequest) -> String {
        format!(
            "{}page:{}:limit:{}",
            self.invalidation_prefix(),
            request.page(),
            request.limit()
        )
    }

    /// Prefix shared by every cached page of this listing.
    pub fn invalidation_prefix(&self) -> String {
        match self {
            ListingFilter::Geo(code) => format!("{}:{}:", GEO_LISTING_NAMESPACE, code),
            ListingFilter::All => format!("{}:", GLOBAL_LISTING_NAMESPACE),
        }
    }

    /// Low-cardinality label for metrics.
    pub fn namespace_label(&self) -> &'static str {
        match self {
            ListingFilter::Geo(_) => "geo",
            ListingFilter::All => "all",
        }
    }
}

/// Counter key for the fixed-window rate limiter.
pub fn rate_limit_key(client: &str) -> String {
    format!("{}:{}", RATE_LIMIT_NAMESPACE, client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_key_format() {
        let key = ListingFilter::geo("RU").cache_key(&PageRequest::new(Some(2), Some(10)));
        assert_eq!(key, "offers:RU:page:2:limit:10");
    }

    #[test]
    fn test_global_key_format() {
        let key = ListingFilter::All.cache_key(&PageRequest::default());
        assert_eq!(key, "offers_sorted:page:1:limit:5");
    }

    #[test]
    fn test_prefix_covers_every_page() {
        let filter = ListingFilter::geo("KZ");
        let prefix = filter.invalidation_prefix();
        for (page, limit) in [(1, 5), (3, 20), (99, 1)] {
            let key = filter.cache_key(&PageRequest::new(Some(page), Some(limit)));
            assert!(key.starts_with(&prefix));
        }
    }

    #[test]
    fn test_namespaces_do_not_overlap() {
        let geo_prefix = ListingFilter::geo("sorted").invalidation_prefix();
        let global = ListingFilter::All.cache_key(&PageRequest::default());
        assert!(!global.starts_with(&geo_prefix));

        let ru_prefix = ListingFilter::geo("RU").invalidation_prefix();
        let rus_key = ListingFilter::geo("RUS").cache_key(&PageRequest::default());
        assert!(!rus_key.starts_with(&ru_prefix));
    }

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(rate_limit_key("10.0.0.1"), "ratelimit:10.0.0.1");
    }
}
