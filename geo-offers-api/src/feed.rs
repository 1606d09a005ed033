//! HTTP client for the upstream offer feed.

use std::time::Duration;

use async_trait::async_trait;
use geo_offers_core::{FeedError, FeedPage, FeedResult};
use geo_offers_storage::OfferFeed;

use crate::error::{ApiError, ApiResult};

/// Fetches `{base_url}?page={n}` and decodes the JSON body.
#[derive(Debug, Clone)]
pub struct HttpOfferFeed {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpOfferFeed {
    /// Build a client for `base_url`.
    ///
    /// `accept_invalid_certs` exists for providers with broken certificate
    /// chains and should stay off otherwise.
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        accept_invalid_certs: bool,
    ) -> ApiResult<Self> {
        let base_url = reqwest::Url::parse(base_url).map_err(|e| {
            ApiError::invalid_input(format!("Invalid feed URL {}: {}", base_url, e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .user_agent(concat!("geo-offers/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::internal_error(format!("Failed to build HTTP client: {}", e)))?;

        if accept_invalid_certs {
            tracing::warn!(url = %base_url, "Feed TLS certificate verification is disabled");
        }

        Ok(Self { client, base_url })
    }

    fn page_url(&self, page: u32) -> reqwest::Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("page", &page.to_string());
        url
    }
}

#[async_trait]
impl OfferFeed for HttpOfferFeed {
    async fn fetch_page(&self, page: u32) -> FeedResult<FeedPage> {
        let url = self.page_url(page);
        tracing::debug!(%url, page, "Fetching feed page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Request {
                page,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                page,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FeedError::Request {
            page,
            reason: e.to_string(),
        })?;

        serde_json::from_slice(&body).map_err(|e| FeedError::Decode {
            page,
            reason: e.to_string(),
        })
    }
}

/// Stand-in used when no feed URL is configured. Every run aborts on the
/// first page.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredFeed;

#[async_trait]
impl OfferFeed for UnconfiguredFeed {
    async fn fetch_page(&self, _page: u32) -> FeedResult<FeedPage> {
        Err(FeedError::NotConfigured {
            reason: "GEO_OFFERS_FEED_URL is not set".to_string(),
        })
    }
}
