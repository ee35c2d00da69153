//! # Remote Product Source
//!
//! Paginated product fetches from the catalogue endpoint.
//!
//! ## Request Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  query empty   GET {base}/products?limit=20&skip=0                     │
//! │  query "red"   GET {base}/products/search?q=red&limit=20&skip=0        │
//! │                                                                         │
//! │  200 {"products": [...], "total": 57}   → Ok(ProductPage)             │
//! │  connect error / timeout / non-2xx      → SyncError::Network           │
//! │  200 with any other body                → SyncError::Decode            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No retries here. The sync engine owns retry policy.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::StorefrontConfig;
use crate::error::{SyncError, SyncResult};
use storefront_core::{Product, ProductPage};

/// Paginated fetch-by-query.
#[async_trait]
pub trait RemoteProductSource: Send + Sync {
    /// Fetches `limit` products starting at `offset`.
    ///
    /// `None` or an empty query browses the whole catalogue. `total` in the
    /// result counts every match, not just this window.
    async fn fetch_page(&self, query: Option<&str>, offset: u32, limit: u32)
        -> SyncResult<ProductPage>;
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    products: Vec<Product>,
    total: u64,
}

/// `RemoteProductSource` backed by the HTTP catalogue API.
#[derive(Debug, Clone)]
pub struct HttpProductSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpProductSource {
    pub fn new(base_url: &str, timeout: Duration) -> SyncResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpProductSource { client, base_url })
    }

    pub fn from_config(config: &StorefrontConfig) -> SyncResult<Self> {
        Self::new(&config.api.base_url, config.request_timeout())
    }

    /// Builds the request URL for one page.
    pub fn page_url(&self, query: Option<&str>, offset: u32, limit: u32) -> SyncResult<Url> {
        let query = query.filter(|q| !q.is_empty());
        let mut url = self.base_url.clone();

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SyncError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().push("products");
            if query.is_some() {
                segments.push("search");
            }
        }

        {
            let mut pairs = url.query_pairs_mut();
            if let Some(q) = query {
                pairs.append_pair("q", q);
            }
            pairs
                .append_pair("limit", &limit.to_string())
                .append_pair("skip", &offset.to_string());
        }

        Ok(url)
    }
}

#[async_trait]
impl RemoteProductSource for HttpProductSource {
    async fn fetch_page(
        &self,
        query: Option<&str>,
        offset: u32,
        limit: u32,
    ) -> SyncResult<ProductPage> {
        if limit == 0 {
            return Err(SyncError::InvalidRequest("limit must be greater than 0".into()));
        }

        let url = self.page_url(query, offset, limit)?;
        debug!(%url, offset, limit, "Fetching product page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Network(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let parsed: ProductsResponse =
            serde_json::from_slice(&body).map_err(|e| SyncError::Decode(e.to_string()))?;

        debug!(
            count = parsed.products.len(),
            total = parsed.total,
            "Fetched product page"
        );
        Ok(ProductPage {
            items: parsed.products,
            total: parsed.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base: &str) -> HttpProductSource {
        HttpProductSource::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_browse_url() {
        let url = source("https://dummyjson.com").page_url(None, 0, 20).unwrap();
        assert_eq!(url.as_str(), "https://dummyjson.com/products?limit=20&skip=0");

        let empty = source("https://dummyjson.com").page_url(Some(""), 20, 10).unwrap();
        assert_eq!(empty.as_str(), "https://dummyjson.com/products?limit=10&skip=20");
    }

    #[test]
    fn test_search_url_encodes_query() {
        let url = source("https://dummyjson.com/")
            .page_url(Some("red shoe&co"), 30, 10)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://dummyjson.com/products/search?q=red+shoe%26co&limit=10&skip=30"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let url = source("http://localhost:8080/api/v1").page_url(None, 0, 5).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/products?limit=5&skip=0");
    }

    #[tokio::test]
    async fn test_zero_limit_is_rejected() {
        let result = source("https://dummyjson.com").fetch_page(None, 0, 0).await;
        assert!(matches!(result, Err(SyncError::InvalidRequest(_))));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpProductSource::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
        assert!(HttpProductSource::new("::::", Duration::from_secs(1)).is_err());
    }
}
