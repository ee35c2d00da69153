//! # Presentation Contract
//!
//! Snapshot types handed to the (external) presentation layer.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Products screen                    Favorites screen                    │
//! │  ───────────────                    ────────────────                    │
//! │  ProductFeed {                      FavoritesView {                     │
//! │    items, loading, error,             favorites,                        │
//! │    has_more, is_offline               is_loading                        │
//! │  }                                  }                                   │
//! │  actions: fetch_more(), refresh()   actions: toggle(p), is_favorite(id) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Product;

/// Message shown when a remote fetch fails and cached data is served.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch products";

/// Message shown when the Local Store cannot be opened.
pub const STORE_INIT_FAILED_MESSAGE: &str = "Failed to initialize database";

/// Message shown when the offline cache cannot be read.
pub const CACHE_READ_FAILED_MESSAGE: &str = "Failed to load cached products";

/// Message shown when a fetch is requested after the Local Store was closed.
pub const STORE_CLOSED_MESSAGE: &str = "Local storage is closed";

// =============================================================================
// Feed Error
// =============================================================================

/// Category of a failure recorded in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FeedErrorKind {
    /// Transport failure talking to the product endpoint.
    Network,
    /// Product endpoint answered with an unexpected shape.
    Decode,
    /// Local Store unavailable, closed or not initialized.
    Storage,
}

/// User-facing failure attached to the feed alongside last-known-good data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FeedError {
    pub kind: FeedErrorKind,
    pub message: String,
}

impl FeedError {
    pub fn new(kind: FeedErrorKind, message: impl Into<String>) -> Self {
        FeedError {
            kind,
            message: message.into(),
        }
    }
}

// =============================================================================
// Product Feed
// =============================================================================

/// State of the active product query, as the products screen sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFeed {
    /// Query text the state belongs to. Empty means browse all.
    pub query: String,

    /// Accumulated products in arrival order.
    pub items: Vec<Product>,

    /// Offset of the next page to request.
    pub offset: u32,

    /// Whether `fetch_more` can load another page.
    pub has_more: bool,

    /// A fetch is in flight.
    pub loading: bool,

    /// Last failure, cleared when the next fetch starts.
    pub error: Option<FeedError>,

    /// The last fetch was served from the Local Store because the device was offline.
    pub is_offline: bool,
}

impl Default for ProductFeed {
    fn default() -> Self {
        ProductFeed {
            query: String::new(),
            items: Vec::new(),
            offset: 0,
            has_more: true,
            loading: false,
            error: None,
            is_offline: false,
        }
    }
}

// =============================================================================
// Favorites View
// =============================================================================

/// Favorites list as the favorites screen sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FavoritesView {
    /// Most recently favorited first.
    pub favorites: Vec<Product>,

    /// True until the first load from the Local Store completes.
    pub is_loading: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_feed_allows_first_page() {
        let feed = ProductFeed::default();
        assert!(feed.has_more);
        assert!(!feed.loading);
        assert!(feed.items.is_empty());
    }

    #[test]
    fn test_feed_error_kind_serializes_snake_case() {
        let err = FeedError::new(FeedErrorKind::Network, FETCH_FAILED_MESSAGE);
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"kind":"network","message":"Failed to fetch products"}"#);
    }
}
