//! # Sync Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Remote         │  │   Storage       │  │     Configuration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Network        │  │  Store(DbError) │  │  InvalidConfig          │ │
//! │  │  Decode         │  │                 │  │  InvalidUrl             │ │
//! │  │  InvalidRequest │  │                 │  │  ConfigLoad/SaveFailed  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  The engine never hands these to the presentation layer directly.      │
//! │  It converts them with `feed_error()` and falls back to the cache.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use storefront_core::feed::{CACHE_READ_FAILED_MESSAGE, FETCH_FAILED_MESSAGE};
use storefront_core::{FeedError, FeedErrorKind};
use storefront_db::DbError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering every failure of this crate.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// Transport failure or non-success HTTP status.
    #[error("Network error: {0}")]
    Network(String),

    /// Response body was not the expected `{products, total}` shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Caller asked for something the remote contract forbids.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Local Store failure.
    #[error(transparent)]
    Store(#[from] DbError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// User-facing form of this error for the product feed.
    pub fn feed_error(&self) -> FeedError {
        match self {
            SyncError::Network(_) | SyncError::InvalidRequest(_) => {
                FeedError::new(FeedErrorKind::Network, FETCH_FAILED_MESSAGE)
            }
            SyncError::Decode(_) => FeedError::new(FeedErrorKind::Decode, FETCH_FAILED_MESSAGE),
            SyncError::Store(_) => FeedError::new(FeedErrorKind::Storage, CACHE_READ_FAILED_MESSAGE),
            other => FeedError::new(FeedErrorKind::Storage, other.to_string()),
        }
    }
}
