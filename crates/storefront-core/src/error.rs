//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core errors (this file)                                    │
//! │  └── CoreError        - Snapshot encoding/decoding                     │
//! │                                                                         │
//! │  storefront-db errors (separate crate)                                 │
//! │  └── DbError          - Local Store failures                           │
//! │                                                                         │
//! │  storefront-sync errors (separate crate)                               │
//! │  └── SyncError        - Network, decode, config failures               │
//! │                                                                         │
//! │  Flow: CoreError → DbError → SyncError → FeedError (what the UI sees)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::ProductId;

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A product could not be serialized into a favorite snapshot.
    #[error("Failed to encode product snapshot: {0}")]
    SnapshotEncode(String),

    /// A stored favorite snapshot is not a valid product.
    ///
    /// ## When This Occurs
    /// - The favorites table was edited outside this crate
    /// - A future schema wrote a snapshot shape this build cannot read
    #[error("Favorite {id} has an unreadable snapshot: {reason}")]
    SnapshotDecode { id: ProductId, reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SnapshotDecode {
            id: 9,
            reason: "EOF".to_string(),
        };
        assert_eq!(err.to_string(), "Favorite 9 has an unreadable snapshot: EOF");
    }
}
