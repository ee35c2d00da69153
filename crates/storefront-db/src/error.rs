//! # Local Store Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Lifecycle state + categorization              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Sync Engine ← Converts to cache fallback, never re-throws to the UI   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use storefront_core::CoreError;
use thiserror::Error;

/// Local Store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Operation attempted before `initialize()` succeeded.
    #[error("Local store is not initialized")]
    NotInitialized,

    /// The backing database could not be opened.
    ///
    /// ## When This Occurs
    /// - Corrupt database file
    /// - Permission denied on the data directory
    /// - A migration could not be applied
    #[error("Local store unavailable: {0}")]
    StoreUnavailable(String),

    /// Operation attempted after `close()`.
    #[error("Local store is closed")]
    StoreClosed,

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A favorite snapshot could not be encoded or decoded.
    #[error(transparent)]
    Snapshot(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Returns true if the store itself is unusable (as opposed to one query failing).
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DbError::NotInitialized | DbError::StoreUnavailable(_) | DbError::StoreClosed
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::PoolClosed     → DbError::StoreClosed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::Database       → DbError::QueryFailed
/// Other                       → DbError::Internal
/// ```
///
/// `begin`/`commit` failures go through [`DbError::transaction`] instead.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => DbError::StoreClosed,
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl DbError {
    /// Classifies a failure to begin or commit a transaction.
    ///
    /// Lifecycle errors (closed pool, exhausted pool) keep their own variant.
    pub(crate) fn transaction(err: sqlx::Error) -> Self {
        match DbError::from(err) {
            DbError::QueryFailed(msg) | DbError::Internal(msg) => DbError::TransactionFailed(msg),
            other => other,
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for Local Store operations.
pub type DbResult<T> = Result<T, DbError>;
