//! # storefront-db: Local Store for Storefront
//!
//! Durable SQLite storage for the product cache and the user's favorites.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Data Flow                             │
//! │                                                                         │
//! │  Sync Engine / Favorites Manager                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  LocalStore   │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (store.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductCache  │    │ 001_init.sql │  │   │
//! │  │   │ Lifecycle     │◄───│ Favorite      │    │ 002_meta.sql │  │   │
//! │  │   │ Write gate    │    │               │    │              │  │   │
//! │  │   │ Notifier      │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Lifecycle, write serialization and the public store API
//! - [`notifier`] - Debounced favorites change notifications
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Table-level SQL
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{LocalStore, StoreConfig};
//!
//! let store = LocalStore::open(StoreConfig::new("path/to/storefront.db")).await?;
//!
//! store.upsert_products(&page.items).await?;
//! let reds = store.query_products(Some("red")).await?;
//!
//! let _sub = store.subscribe_favorites(|favorites| {
//!     println!("{} favorites", favorites.len());
//! })?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod notifier;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use notifier::{FavoritesListener, FavoritesSubscription};
pub use store::{LocalStore, StoreConfig};

pub use repository::favorite::FavoriteRepository;
pub use repository::product::ProductCacheRepository;
