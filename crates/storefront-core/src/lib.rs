//! # storefront-core: Pure Domain Types for Storefront
//!
//! Types shared by every layer of the offline-first data layer, with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Presentation (external, not in this repo)         │   │
//! │  │     Product list ──► Search ──► Favorites tab                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ProductFeed / FavoritesView            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          storefront-sync (engine, favorites, remote)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               storefront-db (Local Store, SQLite)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ★ storefront-core (THIS CRATE) is used by all of the above ★          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, Favorite, ProductPage
//! - [`money`] - Integer-cent price type with decimal wire format
//! - [`feed`] - Snapshot types for the presentation layer
//! - [`error`] - Domain error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod feed;
pub mod money;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult};
pub use feed::{FavoritesView, FeedError, FeedErrorKind, ProductFeed};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size for the first page of a query.
pub const DEFAULT_INITIAL_PAGE_SIZE: u32 = 20;

/// Page size for every following page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Coalescing window for favorites change notifications, in milliseconds.
pub const DEFAULT_FAVORITES_DEBOUNCE_MS: u64 = 100;
