//! # Repository Module
//!
//! Table-level access for the Local Store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where SQL Lives                                      │
//! │                                                                         │
//! │  LocalStore (lifecycle, write gate, notifications)                     │
//! │       │                                                                 │
//! │       │  store.products()?.query("red")                                │
//! │       ▼                                                                 │
//! │  ProductCacheRepository          FavoriteRepository                    │
//! │  ├── upsert_many                 ├── upsert                            │
//! │  ├── query                       ├── delete                            │
//! │  ├── get_by_id                   ├── list / list_products              │
//! │  └── count                       └── get / exists / count              │
//! │       │                                │                                │
//! │       └──────────────┬─────────────────┘                                │
//! │                      ▼                                                  │
//! │               SQLite (WAL)                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories do not take the write gate themselves. Callers that write
//! go through [`crate::LocalStore`], which serializes them.

pub mod favorite;
pub mod product;

pub use favorite::FavoriteRepository;
pub use product::ProductCacheRepository;
