//! # Domain Types
//!
//! Entities shared by the Local Store, the Remote Product Source and the
//! Sync Engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │    Product      │   │      Favorite        │   │  ProductPage    │  │
//! │  │  ─────────────  │   │  ──────────────────  │   │  ─────────────  │  │
//! │  │  id (upstream)  │   │  id (same id-space)  │   │  items          │  │
//! │  │  title          │   │  product_data (JSON) │   │  total          │  │
//! │  │  price (Money)  │   │  created_at          │   └─────────────────┘  │
//! │  │  thumbnail      │   └──────────────────────┘                        │
//! │  │  description    │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Semantics
//! A `Favorite` embeds a full copy of the product taken when it was
//! favorited. Later cache writes or evictions of the `Product` never touch it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// Upstream product identifier. Products and favorites share this id-space.
pub type ProductId = i64;

// =============================================================================
// Product
// =============================================================================

/// A product as cached from the remote catalogue.
///
/// Upserted by `id`: a later write replaces every field of the earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Upstream identifier (unique key).
    #[ts(type = "number")]
    pub id: ProductId,

    /// Display title; the offline filter matches against it.
    pub title: String,

    /// Price, decimal on the wire.
    #[ts(type = "number")]
    pub price: Money,

    /// Thumbnail image URI.
    pub thumbnail: String,

    /// Long description. Absent on the wire means empty.
    #[serde(default)]
    pub description: String,
}

impl Product {
    /// Returns true if the title contains `filter`, ignoring case.
    ///
    /// An empty filter matches every product ("browse all").
    pub fn matches(&self, filter: &str) -> bool {
        filter.is_empty() || fold_title(&self.title).contains(&fold_title(filter))
    }
}

/// Case-folds text for title matching.
///
/// The Local Store persists the folded title next to the original so the
/// filter can run inside SQLite with the same rule as [`Product::matches`].
pub fn fold_title(text: &str) -> String {
    text.to_lowercase()
}

// =============================================================================
// Favorite
// =============================================================================

/// A user-selected product with its own copy of the product data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    /// Product id this favorite was created from.
    pub id: ProductId,

    /// JSON snapshot of the product at favoriting time.
    pub product_data: String,

    /// When the favorite was created. Never changes afterwards.
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    /// Snapshots `product` into a new favorite stamped with `created_at`.
    pub fn snapshot(product: &Product, created_at: DateTime<Utc>) -> CoreResult<Self> {
        Ok(Favorite {
            id: product.id,
            product_data: encode_snapshot(product)?,
            created_at,
        })
    }

    /// Decodes the embedded product snapshot.
    pub fn product(&self) -> CoreResult<Product> {
        serde_json::from_str(&self.product_data).map_err(|e| CoreError::SnapshotDecode {
            id: self.id,
            reason: e.to_string(),
        })
    }
}

/// Serializes a product into the opaque snapshot blob.
pub fn encode_snapshot(product: &Product) -> CoreResult<String> {
    serde_json::to_string(product).map_err(|e| CoreError::SnapshotEncode(e.to_string()))
}

// =============================================================================
// Product Page
// =============================================================================

/// One pagination window returned by the remote source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    /// Products in this window, in server order.
    pub items: Vec<Product>,

    /// Server-side count of all matching products, independent of the window.
    pub total: u64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: ProductId, title: &str) -> Product {
        Product {
            id,
            title: title.to_string(),
            price: Money::from_cents(999),
            thumbnail: format!("https://cdn.example.com/{}.png", id),
            description: String::new(),
        }
    }

    #[test]
    fn test_matches_is_case_insensitive_substring() {
        let shoe = product(1, "Red Shoe");
        assert!(shoe.matches("red"));
        assert!(shoe.matches("SHOE"));
        assert!(shoe.matches("d sh"));
        assert!(!shoe.matches("blue"));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(product(2, "Blue Hat").matches(""));
    }

    #[test]
    fn test_matches_non_ascii_titles() {
        assert!(product(3, "Ёлка ÉCLAIR").matches("éclair"));
        assert!(product(3, "Ёлка ÉCLAIR").matches("ёлка"));
    }

    #[test]
    fn test_description_defaults_to_empty() {
        let json = r#"{"id":7,"title":"Lamp","price":19.5,"thumbnail":"t.png","rating":4.2}"#;
        let parsed: Product = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.description, "");
        assert_eq!(parsed.price.cents(), 1950);
    }

    #[test]
    fn test_missing_required_field_fails() {
        let json = r#"{"id":7,"price":19.5,"thumbnail":"t.png"}"#;
        assert!(serde_json::from_str::<Product>(json).is_err());
    }

    #[test]
    fn test_favorite_snapshot_is_independent_copy() {
        let mut original = product(4, "Desk");
        let favorite = Favorite::snapshot(&original, Utc::now()).unwrap();

        original.title = "Standing Desk".to_string();
        original.price = Money::from_cents(1);

        let restored = favorite.product().unwrap();
        assert_eq!(restored.title, "Desk");
        assert_eq!(restored.price.cents(), 999);
    }

    #[test]
    fn test_corrupt_snapshot_reports_id() {
        let favorite = Favorite {
            id: 42,
            product_data: "{not json".to_string(),
            created_at: Utc::now(),
        };
        match favorite.product() {
            Err(CoreError::SnapshotDecode { id, .. }) => assert_eq!(id, 42),
            other => panic!("expected SnapshotDecode, got {:?}", other),
        }
    }
}
