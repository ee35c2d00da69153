//! # Product Cache Repository
//!
//! Last-write-wins cache of catalogue pages seen online.
//!
//! ## Filtering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Case-Insensitive Substring Match                     │
//! │                                                                         │
//! │  User types: "RED"                                                     │
//! │       │                                                                 │
//! │       ▼  fold_title()                                                   │
//! │  "red"                                                                 │
//! │       │                                                                 │
//! │       ▼  instr(title_folded, 'red') > 0                                │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │ 1 | Red Shirt   | red shirt   │ ← MATCH                            │
//! │  │ 2 | Blue Shirt  | blue shirt  │                                    │
//! │  │ 3 | Bored Cat   | bored cat   │ ← MATCH ("bo-red")                 │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼  ORDER BY id                                                    │
//! │  Results: [1, 3]                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `instr` is used instead of `LIKE` so that `%` and `_` in a filter are
//! matched literally.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::{fold_title, Money, Product, ProductId};

/// Row shape of the `products` table.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    title: String,
    price_cents: i64,
    thumbnail: String,
    description: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            title: row.title,
            price: Money::from_cents(row.price_cents),
            thumbnail: row.thumbnail,
            description: row.description,
        }
    }
}

/// Repository for the product cache.
///
/// ## Usage
/// ```rust,ignore
/// let repo = store.products()?;
/// let cached = repo.query("shirt").await?;
/// let total = repo.count().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductCacheRepository {
    pool: SqlitePool,
}

impl ProductCacheRepository {
    /// Creates a new ProductCacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductCacheRepository { pool }
    }

    /// Inserts or replaces every product in one transaction.
    ///
    /// ## Behavior
    /// - Existing ids are overwritten field by field (last write wins)
    /// - `last_seen_at` is stamped with the current time
    /// - With `max_cached` set, the least recently seen rows beyond the cap
    ///   are evicted inside the same transaction
    ///
    /// Returns the number of rows evicted.
    pub async fn upsert_many(&self, products: &[Product], max_cached: Option<u32>) -> DbResult<u64> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        let seen_at = Utc::now().timestamp_micros();

        for product in products {
            sqlx::query(
                r#"
                INSERT INTO products (id, title, title_folded, price_cents, thumbnail, description, last_seen_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    title_folded = excluded.title_folded,
                    price_cents = excluded.price_cents,
                    thumbnail = excluded.thumbnail,
                    description = excluded.description,
                    last_seen_at = excluded.last_seen_at
                "#,
            )
            .bind(product.id)
            .bind(&product.title)
            .bind(fold_title(&product.title))
            .bind(product.price.cents())
            .bind(&product.thumbnail)
            .bind(&product.description)
            .bind(seen_at)
            .execute(&mut *tx)
            .await?;
        }

        let evicted = match max_cached {
            Some(cap) => evict_beyond(&mut tx, cap).await?,
            None => 0,
        };

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(count = products.len(), evicted, "Upserted product page");
        Ok(evicted)
    }

    /// Returns cached products whose title contains `filter`, ignoring case.
    ///
    /// An empty filter matches every row. Results are ordered by id.
    pub async fn query(&self, filter: &str) -> DbResult<Vec<Product>> {
        let folded = fold_title(filter);

        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, title, price_cents, thumbnail, description
            FROM products
            WHERE ?1 = '' OR instr(title_folded, ?1) > 0
            ORDER BY id
            "#,
        )
        .bind(&folded)
        .fetch_all(&self.pool)
        .await?;

        debug!(filter = %filter, count = rows.len(), "Queried product cache");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a cached product by id.
    pub async fn get_by_id(&self, id: ProductId) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, title, price_cents, thumbnail, description
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Number of cached products.
    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}

/// Deletes everything but the `cap` most recently seen rows.
async fn evict_beyond(tx: &mut Transaction<'_, Sqlite>, cap: u32) -> DbResult<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM products
        WHERE id IN (
            SELECT id FROM products
            ORDER BY last_seen_at DESC, id DESC
            LIMIT -1 OFFSET ?1
        )
        "#,
    )
    .bind(i64::from(cap))
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}
