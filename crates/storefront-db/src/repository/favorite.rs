//! # Favorite Repository
//!
//! Each favorite keeps its own JSON snapshot of the product, so it survives
//! eviction or change of the cached product row.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::{encode_snapshot, Favorite, Product, ProductId};

#[derive(Debug, sqlx::FromRow)]
struct FavoriteRow {
    id: i64,
    product_data: String,
    created_at: i64,
}

impl TryFrom<FavoriteRow> for Favorite {
    type Error = DbError;

    fn try_from(row: FavoriteRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::<Utc>::from_timestamp_micros(row.created_at).ok_or_else(|| {
            DbError::Internal(format!("favorite {} has invalid created_at", row.id))
        })?;

        Ok(Favorite {
            id: row.id,
            product_data: row.product_data,
            created_at,
        })
    }
}

/// Repository for the favorites table.
#[derive(Debug, Clone)]
pub struct FavoriteRepository {
    pool: SqlitePool,
}

impl FavoriteRepository {
    /// Creates a new FavoriteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FavoriteRepository { pool }
    }

    /// Inserts a favorite, or refreshes the snapshot of an existing one.
    ///
    /// `created_at` is only written on insert, so re-favoriting keeps the
    /// original position in the newest-first list.
    pub async fn upsert(&self, product: &Product, created_at: DateTime<Utc>) -> DbResult<()> {
        let snapshot = encode_snapshot(product)?;

        sqlx::query(
            r#"
            INSERT INTO favorites (id, product_data, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET product_data = excluded.product_data
            "#,
        )
        .bind(product.id)
        .bind(&snapshot)
        .bind(created_at.timestamp_micros())
        .execute(&self.pool)
        .await?;

        debug!(id = product.id, "Upserted favorite");
        Ok(())
    }

    /// Deletes a favorite. Returns false if no row existed.
    pub async fn delete(&self, id: ProductId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All favorites, newest first.
    pub async fn list(&self) -> DbResult<Vec<Favorite>> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            r#"
            SELECT id, product_data, created_at
            FROM favorites
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Favorite::try_from).collect()
    }

    /// All favorite snapshots decoded into products, newest first.
    ///
    /// A snapshot that no longer decodes fails the whole call rather than
    /// being dropped from the list.
    pub async fn list_products(&self) -> DbResult<Vec<Product>> {
        let favorites = self.list().await?;

        favorites
            .iter()
            .map(|favorite| favorite.product().map_err(DbError::from))
            .collect()
    }

    /// Gets a favorite by product id.
    pub async fn get(&self, id: ProductId) -> DbResult<Option<Favorite>> {
        let row = sqlx::query_as::<_, FavoriteRow>(
            "SELECT id, product_data, created_at FROM favorites WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Favorite::try_from).transpose()
    }

    /// Returns true if a favorite exists for `id`.
    pub async fn exists(&self, id: ProductId) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM favorites WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Number of favorites.
    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}
