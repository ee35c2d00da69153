//! # Schema Versions
//!
//! The Local Store schema evolves additively. Each version is one SQL file
//! under `migrations/sqlite/`, embedded at compile time.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  v1  001_initial_schema.sql                                            │
//! │      products(id, title, price_cents, thumbnail, description)          │
//! │      favorites(id, product_data, created_at)                           │
//! │                                                                         │
//! │  v2  002_product_cache_metadata.sql                                    │
//! │      products.title_folded   lower-cased title for filtering           │
//! │      products.last_seen_at   recency for the optional cache cap        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A store written by an older build opens fine: `initialize()` applies the
//! versions it has not seen yet and leaves existing rows in place. Files are
//! append-only; a shipped version is never edited.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Brings the schema up to the newest embedded version.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let latest = MIGRATOR.migrations.last().map(|m| m.version).unwrap_or(0);
    debug!(latest, "Applying schema versions");

    MIGRATOR.run(pool).await?;

    info!(version = latest, "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` version counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok((MIGRATOR.migrations.len(), usize::try_from(applied).unwrap_or(0)))
}
