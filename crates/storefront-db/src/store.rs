//! # Local Store
//!
//! Owns the SQLite pool and its lifecycle.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌───────────────┐  initialize()  ┌────────┐   close()   ┌────────┐   │
//! │   │ Uninitialized │ ─────────────► │  Open  │ ──────────► │ Closed │   │
//! │   └───────────────┘                └────────┘             └────────┘   │
//! │          │                            │  ▲                     │        │
//! │          │ any op                     └──┘ initialize()        │ any op │
//! │          ▼                             (no-op)                 ▼        │
//! │    NotInitialized                                        StoreClosed    │
//! │                                                                         │
//! │   initialize() failure (bad file, permissions, migration) leaves the   │
//! │   store Uninitialized and returns StoreUnavailable.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Reads go straight to the pool (WAL lets them run beside a writer).
//! Writes take the store's write gate first, so at most one write
//! transaction is open per store at any moment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::notifier::{FavoritesNotifier, FavoritesSubscription};
use crate::repository::{FavoriteRepository, ProductCacheRepository};
use storefront_core::{Favorite, Product, ProductId, DEFAULT_FAVORITES_DEBOUNCE_MS};

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Local Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/data/storefront.db")
///     .favorites_debounce(Duration::from_millis(100))
///     .max_cached_products(Some(5_000));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of pooled connections.
    /// Default: 4
    pub max_connections: u32,

    /// How long to wait for a pooled connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Coalescing window for favorites notifications.
    /// Default: 100ms
    pub favorites_debounce: Duration,

    /// Upper bound on cached products; `None` keeps everything.
    pub max_cached_products: Option<u32>,
}

impl StoreConfig {
    /// Creates a configuration for a file-backed store.
    ///
    /// The file and its parent directory are created on `initialize()`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 4,
            connect_timeout: Duration::from_secs(30),
            favorites_debounce: Duration::from_millis(DEFAULT_FAVORITES_DEBOUNCE_MS),
            max_cached_products: None,
        }
    }

    /// Creates an in-memory store configuration (for testing).
    ///
    /// Contents vanish when the store is closed or dropped.
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            connect_timeout: Duration::from_secs(5),
            favorites_debounce: Duration::from_millis(DEFAULT_FAVORITES_DEBOUNCE_MS),
            max_cached_products: None,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the favorites notification window.
    pub fn favorites_debounce(mut self, window: Duration) -> Self {
        self.favorites_debounce = window;
        self
    }

    /// Caps the product cache size.
    pub fn max_cached_products(mut self, cap: Option<u32>) -> Self {
        self.max_cached_products = cap;
        self
    }

    /// True if this configuration targets an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Local Store
// =============================================================================

enum StoreState {
    Uninitialized,
    Open(SqlitePool),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Open,
    Closed,
}

struct StoreInner {
    config: StoreConfig,
    state: RwLock<StoreState>,
    /// Serializes initialize() and close().
    lifecycle: Mutex<()>,
    /// Held for the duration of every write transaction.
    write_gate: Mutex<()>,
    notifier: Arc<FavoritesNotifier>,
}

/// Durable store for the product cache and favorites.
///
/// Cheap to clone; clones share the same pool, write gate and listeners.
///
/// ## Usage
/// ```rust,ignore
/// let store = LocalStore::new(StoreConfig::new("./storefront.db"));
/// store.initialize().await?;
///
/// store.upsert_products(&page.items).await?;
/// let cached = store.query_products(Some("shirt")).await?;
/// ```
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<StoreInner>,
}

impl LocalStore {
    /// Creates an uninitialized store. No I/O happens until `initialize()`.
    pub fn new(config: StoreConfig) -> Self {
        let notifier = FavoritesNotifier::new(config.favorites_debounce);
        LocalStore {
            inner: Arc::new(StoreInner {
                config,
                state: RwLock::new(StoreState::Uninitialized),
                lifecycle: Mutex::new(()),
                write_gate: Mutex::new(()),
                notifier,
            }),
        }
    }

    /// Creates and initializes a store in one step.
    pub async fn open(config: StoreConfig) -> DbResult<Self> {
        let store = LocalStore::new(config);
        store.initialize().await?;
        Ok(store)
    }

    /// Opens the database and applies pending migrations.
    ///
    /// ## What This Does
    /// 1. Creates the database file (and parent directory) if missing
    /// 2. Configures SQLite: WAL journal, NORMAL synchronous
    /// 3. Runs embedded migrations
    ///
    /// Calling it again on an open store is a no-op. On a closed store it
    /// fails with `StoreClosed`.
    pub async fn initialize(&self) -> DbResult<()> {
        let _lifecycle = self.inner.lifecycle.lock().await;

        match self.phase() {
            Phase::Open => return Ok(()),
            Phase::Closed => return Err(DbError::StoreClosed),
            Phase::Uninitialized => {}
        }

        let config = &self.inner.config;
        info!(
            path = %config.database_path.display(),
            "Initializing local store"
        );

        let pool = connect(config).await.map_err(|e| {
            error!(error = %e, "Failed to open local store");
            e
        })?;

        if let Err(e) = migrations::run_migrations(&pool).await {
            error!(error = %e, "Failed to migrate local store");
            pool.close().await;
            return Err(DbError::StoreUnavailable(e.to_string()));
        }

        *self.write_state() = StoreState::Open(pool);

        info!("Local store ready");
        Ok(())
    }

    /// True once `initialize()` has succeeded and before `close()`.
    pub fn is_initialized(&self) -> bool {
        self.phase() == Phase::Open
    }

    /// True after `close()`.
    pub fn is_closed(&self) -> bool {
        self.phase() == Phase::Closed
    }

    /// The configuration this store was created with.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Returns the product cache repository.
    pub fn products(&self) -> DbResult<ProductCacheRepository> {
        Ok(ProductCacheRepository::new(self.pool()?))
    }

    /// Returns the favorites repository.
    pub fn favorites(&self) -> DbResult<FavoriteRepository> {
        Ok(FavoriteRepository::new(self.pool()?))
    }

    // =========================================================================
    // Product Cache
    // =========================================================================

    /// Writes a page of products into the cache atomically.
    ///
    /// Existing rows with the same id are overwritten. If the configured
    /// cache cap is exceeded, least recently seen rows are evicted in the
    /// same transaction.
    pub async fn upsert_products(&self, products: &[Product]) -> DbResult<()> {
        let repo = self.products()?;
        if products.is_empty() {
            return Ok(());
        }

        let _write = self.inner.write_gate.lock().await;
        let evicted = repo
            .upsert_many(products, self.inner.config.max_cached_products)
            .await?;

        if evicted > 0 {
            debug!(evicted, "Evicted least recently seen products");
        }
        Ok(())
    }

    /// Cached products whose title contains `filter`, ignoring case.
    ///
    /// `None` or an empty filter returns every cached product. Results are
    /// ordered by id.
    pub async fn query_products(&self, filter: Option<&str>) -> DbResult<Vec<Product>> {
        self.products()?.query(filter.unwrap_or_default()).await
    }

    /// A single cached product.
    pub async fn get_product(&self, id: ProductId) -> DbResult<Option<Product>> {
        self.products()?.get_by_id(id).await
    }

    pub async fn count_products(&self) -> DbResult<u64> {
        self.products()?.count().await
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Adds `product` to favorites, or refreshes its snapshot if present.
    pub async fn upsert_favorite(&self, product: &Product) -> DbResult<()> {
        let repo = self.favorites()?;

        {
            let _write = self.inner.write_gate.lock().await;
            repo.upsert(product, Utc::now()).await?;
        }

        self.favorites_changed();
        Ok(())
    }

    /// Removes a favorite. Removing an absent id succeeds silently.
    pub async fn delete_favorite(&self, id: ProductId) -> DbResult<()> {
        let repo = self.favorites()?;

        let removed = {
            let _write = self.inner.write_gate.lock().await;
            repo.delete(id).await?
        };

        if removed {
            self.favorites_changed();
        }
        Ok(())
    }

    /// Every favorited product, newest first.
    pub async fn list_favorites(&self) -> DbResult<Vec<Product>> {
        self.favorites()?.list_products().await
    }

    /// True if `id` is currently a favorite.
    pub async fn is_favorite(&self, id: ProductId) -> DbResult<bool> {
        self.favorites()?.exists(id).await
    }

    /// The stored favorite record, snapshot and timestamp included.
    pub async fn get_favorite(&self, id: ProductId) -> DbResult<Option<Favorite>> {
        self.favorites()?.get(id).await
    }

    /// Registers a listener for favorites changes.
    ///
    /// Mutations within the debounce window of each other produce a single
    /// call carrying the full list as of the last one. The listener stays
    /// registered until the returned handle is dropped or unsubscribed.
    pub fn subscribe_favorites<F>(&self, listener: F) -> DbResult<FavoritesSubscription>
    where
        F: Fn(Vec<Product>) + Send + Sync + 'static,
    {
        self.pool()?;
        Ok(self.inner.notifier.subscribe(Arc::new(listener)))
    }

    /// Number of registered favorites listeners.
    pub fn favorites_listener_count(&self) -> usize {
        self.inner.notifier.listener_count()
    }

    // =========================================================================
    // Shutdown & Diagnostics
    // =========================================================================

    /// Closes the store. Terminal: every later operation fails with
    /// `StoreClosed`.
    ///
    /// Pending notifications are cancelled. Writes already holding a
    /// connection finish before the pool shuts down.
    pub async fn close(&self) {
        let _lifecycle = self.inner.lifecycle.lock().await;

        let previous = std::mem::replace(&mut *self.write_state(), StoreState::Closed);
        self.inner.notifier.shutdown();

        if let StoreState::Open(pool) = previous {
            info!("Closing local store");
            pool.close().await;
        }
    }

    /// Checks if the database answers queries.
    pub async fn health_check(&self) -> bool {
        let Ok(pool) = self.pool() else {
            return false;
        };
        sqlx::query("SELECT 1").execute(&pool).await.is_ok()
    }

    /// Returns `(total_migrations, applied_migrations)`.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool()?).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn phase(&self) -> Phase {
        match &*self.read_state() {
            StoreState::Uninitialized => Phase::Uninitialized,
            StoreState::Open(_) => Phase::Open,
            StoreState::Closed => Phase::Closed,
        }
    }

    fn pool(&self) -> DbResult<SqlitePool> {
        match &*self.read_state() {
            StoreState::Open(pool) => Ok(pool.clone()),
            StoreState::Uninitialized => Err(DbError::NotInitialized),
            StoreState::Closed => Err(DbError::StoreClosed),
        }
    }

    fn favorites_changed(&self) {
        let store = Arc::downgrade(&self.inner);
        self.inner.notifier.schedule(async move {
            let inner = store.upgrade().ok_or(DbError::StoreClosed)?;
            LocalStore { inner }.list_favorites().await
        });
    }
}

impl fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore")
            .field("path", &self.inner.config.database_path)
            .field("phase", &self.phase())
            .finish()
    }
}

async fn connect(config: &StoreConfig) -> DbResult<SqlitePool> {
    let unavailable = |e: sqlx::Error| DbError::StoreUnavailable(e.to_string());

    let options = if config.is_in_memory() {
        SqliteConnectOptions::from_str("sqlite::memory:").map_err(unavailable)?
    } else {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbError::StoreUnavailable(e.to_string()))?;
            }
        }
        SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
    };

    let options = options
        // WAL mode: readers don't block the writer
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL synchronous: may lose the last transaction on power loss, never corrupts
        .synchronous(SqliteSynchronous::Normal);

    let pool_options = SqlitePoolOptions::new()
        .min_connections(1)
        .acquire_timeout(config.connect_timeout);

    // The only connection *is* the in-memory database; never recycle it.
    let pool_options = if config.is_in_memory() {
        pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options
            .max_connections(config.max_connections.max(1))
            .idle_timeout(Some(Duration::from_secs(600)))
    };

    let pool = pool_options.connect_with(options).await.map_err(unavailable)?;

    debug!(
        max_connections = config.max_connections,
        in_memory = config.is_in_memory(),
        "Store pool created"
    );
    Ok(pool)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = LocalStore::open(StoreConfig::in_memory()).await.unwrap();

        assert!(store.is_initialized());
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = StoreConfig::new("/tmp/storefront.db")
            .max_connections(8)
            .favorites_debounce(Duration::from_millis(250))
            .max_cached_products(Some(500));

        assert_eq!(config.max_connections, 8);
        assert_eq!(config.favorites_debounce, Duration::from_millis(250));
        assert_eq!(config.max_cached_products, Some(500));
        assert!(!config.is_in_memory());
        assert!(StoreConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let store = LocalStore::new(StoreConfig::in_memory());

        assert!(matches!(
            store.query_products(None).await,
            Err(DbError::NotInitialized)
        ));
        assert!(matches!(
            store.list_favorites().await,
            Err(DbError::NotInitialized)
        ));
        assert!(matches!(
            store.subscribe_favorites(|_| {}),
            Err(DbError::NotInitialized)
        ));
        assert!(!store.health_check().await);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = LocalStore::new(StoreConfig::in_memory());
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();

        let (total, applied) = store.migration_status().await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        let store = LocalStore::open(StoreConfig::in_memory()).await.unwrap();
        store.close().await;

        assert!(store.is_closed());
        assert!(matches!(
            store.query_products(None).await,
            Err(DbError::StoreClosed)
        ));
        assert!(matches!(store.initialize().await, Err(DbError::StoreClosed)));

        // Closing twice is harmless
        store.close().await;
    }
}
