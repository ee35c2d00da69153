//! # storefront-sync: Offline-First Sync Layer for Storefront
//!
//! Serves the product list from the network when reachable and from the
//! Local Store when not, and keeps the favorites list observable.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Wiring                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 Storefront (explicit ownership)                  │  │
//! │  └───────┬─────────────────────┬─────────────────────┬──────────────┘  │
//! │          ▼                     ▼                     ▼                  │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌────────────────────┐    │
//! │  │  SyncEngine    │  │ FavoritesManager   │  │ ConnectivityOracle │    │
//! │  │                │  │                    │  │                    │    │
//! │  │ ProductFeed    │  │ Vec + HashSet      │  │ watch<bool>        │    │
//! │  │ pagination     │  │ toggle/is_favorite │  │ HEAD probe         │    │
//! │  └──┬──────────┬──┘  └─────────┬──────────┘  └────────────────────┘    │
//! │     │          │               │                                        │
//! │     ▼          └───────┬───────┘                                        │
//! │  ┌────────────────┐    ▼                                                │
//! │  │ RemoteProduct  │  ┌────────────────────┐                             │
//! │  │ Source (HTTP)  │  │ LocalStore (SQLite)│                             │
//! │  └────────────────┘  └────────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - TOML + environment configuration
//! - [`connectivity`] - Reachability oracle trait and implementations
//! - [`engine`] - The product feed state machine
//! - [`error`] - Sync error types
//! - [`favorites`] - Favorites manager
//! - [`remote`] - Remote product source trait and HTTP client
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_sync::{Storefront, StorefrontConfig};
//!
//! storefront_sync::init_tracing();
//!
//! let storefront = Storefront::new(StorefrontConfig::load_or_default(None))?;
//! storefront.start().await?;
//!
//! let mut feed = storefront.engine().subscribe();
//! storefront.engine().set_query("phone").await;
//! storefront.engine().fetch_next_page().await;
//!
//! storefront.favorites().toggle(&product).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod favorites;
pub mod remote;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::StorefrontConfig;
pub use connectivity::{ConnectivityOracle, HttpProbeConnectivity, ManualConnectivity};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use favorites::{FavoritesManager, ToggleOutcome};
pub use remote::{HttpProductSource, RemoteProductSource};

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront_core::ProductFeed;
use storefront_db::LocalStore;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=storefront_sync=trace` - Trace the sync layer only
/// - Default: INFO, DEBUG for storefront crates
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,storefront=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

// =============================================================================
// Storefront
// =============================================================================

/// Owns every component and the background tasks that connect them.
pub struct Storefront {
    config: StorefrontConfig,
    store: LocalStore,
    oracle: Arc<dyn ConnectivityOracle>,
    probe: Option<Arc<HttpProbeConnectivity>>,
    engine: Arc<SyncEngine>,
    favorites: FavoritesManager,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Storefront {
    /// Builds the production wiring: SQLite store, HTTP source, HTTP probe.
    pub fn new(config: StorefrontConfig) -> SyncResult<Self> {
        config.validate()?;

        let store = LocalStore::new(config.store_config());
        let probe = Arc::new(HttpProbeConnectivity::new(
            config.probe_url(),
            config.probe_timeout(),
        )?);
        let remote = Arc::new(HttpProductSource::from_config(&config)?);

        let mut storefront = Self::with_parts(config, store, probe.clone(), remote);
        storefront.probe = Some(probe);
        Ok(storefront)
    }

    /// Builds a storefront around caller-supplied collaborators.
    pub fn with_parts(
        config: StorefrontConfig,
        store: LocalStore,
        oracle: Arc<dyn ConnectivityOracle>,
        remote: Arc<dyn RemoteProductSource>,
    ) -> Self {
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            oracle.clone(),
            remote,
            config.paging.clone(),
        ));
        let favorites = FavoritesManager::new(store.clone());

        Storefront {
            config,
            store,
            oracle,
            probe: None,
            engine,
            favorites,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Opens the store, loads favorites, runs the first fetch and starts
    /// watching connectivity.
    pub async fn start(&self) -> SyncResult<ProductFeed> {
        info!("Starting storefront");

        let feed = self.engine.initialize().await?;
        self.favorites.initialize().await?;

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.push(self.engine.watch_connectivity());
        if let Some(ref probe) = self.probe {
            tasks.push(probe.spawn_monitor(self.config.poll_interval()));
        }

        Ok(feed)
    }

    /// Stops background tasks and closes the store.
    pub async fn shutdown(&self) {
        info!("Shutting down storefront");

        let tasks: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }

        self.favorites.shutdown();
        self.store.close().await;
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn connectivity(&self) -> &Arc<dyn ConnectivityOracle> {
        &self.oracle
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn favorites(&self) -> &FavoritesManager {
        &self.favorites
    }
}
