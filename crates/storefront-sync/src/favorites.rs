//! # Favorites Manager
//!
//! In-memory view of the favorites table with an id index for O(1)
//! membership checks.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  toggle(p) ──► is_favorite(p.id)? ── yes ──► store.delete_favorite    │
//! │                        │                     index.remove(p.id)        │
//! │                        no                                               │
//! │                        └────────────────► store.upsert_favorite(p)    │
//! │                                             index.insert(p.id)         │
//! │                                                                         │
//! │  LocalStore (debounced, ~100ms) ──► replace list + rebuild index       │
//! │                                     └──► watch::Sender<Vec<Product>>   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::SyncResult;
use storefront_core::{FavoritesView, Product, ProductId};
use storefront_db::{FavoritesSubscription, LocalStore};

/// What a `toggle` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Store not initialized; the toggle was dropped.
    Skipped,
}

#[derive(Debug)]
struct FavoritesState {
    favorites: Vec<Product>,
    ids: HashSet<ProductId>,
    is_loading: bool,
}

/// Shared between the manager and the store listener.
#[derive(Debug)]
struct Shared {
    state: Mutex<FavoritesState>,
    updates: watch::Sender<Vec<Product>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FavoritesState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, favorites: Vec<Product>) {
        let mut state = self.lock();
        state.ids = favorites.iter().map(|p| p.id).collect();
        state.favorites = favorites;
        state.is_loading = false;
        self.updates.send_replace(state.favorites.clone());
    }

    fn finish_loading(&self) {
        self.lock().is_loading = false;
    }

    fn added(&self, product: Product) {
        let mut state = self.lock();
        state.favorites.retain(|p| p.id != product.id);
        state.ids.insert(product.id);
        state.favorites.insert(0, product);
        self.updates.send_replace(state.favorites.clone());
    }

    fn removed(&self, id: ProductId) {
        let mut state = self.lock();
        state.favorites.retain(|p| p.id != id);
        state.ids.remove(&id);
        self.updates.send_replace(state.favorites.clone());
    }
}

/// Toggle, query and observe favorites.
#[derive(Debug)]
pub struct FavoritesManager {
    store: LocalStore,
    shared: Arc<Shared>,
    subscription: Mutex<Option<FavoritesSubscription>>,
}

impl FavoritesManager {
    pub fn new(store: LocalStore) -> Self {
        let (updates, _) = watch::channel(Vec::new());

        FavoritesManager {
            store,
            shared: Arc::new(Shared {
                state: Mutex::new(FavoritesState {
                    favorites: Vec::new(),
                    ids: HashSet::new(),
                    is_loading: true,
                }),
                updates,
            }),
            subscription: Mutex::new(None),
        }
    }

    /// Opens the store if needed, starts listening, and loads the list.
    ///
    /// `is_loading` is cleared whether or not this succeeds; on failure the
    /// view keeps whatever list it already had.
    pub async fn initialize(&self) -> SyncResult<()> {
        let result = self.load().await;
        if let Err(ref e) = result {
            warn!(error = %e, "Failed to load favorites");
            self.shared.finish_loading();
        }
        result
    }

    async fn load(&self) -> SyncResult<()> {
        self.store.initialize().await?;

        {
            let mut subscription = self.subscription_slot();
            if subscription.is_none() {
                let shared = Arc::clone(&self.shared);
                *subscription = Some(self.store.subscribe_favorites(move |favorites| {
                    debug!(count = favorites.len(), "Favorites changed in store");
                    shared.replace(favorites);
                })?);
            }
        }

        let favorites = self.store.list_favorites().await?;
        info!(count = favorites.len(), "Favorites loaded");
        self.shared.replace(favorites);
        Ok(())
    }

    /// Favorites the product, or unfavorites it if it already is one.
    ///
    /// Dropped with `Skipped` while the store is not initialized.
    pub async fn toggle(&self, product: &Product) -> SyncResult<ToggleOutcome> {
        if !self.store.is_initialized() {
            debug!(id = product.id, "Local store not initialized, ignoring favorite toggle");
            return Ok(ToggleOutcome::Skipped);
        }

        if self.is_favorite(product.id) {
            self.store.delete_favorite(product.id).await.map_err(|e| {
                warn!(id = product.id, error = %e, "Failed to remove favorite");
                e
            })?;
            self.shared.removed(product.id);
            Ok(ToggleOutcome::Removed)
        } else {
            self.store.upsert_favorite(product).await.map_err(|e| {
                warn!(id = product.id, error = %e, "Failed to add favorite");
                e
            })?;
            self.shared.added(product.clone());
            Ok(ToggleOutcome::Added)
        }
    }

    /// Membership check against the in-memory snapshot.
    pub fn is_favorite(&self, id: ProductId) -> bool {
        self.shared.lock().ids.contains(&id)
    }

    /// Current favorites, most recent first.
    pub fn favorites(&self) -> Vec<Product> {
        self.shared.lock().favorites.clone()
    }

    pub fn view(&self) -> FavoritesView {
        let state = self.shared.lock();
        FavoritesView {
            favorites: state.favorites.clone(),
            is_loading: state.is_loading,
        }
    }

    /// Receiver that sees every change to the list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Product>> {
        self.shared.updates.subscribe()
    }

    /// Stops listening to the store.
    pub fn shutdown(&self) {
        if let Some(subscription) = self.subscription_slot().take() {
            subscription.unsubscribe();
        }
    }

    fn subscription_slot(&self) -> MutexGuard<'_, Option<FavoritesSubscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
