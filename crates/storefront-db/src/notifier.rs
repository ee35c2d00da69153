//! # Favorites Change Notifier
//!
//! Coalesces bursts of favorites mutations into one notification.
//!
//! ## Debounce Timeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  window = 100ms                                                         │
//! │                                                                         │
//! │  t=0    upsert(A)  ──► arm timer (fires at 100)                        │
//! │  t=30   upsert(B)  ──► abort, re-arm (fires at 130)                    │
//! │  t=60   delete(A)  ──► abort, re-arm (fires at 160)                    │
//! │  t=160  timer fires ──► list_favorites() ──► every listener gets [B]   │
//! │                                                                         │
//! │  Three mutations, one notification carrying the state after the last. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Once the window elapses the timer detaches itself before loading the
//! list, so a mutation arriving during the load arms a fresh timer instead
//! of cancelling a read that is already in flight. That read's result is
//! then stale and is dropped; only the newest armed timer delivers.
//!
//! Delivery and re-arming are serialized, so a listener never receives a
//! list older than a change whose write has already returned.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DbResult;
use storefront_core::Product;

/// Callback invoked with the full, newest-first favorites list.
pub type FavoritesListener = Arc<dyn Fn(Vec<Product>) + Send + Sync>;

#[derive(Default)]
struct NotifierState {
    next_id: u64,
    listeners: HashMap<u64, FavoritesListener>,
    pending: Option<JoinHandle<()>>,
    /// Bumped on every arm; a timer that wakes with a stale value exits.
    armed: u64,
    shut_down: bool,
}

pub(crate) struct FavoritesNotifier {
    window: Duration,
    state: Mutex<NotifierState>,
    /// Held while listeners run and while a new timer is armed.
    delivery: Mutex<()>,
}

impl FavoritesNotifier {
    pub(crate) fn new(window: Duration) -> Arc<Self> {
        Arc::new(FavoritesNotifier {
            window,
            state: Mutex::new(NotifierState::default()),
            delivery: Mutex::new(()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(self: &Arc<Self>, listener: FavoritesListener) -> FavoritesSubscription {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.insert(id, listener);

        debug!(listener = id, "Favorites listener registered");
        FavoritesSubscription {
            id,
            notifier: Arc::downgrade(self),
            active: true,
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut state = self.lock();
        state.listeners.remove(&id);

        // Nobody left to tell
        if state.listeners.is_empty() {
            if let Some(handle) = state.pending.take() {
                handle.abort();
            }
        }
        debug!(listener = id, "Favorites listener removed");
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Arms the timer, replacing any pending one.
    ///
    /// `load` is only polled after the window elapses with no newer change.
    pub(crate) fn schedule<Fut>(self: &Arc<Self>, load: Fut)
    where
        Fut: Future<Output = DbResult<Vec<Product>>> + Send + 'static,
    {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = self.lock();
        if state.shut_down || state.listeners.is_empty() {
            return;
        }

        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
        state.armed += 1;

        let armed = state.armed;
        let window = self.window;
        let notifier = Arc::downgrade(self);

        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;

            {
                let Some(this) = notifier.upgrade() else {
                    return;
                };
                let mut state = this.lock();
                if state.shut_down || state.armed != armed {
                    return;
                }
                state.pending = None;
            }

            match load.await {
                Ok(favorites) => {
                    if let Some(this) = notifier.upgrade() {
                        this.deliver(armed, favorites);
                    }
                }
                Err(e) => warn!(error = %e, "Failed to load favorites for change notification"),
            }
        }));
    }

    fn deliver(&self, armed: u64, favorites: Vec<Product>) {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let listeners: Vec<FavoritesListener> = {
            let state = self.lock();
            if state.shut_down {
                return;
            }
            if state.armed != armed {
                debug!(armed, current = state.armed, "Dropping superseded favorites load");
                return;
            }
            let mut ids: Vec<&u64> = state.listeners.keys().collect();
            ids.sort();
            ids.into_iter()
                .filter_map(|id| state.listeners.get(id).cloned())
                .collect()
        };

        debug!(
            listeners = listeners.len(),
            count = favorites.len(),
            "Delivering favorites change"
        );
        for listener in listeners {
            listener(favorites.clone());
        }
    }

    /// Cancels the pending timer and drops every listener. Terminal.
    pub(crate) fn shutdown(&self) {
        let mut state = self.lock();
        state.shut_down = true;
        state.listeners.clear();
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
    }
}

// =============================================================================
// Subscription Handle
// =============================================================================

/// Keeps a favorites listener registered until unsubscribed or dropped.
pub struct FavoritesSubscription {
    id: u64,
    notifier: Weak<FavoritesNotifier>,
    active: bool,
}

impl FavoritesSubscription {
    /// Stops further notifications to this listener.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.unsubscribe(self.id);
        }
    }
}

impl Drop for FavoritesSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for FavoritesSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FavoritesSubscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::Money;
    use tokio::sync::Notify;

    fn product(id: i64) -> Product {
        Product {
            id,
            title: format!("P{id}"),
            price: Money::from_cents(100),
            thumbnail: String::new(),
            description: String::new(),
        }
    }

    type Seen = Arc<Mutex<Vec<Vec<i64>>>>;

    fn recorder(notifier: &Arc<FavoritesNotifier>) -> (Seen, FavoritesSubscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = notifier.subscribe(Arc::new(move |favorites: Vec<Product>| {
            sink.lock()
                .unwrap()
                .push(favorites.iter().map(|p| p.id).collect());
        }));
        (seen, subscription)
    }

    #[tokio::test]
    async fn test_load_overtaken_by_newer_change_is_dropped() {
        let notifier = FavoritesNotifier::new(Duration::from_millis(10));
        let (seen, _subscription) = recorder(&notifier);

        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        {
            let started = started.clone();
            let release = release.clone();
            notifier.schedule(async move {
                started.notify_one();
                release.notified().await;
                // Read before the removal committed
                Ok(vec![product(1)])
            });
        }
        started.notified().await;

        // The removal lands while the first read is still in flight
        notifier.schedule(async { Ok(Vec::new()) });
        release.notify_one();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(*seen.lock().unwrap(), vec![Vec::<i64>::new()]);
    }

    #[tokio::test]
    async fn test_burst_delivers_once() {
        let notifier = FavoritesNotifier::new(Duration::from_millis(20));
        let (seen, _subscription) = recorder(&notifier);

        for id in 1..=3 {
            notifier.schedule(async move { Ok(vec![product(id)]) });
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(*seen.lock().unwrap(), vec![vec![3]]);
    }
}
