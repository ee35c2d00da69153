//! # Sync Engine
//!
//! Decides network vs. cache for the active product query and keeps the
//! paginated feed.
//!
//! ## Fetch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  reset_and_fetch(q) ── generation += 1, items = [], offset = 0         │
//! │  fetch_next_page()  ── only if has_more && !loading                    │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  loading = true, error = None                                          │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  oracle.is_online()? ──── no ───► items = store.query_products(q)      │
//! │          │ yes                     has_more = false, is_offline = true  │
//! │          ▼                                                              │
//! │  remote.fetch_page(q, offset, limit)                                   │
//! │          │                                                              │
//! │     ok ──┼──► store.upsert_products(page)                              │
//! │          │    items (+)= page, offset += limit, has_more = offset<total│
//! │          │                                                              │
//! │    err ──┴──► error = "Failed to fetch products", has_more = false     │
//! │               items = store.query_products(q)                          │
//! │               one automatic reset_and_fetch(q) per failure episode     │
//! │                                                                         │
//! │  Any result whose generation is no longer current is dropped.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Once the Local Store is closed, resets and page loads keep the items
//! already shown and report a storage error instead of fetching.
//!
//! State lives behind a std mutex that is never held across an await.
//! Every transition is published on a `watch` channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PagingSettings;
use crate::connectivity::ConnectivityOracle;
use crate::error::SyncResult;
use crate::remote::RemoteProductSource;
use storefront_core::feed::{
    CACHE_READ_FAILED_MESSAGE, STORE_CLOSED_MESSAGE, STORE_INIT_FAILED_MESSAGE,
};
use storefront_core::{FeedError, FeedErrorKind, ProductFeed};
use storefront_db::LocalStore;

/// One issued fetch, pinned to the generation it was issued in.
#[derive(Debug, Clone)]
struct FetchTicket {
    generation: u64,
    query: String,
    offset: u32,
    limit: u32,
    replace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchOutcome {
    Applied,
    Failed,
    Superseded,
}

struct EngineState {
    feed: ProductFeed,
    /// Bumped by every reset; results from older generations are dropped.
    generation: u64,
    /// One automatic retry per failure episode.
    retry_available: bool,
    /// A fetch has been issued for `feed.query`.
    issued: bool,
}

/// Orchestrates connectivity, remote pages and the Local Store cache.
pub struct SyncEngine {
    store: LocalStore,
    oracle: Arc<dyn ConnectivityOracle>,
    remote: Arc<dyn RemoteProductSource>,
    paging: PagingSettings,
    state: Mutex<EngineState>,
    updates: watch::Sender<ProductFeed>,
}

impl SyncEngine {
    pub fn new(
        store: LocalStore,
        oracle: Arc<dyn ConnectivityOracle>,
        remote: Arc<dyn RemoteProductSource>,
        paging: PagingSettings,
    ) -> Self {
        let feed = ProductFeed::default();
        let (updates, _) = watch::channel(feed.clone());

        SyncEngine {
            store,
            oracle,
            remote,
            paging,
            state: Mutex::new(EngineState {
                feed,
                generation: 0,
                retry_available: true,
                issued: false,
            }),
            updates,
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Current feed.
    pub fn snapshot(&self) -> ProductFeed {
        self.lock().feed.clone()
    }

    /// Receiver that sees every feed transition.
    pub fn subscribe(&self) -> watch::Receiver<ProductFeed> {
        self.updates.subscribe()
    }

    /// The Local Store this engine caches into.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Opens the Local Store, then fetches the active query.
    ///
    /// Queries set before this call were only recorded; this is where they
    /// run. On failure the feed carries a storage error and nothing is
    /// fetched.
    pub async fn initialize(&self) -> SyncResult<ProductFeed> {
        if let Err(e) = self.store.initialize().await {
            error!(error = %e, "Failed to initialize local store");
            let mut state = self.lock();
            state.feed.loading = false;
            state.feed.error = Some(FeedError::new(
                FeedErrorKind::Storage,
                STORE_INIT_FAILED_MESSAGE,
            ));
            self.publish(&state);
            return Err(e.into());
        }

        let query = self.lock().feed.query.clone();
        self.run_reset(query).await;
        Ok(self.snapshot())
    }

    /// Starts the query over from the first page.
    ///
    /// Before the store is initialized the query is only recorded.
    pub async fn reset_and_fetch(&self, query: impl Into<String>) -> ProductFeed {
        let query = query.into();
        {
            let mut state = self.lock();
            if state.feed.query != query {
                state.retry_available = true;
            }
        }

        self.run_reset(query).await;
        self.snapshot()
    }

    /// Loads the next page of the active query.
    ///
    /// No-op unless `has_more` is set and no fetch is in flight.
    pub async fn fetch_next_page(&self) -> ProductFeed {
        let Some(ticket) = self.begin_next_page() else {
            return self.snapshot();
        };

        let generation = ticket.generation;
        let query = ticket.query.clone();

        if self.execute(ticket).await == FetchOutcome::Failed && self.take_retry(generation) {
            info!(query = %query, "Retrying failed page fetch from the start");
            self.run_reset(query).await;
        }

        self.snapshot()
    }

    /// Switches the active query.
    ///
    /// Setting the query that is already active and fetched does nothing.
    pub async fn set_query(&self, query: impl Into<String>) -> ProductFeed {
        let query = query.into();
        {
            let state = self.lock();
            if state.issued && state.feed.query == query {
                return state.feed.clone();
            }
        }

        self.reset_and_fetch(query).await
    }

    /// User-initiated refetch of the active query.
    pub async fn refresh(&self) -> ProductFeed {
        let query = {
            let mut state = self.lock();
            state.retry_available = true;
            state.feed.query.clone()
        };

        self.run_reset(query).await;
        self.snapshot()
    }

    /// Refetches the active query on every reachability transition.
    ///
    /// The task ends when the engine is dropped or the oracle goes away.
    pub fn watch_connectivity(self: &Arc<Self>) -> JoinHandle<()> {
        let mut transitions = self.oracle.subscribe();
        let engine = Arc::downgrade(self);

        tokio::spawn(async move {
            while transitions.changed().await.is_ok() {
                let online = *transitions.borrow_and_update();
                let Some(engine) = engine.upgrade() else {
                    break;
                };

                info!(online, "Reachability changed, refetching active query");
                engine.refresh().await;
            }
            debug!("Connectivity watcher stopped");
        })
    }

    // =========================================================================
    // Fetch Pipeline
    // =========================================================================

    async fn run_reset(&self, query: String) {
        loop {
            let Some(ticket) = self.begin_reset(&query) else {
                return;
            };
            let generation = ticket.generation;

            match self.execute(ticket).await {
                FetchOutcome::Failed if self.take_retry(generation) => {
                    info!(query = %query, "Retrying failed fetch once");
                }
                _ => return,
            }
        }
    }

    fn begin_reset(&self, query: &str) -> Option<FetchTicket> {
        let closed = self.store.is_closed();
        let ready = self.store.is_initialized();
        let mut state = self.lock();

        state.generation += 1;
        state.feed.query = query.to_string();

        if closed {
            warn!(query = %query, "Local store closed, keeping last items");
            self.reject_closed(&mut state);
            return None;
        }

        state.feed.items.clear();
        state.feed.offset = 0;
        state.feed.has_more = true;
        state.feed.error = None;
        state.feed.loading = ready;
        state.issued = ready;
        self.publish(&state);

        if !ready {
            debug!(query = %query, "Local store not initialized, deferring fetch");
            return None;
        }

        Some(FetchTicket {
            generation: state.generation,
            query: query.to_string(),
            offset: 0,
            limit: self.paging.initial_page_size,
            replace: true,
        })
    }

    fn begin_next_page(&self) -> Option<FetchTicket> {
        let closed = self.store.is_closed();
        if !closed && !self.store.is_initialized() {
            return None;
        }

        let mut state = self.lock();
        if !state.feed.has_more || state.feed.loading {
            return None;
        }

        if closed {
            warn!("Local store closed, not loading more");
            self.reject_closed(&mut state);
            return None;
        }

        state.feed.loading = true;
        state.feed.error = None;
        self.publish(&state);

        Some(FetchTicket {
            generation: state.generation,
            query: state.feed.query.clone(),
            offset: state.feed.offset,
            limit: self.paging.page_size,
            replace: false,
        })
    }

    async fn execute(&self, ticket: FetchTicket) -> FetchOutcome {
        let online = self.oracle.is_online().await;

        if !online {
            return self.serve_offline(&ticket).await;
        }

        {
            let mut state = self.lock();
            if state.generation != ticket.generation {
                return FetchOutcome::Superseded;
            }
            if state.feed.is_offline {
                state.feed.is_offline = false;
                self.publish(&state);
            }
        }

        let remote_query = Some(ticket.query.as_str()).filter(|q| !q.is_empty());
        debug!(
            query = %ticket.query,
            offset = ticket.offset,
            limit = ticket.limit,
            generation = ticket.generation,
            "Fetching remote page"
        );

        match self
            .remote
            .fetch_page(remote_query, ticket.offset, ticket.limit)
            .await
        {
            Ok(page) => {
                if let Err(e) = self.store.upsert_products(&page.items).await {
                    warn!(error = %e, "Failed to cache fetched page");
                }

                let mut state = self.lock();
                if state.generation != ticket.generation {
                    debug!(generation = ticket.generation, "Discarding superseded page");
                    return FetchOutcome::Superseded;
                }

                let count = page.items.len();
                if ticket.replace {
                    state.feed.items = page.items;
                } else {
                    state.feed.items.extend(page.items);
                }
                state.feed.offset = ticket.offset.saturating_add(ticket.limit);
                state.feed.has_more = u64::from(state.feed.offset) < page.total;
                state.feed.loading = false;
                state.retry_available = true;
                self.publish(&state);

                info!(
                    query = %ticket.query,
                    count,
                    offset = state.feed.offset,
                    total = page.total,
                    "Fetched product page"
                );
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!(query = %ticket.query, error = %e, "Remote fetch failed, serving cache");
                let cached = self.store.query_products(Some(&ticket.query)).await;

                let mut state = self.lock();
                if state.generation != ticket.generation {
                    return FetchOutcome::Superseded;
                }

                match cached {
                    Ok(items) => state.feed.items = items,
                    Err(db) => warn!(error = %db, "Cache fallback failed, keeping last items"),
                }
                state.feed.error = Some(e.feed_error());
                state.feed.has_more = false;
                state.feed.loading = false;
                self.publish(&state);

                FetchOutcome::Failed
            }
        }
    }

    async fn serve_offline(&self, ticket: &FetchTicket) -> FetchOutcome {
        let cached = self.store.query_products(Some(&ticket.query)).await;

        let mut state = self.lock();
        if state.generation != ticket.generation {
            return FetchOutcome::Superseded;
        }

        state.feed.is_offline = true;
        state.feed.has_more = false;
        state.feed.loading = false;

        let outcome = match cached {
            Ok(items) => {
                debug!(query = %ticket.query, count = items.len(), "Served products offline");
                state.feed.items = items;
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!(error = %e, "Offline cache read failed, keeping last items");
                state.feed.error = Some(FeedError::new(
                    FeedErrorKind::Storage,
                    CACHE_READ_FAILED_MESSAGE,
                ));
                FetchOutcome::Failed
            }
        };
        self.publish(&state);
        outcome
    }

    /// Leaves the last items in place and reports the closed store.
    fn reject_closed(&self, state: &mut EngineState) {
        state.feed.has_more = false;
        state.feed.loading = false;
        state.feed.error = Some(FeedError::new(
            FeedErrorKind::Storage,
            STORE_CLOSED_MESSAGE,
        ));
        self.publish(state);
    }

    /// Consumes the retry budget if `generation` is still current.
    fn take_retry(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation || !state.retry_available {
            return false;
        }
        state.retry_available = false;
        true
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &EngineState) {
        self.updates.send_replace(state.feed.clone());
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SyncEngine")
            .field("query", &state.feed.query)
            .field("generation", &state.generation)
            .field("items", &state.feed.items.len())
            .finish()
    }
}
