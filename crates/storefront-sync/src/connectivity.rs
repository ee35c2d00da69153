//! # Connectivity Oracle
//!
//! Answers "are we online?" and publishes reachability transitions.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Host platform callback ──► ManualConnectivity::set_online(bool)       │
//! │                                       │                                 │
//! │  HEAD probe every N secs ──► HttpProbeConnectivity::probe()            │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                           watch::Sender<bool>                          │
//! │                          (publishes transitions)                       │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                  SyncEngine::watch_connectivity() ── refetch            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dropping a receiver returned by `subscribe()` is the unsubscribe.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::SyncResult;

/// Source of network reachability.
#[async_trait]
pub trait ConnectivityOracle: Send + Sync {
    /// Authoritative reachability at call time.
    async fn is_online(&self) -> bool;

    /// Receiver that observes every reachability transition.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Publishes `online` if it differs from the current value.
fn publish(state: &watch::Sender<bool>, online: bool) -> bool {
    let changed = state.send_if_modified(|current| {
        if *current == online {
            false
        } else {
            *current = online;
            true
        }
    });

    if changed {
        info!(online, "Connectivity changed");
    }
    changed
}

// =============================================================================
// Manual Connectivity
// =============================================================================

/// Reachability pushed in from outside (e.g. the mobile OS reachability callback).
#[derive(Debug)]
pub struct ManualConnectivity {
    state: watch::Sender<bool>,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        ManualConnectivity { state }
    }

    /// Records the current reachability. Only transitions reach subscribers.
    pub fn set_online(&self, online: bool) {
        publish(&self.state, online);
    }
}

#[async_trait]
impl ConnectivityOracle for ManualConnectivity {
    async fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

// =============================================================================
// HTTP Probe Connectivity
// =============================================================================

/// Reachability measured by a `HEAD` request to a probe URL.
///
/// Any HTTP response counts as reachable; only transport failures and
/// timeouts count as offline. Assumed reachable until the first probe.
#[derive(Debug)]
pub struct HttpProbeConnectivity {
    client: reqwest::Client,
    probe_url: String,
    state: watch::Sender<bool>,
}

impl HttpProbeConnectivity {
    pub fn new(probe_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let (state, _) = watch::channel(true);

        Ok(HttpProbeConnectivity {
            client,
            probe_url: probe_url.into(),
            state,
        })
    }

    /// Probes once and publishes the result.
    pub async fn probe(&self) -> bool {
        let online = match self.client.head(&self.probe_url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(url = %self.probe_url, error = %e, "Reachability probe failed");
                false
            }
        };

        publish(&self.state, online);
        online
    }

    /// Probes every `interval` in the background until `self` is dropped.
    pub fn spawn_monitor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let oracle: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(oracle) = oracle.upgrade() else {
                    break;
                };
                oracle.probe().await;
            }
            debug!("Reachability monitor stopped");
        })
    }
}

#[async_trait]
impl ConnectivityOracle for HttpProbeConnectivity {
    async fn is_online(&self) -> bool {
        self.probe().await
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}
