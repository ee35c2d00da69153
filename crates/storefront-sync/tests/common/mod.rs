//! In-test collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use storefront_core::{Money, Product, ProductPage};
use storefront_db::{LocalStore, StoreConfig};
use storefront_sync::config::PagingSettings;
use storefront_sync::{
    ConnectivityOracle, ManualConnectivity, RemoteProductSource, SyncEngine, SyncError,
    SyncResult,
};

pub fn product(id: i64, title: &str) -> Product {
    Product {
        id,
        title: title.to_string(),
        price: Money::from_cents(100 * id),
        thumbnail: format!("https://cdn.example.com/{id}.jpg"),
        description: String::new(),
    }
}

pub fn ids(products: &[Product]) -> Vec<i64> {
    products.iter().map(|p| p.id).collect()
}

pub async fn memory_store() -> LocalStore {
    LocalStore::open(StoreConfig::in_memory().favorites_debounce(Duration::from_millis(50)))
        .await
        .unwrap()
}

pub fn engine(
    store: &LocalStore,
    oracle: Arc<ManualConnectivity>,
    remote: Arc<dyn RemoteProductSource>,
) -> Arc<SyncEngine> {
    let oracle: Arc<dyn ConnectivityOracle> = oracle;
    Arc::new(SyncEngine::new(
        store.clone(),
        oracle,
        remote,
        PagingSettings::default(),
    ))
}

/// One recorded `fetch_page` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub query: Option<String>,
    pub offset: u32,
    pub limit: u32,
}

// =============================================================================
// Catalog Remote
// =============================================================================

/// Serves windows of a fixed catalogue, filtered like the real search endpoint.
pub struct CatalogRemote {
    catalog: Vec<Product>,
    calls: Mutex<Vec<Call>>,
}

impl CatalogRemote {
    pub fn new(catalog: Vec<Product>) -> Arc<Self> {
        Arc::new(CatalogRemote {
            catalog,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Products `P1..=Pn`.
    pub fn numbered(n: i64) -> Arc<Self> {
        Self::new((1..=n).map(|id| product(id, &format!("P{id}"))).collect())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteProductSource for CatalogRemote {
    async fn fetch_page(
        &self,
        query: Option<&str>,
        offset: u32,
        limit: u32,
    ) -> SyncResult<ProductPage> {
        self.calls.lock().unwrap().push(Call {
            query: query.map(str::to_string),
            offset,
            limit,
        });

        let matching: Vec<Product> = self
            .catalog
            .iter()
            .filter(|p| p.matches(query.unwrap_or_default()))
            .cloned()
            .collect();
        let items = matching
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(ProductPage {
            items,
            total: matching.len() as u64,
        })
    }
}

// =============================================================================
// Scripted Remote
// =============================================================================

/// Replays queued results in order; fails with a network error once empty.
pub struct ScriptedRemote {
    script: Mutex<VecDeque<SyncResult<ProductPage>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRemote {
    pub fn new(script: Vec<SyncResult<ProductPage>>) -> Arc<Self> {
        Arc::new(ScriptedRemote {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn push(&self, result: SyncResult<ProductPage>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteProductSource for ScriptedRemote {
    async fn fetch_page(
        &self,
        query: Option<&str>,
        offset: u32,
        limit: u32,
    ) -> SyncResult<ProductPage> {
        self.calls.lock().unwrap().push(Call {
            query: query.map(str::to_string),
            offset,
            limit,
        });

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::Network("connection refused".into())))
    }
}

// =============================================================================
// Gated Remote
// =============================================================================

/// Holds the response for `gated_query` until released.
pub struct GatedRemote {
    gated_query: String,
    gated_page: ProductPage,
    open_page: ProductPage,
    pub started: Notify,
    pub release: Notify,
}

impl GatedRemote {
    pub fn new(gated_query: &str, gated_page: ProductPage, open_page: ProductPage) -> Arc<Self> {
        Arc::new(GatedRemote {
            gated_query: gated_query.to_string(),
            gated_page,
            open_page,
            started: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl RemoteProductSource for GatedRemote {
    async fn fetch_page(
        &self,
        query: Option<&str>,
        _offset: u32,
        _limit: u32,
    ) -> SyncResult<ProductPage> {
        if query == Some(self.gated_query.as_str()) {
            self.started.notify_one();
            self.release.notified().await;
            return Ok(self.gated_page.clone());
        }
        Ok(self.open_page.clone())
    }
}
