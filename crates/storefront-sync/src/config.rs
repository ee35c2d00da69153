//! # Storefront Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOREFRONT_API_URL=https://staging.example.com                     │
//! │     STOREFRONT_DB_PATH=/tmp/storefront.db                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/storefront/storefront.toml (Linux)                       │
//! │     ~/Library/Application Support/com.storefront.storefront/... (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     dummyjson.com, pages of 20 then 10, 100ms favorites window         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "https://dummyjson.com"
//! request_timeout_secs = 15
//!
//! [paging]
//! initial_page_size = 20
//! page_size = 10
//!
//! [store]
//! favorites_debounce_ms = 100
//! max_cached_products = 5000
//!
//! [connectivity]
//! probe_timeout_secs = 5
//! poll_interval_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};
use storefront_core::{DEFAULT_FAVORITES_DEBOUNCE_MS, DEFAULT_INITIAL_PAGE_SIZE, DEFAULT_PAGE_SIZE};
use storefront_db::StoreConfig;

// =============================================================================
// API Settings
// =============================================================================

/// Remote product endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL; `/products` and `/products/search` are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds). This is the only fetch timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://dummyjson.com".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Paging Settings
// =============================================================================

/// Page sizes used by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingSettings {
    /// Limit for the first page of a query.
    #[serde(default = "default_initial_page_size")]
    pub initial_page_size: u32,

    /// Limit for every following page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_initial_page_size() -> u32 {
    DEFAULT_INITIAL_PAGE_SIZE
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PagingSettings {
    fn default() -> Self {
        PagingSettings {
            initial_page_size: default_initial_page_size(),
            page_size: default_page_size(),
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Local Store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Database file. Defaults to `storefront.db` in the platform data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Favorites notification window (milliseconds).
    #[serde(default = "default_favorites_debounce")]
    pub favorites_debounce_ms: u64,

    /// Cap on cached products. Absent means unbounded.
    #[serde(default)]
    pub max_cached_products: Option<u32>,
}

fn default_favorites_debounce() -> u64 {
    DEFAULT_FAVORITES_DEBOUNCE_MS
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            database_path: None,
            favorites_debounce_ms: default_favorites_debounce(),
            max_cached_products: None,
        }
    }
}

// =============================================================================
// Connectivity Settings
// =============================================================================

/// Reachability probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivitySettings {
    /// URL probed with `HEAD`. Defaults to the API base URL.
    #[serde(default)]
    pub probe_url: Option<String>,

    /// Probe timeout (seconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Background probe interval (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        ConnectivitySettings {
            probe_url: None,
            probe_timeout_secs: default_probe_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete storefront configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Remote product endpoint.
    #[serde(default)]
    pub api: ApiSettings,

    /// Page sizes.
    #[serde(default)]
    pub paging: PagingSettings,

    /// Local Store.
    #[serde(default)]
    pub store: StoreSettings,

    /// Reachability probe.
    #[serde(default)]
    pub connectivity: ConnectivitySettings,
}

impl StorefrontConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (storefront.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load storefront config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml(contents: &str) -> SyncResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Storefront config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        validate_http_url(&self.api.base_url)?;

        if let Some(ref probe) = self.connectivity.probe_url {
            validate_http_url(probe)?;
        }

        if self.paging.initial_page_size == 0 || self.paging.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "page sizes must be greater than 0".into(),
            ));
        }

        if self.store.favorites_debounce_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "favorites_debounce_ms must be greater than 0".into(),
            ));
        }

        if self.api.request_timeout_secs == 0 || self.connectivity.probe_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "timeouts must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("STOREFRONT_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Ok(path) = std::env::var("STOREFRONT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.database_path = Some(PathBuf::from(path));
        }

        if let Ok(size) = std::env::var("STOREFRONT_INITIAL_PAGE_SIZE") {
            match size.parse::<u32>() {
                Ok(n) => self.paging.initial_page_size = n,
                Err(_) => warn!(value = %size, "Ignoring invalid STOREFRONT_INITIAL_PAGE_SIZE"),
            }
        }

        if let Ok(size) = std::env::var("STOREFRONT_PAGE_SIZE") {
            match size.parse::<u32>() {
                Ok(n) => self.paging.page_size = n,
                Err(_) => warn!(value = %size, "Ignoring invalid STOREFRONT_PAGE_SIZE"),
            }
        }

        if let Ok(cap) = std::env::var("STOREFRONT_MAX_CACHED_PRODUCTS") {
            match cap.parse::<u32>() {
                Ok(n) => self.store.max_cached_products = Some(n),
                Err(_) => warn!(value = %cap, "Ignoring invalid STOREFRONT_MAX_CACHED_PRODUCTS"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "storefront", "storefront")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("storefront.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolved database path: configured, else platform data dir, else cwd.
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("storefront.db")))
            .unwrap_or_else(|| PathBuf::from("storefront.db"))
    }

    /// Local Store configuration derived from `[store]`.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.database_path())
            .favorites_debounce(Duration::from_millis(self.store.favorites_debounce_ms))
            .max_cached_products(self.store.max_cached_products)
    }

    /// Remote request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// URL used by the reachability probe.
    pub fn probe_url(&self) -> &str {
        self.connectivity
            .probe_url
            .as_deref()
            .unwrap_or(&self.api.base_url)
    }

    /// Reachability probe timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity.probe_timeout_secs)
    }

    /// Background reachability poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity.poll_interval_secs)
    }
}

fn validate_http_url(raw: &str) -> SyncResult<()> {
    let parsed = Url::parse(raw)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(SyncError::InvalidUrl(format!(
            "URL must use http:// or https://, got {}:// in {}",
            other, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StorefrontConfig::default();
        assert_eq!(config.api.base_url, "https://dummyjson.com");
        assert_eq!(config.paging.initial_page_size, 20);
        assert_eq!(config.paging.page_size, 10);
        assert_eq!(config.store.favorites_debounce_ms, 100);
        assert!(config.store.max_cached_products.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = StorefrontConfig::default();

        config.api.base_url = "ws://localhost:8080".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.api.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.api.base_url = "http://localhost:8080".into();
        config.paging.page_size = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));

        config.paging.page_size = 10;
        config.store.favorites_debounce_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = StorefrontConfig::from_toml(
            r#"
            [paging]
            page_size = 25

            [store]
            max_cached_products = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.paging.page_size, 25);
        assert_eq!(config.paging.initial_page_size, 20);
        assert_eq!(config.store.max_cached_products, Some(500));
        assert_eq!(config.api.request_timeout_secs, 15);
    }

    #[test]
    fn test_probe_url_falls_back_to_api() {
        let mut config = StorefrontConfig::default();
        assert_eq!(config.probe_url(), "https://dummyjson.com");

        config.connectivity.probe_url = Some("https://status.example.com".into());
        assert_eq!(config.probe_url(), "https://status.example.com");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("storefront.toml");

        let mut config = StorefrontConfig::default();
        config.store.database_path = Some(dir.path().join("data.db"));
        config.store.max_cached_products = Some(42);
        config.save(Some(path.clone())).unwrap();

        let loaded = StorefrontConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.store.max_cached_products, Some(42));
        assert_eq!(loaded.database_path(), dir.path().join("data.db"));
    }

    #[test]
    fn test_store_config_carries_settings() {
        let mut config = StorefrontConfig::default();
        config.store.database_path = Some(PathBuf::from("/tmp/sf.db"));
        config.store.favorites_debounce_ms = 250;

        let store = config.store_config();
        assert_eq!(store.database_path, PathBuf::from("/tmp/sf.db"));
        assert_eq!(store.favorites_debounce, Duration::from_millis(250));
    }
}
