//! # Core Configuration Module
//!
//! Configuration for the dictionary core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`CoreConfig`] holding the platform bridges and tunables required by the
//! core crates. It enforces fail-fast validation so a missing required bridge
//! surfaces at startup, not at first use.
//!
//! ## Required Dependencies
//!
//! - `SettingsStore` - durable storage for the sync queue and snapshots
//! - `api_base_url` - root of the remote dictionary API
//!
//! ## Optional Dependencies
//!
//! - `HttpClient` - HTTP operations (required by the sync engine; optional
//!   here so cache-only consumers can skip it)
//! - `NetworkMonitor` - connectivity fast path for the sync engine
//! - `Clock` - time source, defaults to the system clock
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.example.com")
//!     .settings_store(Arc::new(settings_store))
//!     .http_client(Arc::new(http_client))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{CoreError, Result};
use bridge_traits::{
    time::{Clock, SystemClock},
    HttpClient, NetworkMonitor, SettingsStore,
};
use core_cache::CacheConfig;
use std::sync::Arc;
use std::time::Duration;

/// Sync engine tunables.
#[derive(Debug, Clone)]
pub struct SyncTunables {
    /// Number of pending actions sent per drain batch
    pub batch_size: usize,
    /// Pause between drain batches, to stay under remote rate limits
    pub batch_delay: Duration,
    /// Period of the automatic background drain
    pub auto_sync_interval: Duration,
    /// Timeout for the connectivity probe
    pub probe_timeout: Duration,
    /// Timeout for each remote mutation or fetch
    pub request_timeout: Duration,
    /// Failed attempts before an action is reported instead of retried
    pub max_retries: u32,
}

impl Default for SyncTunables {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay: Duration::from_millis(500),
            auto_sync_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

/// Core configuration.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root URL of the remote dictionary API
    pub api_base_url: String,

    /// Durable key-value storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// HTTP client for API requests (required by the sync engine)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Network connectivity monitor (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Time source, defaults to the system clock
    pub clock: Arc<dyn Clock>,

    /// Ephemeral cache configuration
    pub cache: CacheConfig,

    /// Period of the proactive expired-entry sweep
    pub cache_sweep_interval: Duration,

    /// Sync engine tunables
    pub sync: SyncTunables,
}

impl CoreConfig {
    /// Create a new builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    http_client: Option<Arc<dyn HttpClient>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    cache: Option<CacheConfig>,
    cache_sweep_interval: Option<Duration>,
    sync: Option<SyncTunables>,
}

impl CoreConfigBuilder {
    /// Set the remote API base URL (required).
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Set the settings store (required).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Set the HTTP client.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the network monitor.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Set the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the cache configuration.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the cache sweep interval.
    pub fn cache_sweep_interval(mut self, interval: Duration) -> Self {
        self.cache_sweep_interval = Some(interval);
        self
    }

    /// Set the sync tunables.
    pub fn sync(mut self, sync: SyncTunables) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CapabilityMissing`] when a required bridge is
    /// absent and [`CoreError::InvalidConfig`] for malformed settings.
    pub fn build(self) -> Result<CoreConfig> {
        let api_base_url = self
            .api_base_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                CoreError::InvalidConfig("api_base_url is required and must be non-empty".into())
            })?;

        let settings_store = self.settings_store.ok_or_else(|| CoreError::CapabilityMissing {
            capability: "SettingsStore".to_string(),
            message: "No settings store implementation provided. \
                      Desktop: use bridge_desktop::SqliteSettingsStore. \
                      Mobile: inject a platform-native adapter."
                .to_string(),
        })?;

        Ok(CoreConfig {
            api_base_url,
            settings_store,
            http_client: self.http_client,
            network_monitor: self.network_monitor,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            cache: self.cache.unwrap_or_default(),
            cache_sweep_interval: self
                .cache_sweep_interval
                .unwrap_or(Duration::from_secs(60)),
            sync: self.sync.unwrap_or_default(),
        })
    }
}
