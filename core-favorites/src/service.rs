//! Assembly of the favorites core from a validated configuration.

use core_cache::{spawn_sweeper, MemoryCache, SharedCache, SweeperHandle};
use core_runtime::{CoreConfig, CoreError};
use std::sync::Arc;
use tracing::info;

use crate::api::HttpFavoritesApi;
use crate::engine::{SyncEngine, SyncEngineConfig};
use crate::models::FavoriteWord;
use crate::store::FavoritesStore;

/// Fully wired favorites core: shared cache, sweeper and sync engine.
///
/// Constructed once at process start; consumers receive handles instead of
/// reaching for globals.
pub struct FavoritesCore {
    engine: Arc<SyncEngine>,
    cache: SharedCache<Vec<FavoriteWord>>,
    sweeper: Option<SweeperHandle>,
}

impl FavoritesCore {
    /// Build the core from a validated [`CoreConfig`].
    ///
    /// # Errors
    ///
    /// Fails fast with [`CoreError::CapabilityMissing`] when the HTTP client
    /// bridge is absent.
    pub async fn initialize(config: CoreConfig) -> core_runtime::Result<Self> {
        let http = config
            .http_client
            .clone()
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "HttpClient".to_string(),
                message: "The sync engine requires an HTTP client. \
                          Desktop: use bridge_desktop::ReqwestHttpClient. \
                          Mobile: inject a platform-native adapter."
                    .to_string(),
            })?;

        let cache = core_cache::shared(MemoryCache::new(
            config.cache.clone(),
            config.clock.clone(),
        ));
        let sweeper = spawn_sweeper(cache.clone(), config.cache_sweep_interval);

        let api = Arc::new(HttpFavoritesApi::new(http, config.api_base_url.clone()));
        let store = FavoritesStore::new(config.settings_store.clone());

        let engine = Arc::new(
            SyncEngine::new(
                SyncEngineConfig::from(&config.sync),
                api,
                store,
                cache.clone(),
                config.network_monitor.clone(),
                config.clock.clone(),
            )
            .await,
        );

        info!(base_url = %config.api_base_url, "Favorites core initialized");

        Ok(Self {
            engine,
            cache,
            sweeper: Some(sweeper),
        })
    }

    /// The sync engine handle.
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// The shared favorites cache.
    pub fn cache(&self) -> &SharedCache<Vec<FavoriteWord>> {
        &self.cache
    }

    /// Stop the background tasks (sweeper and auto-sync).
    pub async fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop();
        }
        self.engine.stop_auto_sync().await;
        info!("Favorites core shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bridge_traits::storage::SettingsStore;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemorySettingsStore {
        data: Mutex<HashMap<String, String>>,
    }

    impl MemorySettingsStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                data: Mutex::new(HashMap::new()),
            })
        }
    }

    #[async_trait]
    impl SettingsStore for MemorySettingsStore {
        async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn delete(&self, key: &str) -> BridgeResult<()> {
            self.data.lock().unwrap().remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.data.lock().unwrap().keys().cloned().collect())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            self.data.lock().unwrap().clear();
            Ok(())
        }
    }

    struct UnreachableHttpClient;

    #[async_trait]
    impl HttpClient for UnreachableHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable("http".to_string()))
        }
    }

    #[tokio::test]
    async fn test_initialize_requires_http_client() {
        let config = CoreConfig::builder()
            .api_base_url("https://api.example.com")
            .settings_store(MemorySettingsStore::new())
            .build()
            .unwrap();

        match FavoritesCore::initialize(config).await {
            Err(CoreError::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "HttpClient");
            }
            _ => panic!("expected CapabilityMissing"),
        }
    }

    #[tokio::test]
    async fn test_initialize_and_shutdown() {
        let config = CoreConfig::builder()
            .api_base_url("https://api.example.com")
            .settings_store(MemorySettingsStore::new())
            .http_client(Arc::new(UnreachableHttpClient))
            .build()
            .unwrap();

        let core = FavoritesCore::initialize(config).await.unwrap();
        assert!(core.engine().pending_actions().await.is_empty());

        core.shutdown().await;
    }
}
