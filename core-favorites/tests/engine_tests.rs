//! Integration tests for the sync queue engine.
//!
//! These tests verify the end-to-end drain workflow:
//! - Per-word coalescing of queued actions
//! - Retry bookkeeping and terminal-failure reporting
//! - Offline short-circuit
//! - Non-reentrant drain
//! - Queue persistence across engine restarts
//! - Full resync conflict resolution against the pending queue
//! - Auto-sync lifecycle

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::storage::SettingsStore;
use bridge_traits::time::SystemClock;
use core_cache::{CacheConfig, MemoryCache, SharedCache};
use core_favorites::{
    ActionKind, FavoriteWord, FavoritesApi, FavoritesStore, Result, SyncEngine, SyncEngineConfig,
    SyncError, WordId, FAVORITES_CACHE_KEY,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock Implementations
// ============================================================================

struct MemorySettingsStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(HashMap::new()),
        })
    }

    fn raw(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().get(key).cloned()
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

/// Scripted remote API: counts calls, optionally fails or delays mutations.
struct ScriptedApi {
    online: AtomicBool,
    mutation_calls: AtomicUsize,
    ping_calls: AtomicUsize,
    mutation_error: Mutex<Option<SyncError>>,
    mutation_delay: Mutex<Option<Duration>>,
    remote_snapshot: Mutex<Vec<FavoriteWord>>,
}

impl ScriptedApi {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
            mutation_calls: AtomicUsize::new(0),
            ping_calls: AtomicUsize::new(0),
            mutation_error: Mutex::new(None),
            mutation_delay: Mutex::new(None),
            remote_snapshot: Mutex::new(Vec::new()),
        })
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn fail_mutations_with(&self, error: SyncError) {
        *self.mutation_error.lock().unwrap() = Some(error);
    }

    fn succeed_mutations(&self) {
        *self.mutation_error.lock().unwrap() = None;
    }

    fn delay_mutations(&self, delay: Duration) {
        *self.mutation_delay.lock().unwrap() = Some(delay);
    }

    fn set_remote(&self, words: Vec<FavoriteWord>) {
        *self.remote_snapshot.lock().unwrap() = words;
    }

    fn mutations(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }

    fn pings(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }

    async fn mutate(&self) -> Result<()> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.mutation_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let error = self.mutation_error.lock().unwrap().clone();
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FavoritesApi for ScriptedApi {
    async fn add_favorite(&self, _word_id: &WordId) -> Result<()> {
        self.mutate().await
    }

    async fn remove_favorite(&self, _word_id: &WordId) -> Result<()> {
        self.mutate().await
    }

    async fn fetch_favorites(&self) -> Result<Vec<FavoriteWord>> {
        Ok(self.remote_snapshot.lock().unwrap().clone())
    }

    async fn ping(&self) -> Result<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::Network("probe failed".to_string()))
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn test_config() -> SyncEngineConfig {
    SyncEngineConfig {
        batch_size: 10,
        batch_delay: Duration::from_millis(1),
        auto_sync_interval: Duration::from_millis(25),
        probe_timeout: Duration::from_millis(200),
        request_timeout: Duration::from_millis(200),
        max_retries: 3,
    }
}

fn word(id: &str) -> FavoriteWord {
    FavoriteWord {
        word_id: WordId::from(id),
        headword: id.to_string(),
        collection: None,
        notes: None,
        added_at: 1_700_000_000,
    }
}

async fn build_engine(
    api: Arc<ScriptedApi>,
    settings: Arc<MemorySettingsStore>,
    config: SyncEngineConfig,
) -> (Arc<SyncEngine>, SharedCache<Vec<FavoriteWord>>) {
    let clock = Arc::new(SystemClock);
    let cache = core_cache::shared(MemoryCache::new(CacheConfig::default(), clock.clone()));
    let store = FavoritesStore::new(settings);

    let engine = Arc::new(
        SyncEngine::new(config, api, store, cache.clone(), None, clock).await,
    );
    (engine, cache)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_enqueue_coalesces_per_word() {
    let api = ScriptedApi::new();
    let settings = MemorySettingsStore::new();
    let (engine, _cache) = build_engine(api, settings, test_config()).await;

    engine
        .enqueue(ActionKind::Add, WordId::from("w1"))
        .await
        .unwrap();
    engine
        .enqueue(ActionKind::Remove, WordId::from("w1"))
        .await
        .unwrap();

    let pending = engine.pending_actions().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, ActionKind::Remove);
    assert_eq!(pending[0].word_id, WordId::from("w1"));
}

#[tokio::test]
async fn test_drain_confirms_and_empties_queue() {
    let api = ScriptedApi::new();
    let settings = MemorySettingsStore::new();
    let (engine, _cache) = build_engine(api.clone(), settings.clone(), test_config()).await;

    engine
        .enqueue(ActionKind::Add, WordId::from("w1"))
        .await
        .unwrap();
    engine
        .enqueue(ActionKind::Add, WordId::from("w2"))
        .await
        .unwrap();

    let result = engine.drain_pending().await;

    assert!(result.success);
    assert_eq!(result.synced, 2);
    assert_eq!(result.failed, 0);
    assert!(result.errors.is_empty());
    assert_eq!(api.mutations(), 2);
    assert!(engine.pending_actions().await.is_empty());

    let status = engine.status().await;
    assert!(status.last_sync_at.is_some());
    assert_eq!(status.last_error, None);
    // the timestamp is persisted for the next launch
    assert!(settings.raw("last_sync_at").is_some());
}

#[tokio::test]
async fn test_retry_exhaustion_is_surfaced_not_looped() {
    let api = ScriptedApi::new();
    api.fail_mutations_with(SyncError::RemoteStatus {
        status: 503,
        message: "unavailable".to_string(),
    });
    let settings = MemorySettingsStore::new();
    let config = SyncEngineConfig {
        max_retries: 2,
        ..test_config()
    };
    let (engine, _cache) = build_engine(api.clone(), settings, config).await;

    engine
        .enqueue(ActionKind::Add, WordId::from("w1"))
        .await
        .unwrap();

    // first drain: transient failure, the action stays queued
    let first = engine.drain_pending().await;
    assert!(!first.success);
    assert!(first.errors.is_empty());
    let pending = engine.pending_actions().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].retry_count, 1);

    // second drain exhausts the retries: removed and reported
    let second = engine.drain_pending().await;
    assert!(!second.success);
    assert_eq!(second.failed, 1);
    assert_eq!(second.errors.len(), 1);
    assert!(second.errors[0].contains("w1"));
    assert!(engine.pending_actions().await.is_empty());

    // third drain must not attempt the action again
    let before = api.mutations();
    let third = engine.drain_pending().await;
    assert!(third.success);
    assert_eq!(api.mutations(), before);
}

#[tokio::test]
async fn test_terminal_failure_is_not_retried() {
    let api = ScriptedApi::new();
    api.fail_mutations_with(SyncError::RemoteStatus {
        status: 404,
        message: "no such word".to_string(),
    });
    let settings = MemorySettingsStore::new();
    let (engine, _cache) = build_engine(api.clone(), settings, test_config()).await;

    engine
        .enqueue(ActionKind::Add, WordId::from("bogus"))
        .await
        .unwrap();

    let result = engine.drain_pending().await;

    assert!(!result.success);
    assert_eq!(result.failed, 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("bogus"));
    assert!(engine.pending_actions().await.is_empty());
    assert_eq!(api.mutations(), 1);

    // gone for good: nothing left to retry
    engine.drain_pending().await;
    assert_eq!(api.mutations(), 1);
}

#[tokio::test]
async fn test_offline_drain_leaves_queue_untouched() {
    let api = ScriptedApi::new();
    api.set_online(false);
    let settings = MemorySettingsStore::new();
    let (engine, _cache) = build_engine(api.clone(), settings, test_config()).await;

    engine
        .enqueue(ActionKind::Add, WordId::from("w1"))
        .await
        .unwrap();

    let result = engine.drain_pending().await;

    assert!(!result.success);
    assert_eq!(result.errors, vec!["device is offline".to_string()]);
    assert_eq!(api.mutations(), 0);

    let pending = engine.pending_actions().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].retry_count, 0);

    let status = engine.status().await;
    assert!(!status.is_online);
    assert_eq!(status.last_error, Some("device is offline".to_string()));
}

#[tokio::test]
async fn test_concurrent_drain_is_rejected() {
    let api = ScriptedApi::new();
    api.delay_mutations(Duration::from_millis(50));
    let settings = MemorySettingsStore::new();
    let (engine, _cache) = build_engine(api.clone(), settings, test_config()).await;

    engine
        .enqueue(ActionKind::Add, WordId::from("w1"))
        .await
        .unwrap();

    let (first, second) = tokio::join!(engine.drain_pending(), engine.drain_pending());

    // exactly one drain reached the network
    assert_eq!(api.mutations(), 1);
    assert!(first.success);
    assert_eq!(first.synced, 1);
    assert!(!second.success);
    assert_eq!(second.errors, vec!["sync in progress".to_string()]);

    // the guard was released: a later drain runs normally
    let third = engine.drain_pending().await;
    assert!(third.success);
}

#[tokio::test]
async fn test_drain_invalidates_favorites_cache() {
    let api = ScriptedApi::new();
    let settings = MemorySettingsStore::new();
    let (engine, cache) = build_engine(api, settings, test_config()).await;

    core_cache::lock(&cache).insert(FAVORITES_CACHE_KEY, vec![word("stale")]);
    engine
        .enqueue(ActionKind::Add, WordId::from("w1"))
        .await
        .unwrap();

    engine.drain_pending().await;

    assert!(core_cache::lock(&cache).get(FAVORITES_CACHE_KEY).is_none());
}

#[tokio::test]
async fn test_queue_survives_engine_restart() {
    let api = ScriptedApi::new();
    api.fail_mutations_with(SyncError::RemoteStatus {
        status: 503,
        message: "unavailable".to_string(),
    });
    let settings = MemorySettingsStore::new();

    {
        let (engine, _cache) =
            build_engine(api.clone(), settings.clone(), test_config()).await;
        engine
            .enqueue(ActionKind::Add, WordId::from("w1"))
            .await
            .unwrap();
        engine
            .enqueue(ActionKind::Remove, WordId::from("w2"))
            .await
            .unwrap();
        // one failed drain to accumulate retry counts
        engine.drain_pending().await;
    }

    // a fresh engine over the same store sees the same queue, counts included
    let (revived, _cache) = build_engine(api, settings, test_config()).await;
    let pending = revived.pending_actions().await;

    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|a| a.retry_count == 1));
    assert!(pending
        .iter()
        .any(|a| a.word_id == WordId::from("w2") && a.kind == ActionKind::Remove));
}

#[tokio::test]
async fn test_corrupt_persisted_queue_degrades_to_empty() {
    let api = ScriptedApi::new();
    let settings = MemorySettingsStore::new();
    settings
        .set_string("sync_queue", "{not valid json")
        .await
        .unwrap();

    let (engine, _cache) = build_engine(api, settings, test_config()).await;
    assert!(engine.pending_actions().await.is_empty());
}

#[tokio::test]
async fn test_optimistic_toggle_applies_before_any_drain() {
    let api = ScriptedApi::new();
    api.set_online(false);
    let settings = MemorySettingsStore::new();
    let (engine, _cache) = build_engine(api, settings, test_config()).await;

    engine.favorite(word("w1")).await.unwrap();

    let snapshot = engine.local_snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].word_id, WordId::from("w1"));

    let pending = engine.pending_actions().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, ActionKind::Add);

    // undo while still offline: snapshot reverts, queue coalesces to the
    // latest intent
    engine.unfavorite(&WordId::from("w1")).await.unwrap();

    assert!(engine.local_snapshot().await.is_empty());
    let pending = engine.pending_actions().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, ActionKind::Remove);
}

#[tokio::test]
async fn test_full_resync_remote_wins_with_local_extras() {
    let api = ScriptedApi::new();
    let settings = MemorySettingsStore::new();
    let (engine, _cache) = build_engine(api.clone(), settings.clone(), test_config()).await;

    // local truth: a and b, written through the store the engine uses
    FavoritesStore::new(settings.clone())
        .save_snapshot(&[word("a"), word("b")])
        .await
        .unwrap();

    // remote: b with authoritative notes, plus c
    let mut remote_b = word("b");
    remote_b.notes = Some("server note".to_string());
    api.set_remote(vec![remote_b, word("c")]);

    let result = engine.force_full_resync().await;
    assert!(result.success);

    let snapshot = engine.local_snapshot().await;
    let ids: Vec<&str> = snapshot.iter().map(|w| w.word_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
    assert_eq!(snapshot[0].notes, Some("server note".to_string()));
}

#[tokio::test]
async fn test_full_resync_respects_pending_removal() {
    let api = ScriptedApi::new();
    let settings = MemorySettingsStore::new();
    let (engine, _cache) = build_engine(api.clone(), settings, test_config()).await;

    // the user unfavorited "a" offline; the removal is still queued
    engine.favorite(word("a")).await.unwrap();
    engine.drain_pending().await; // confirm the add remotely
    engine.unfavorite(&WordId::from("a")).await.unwrap();

    // the server still lists "a"
    api.set_remote(vec![word("a")]);

    let result = engine.force_full_resync().await;
    assert!(result.success);

    // the in-flight removal is not resurrected by the resync
    assert!(engine.local_snapshot().await.is_empty());
    assert!(engine.pending_actions().await.is_empty());
}

#[tokio::test]
async fn test_mutation_timeout_counts_as_retryable() {
    let api = ScriptedApi::new();
    api.delay_mutations(Duration::from_millis(500));
    let settings = MemorySettingsStore::new();
    let (engine, _cache) = build_engine(api.clone(), settings, test_config()).await;

    engine
        .enqueue(ActionKind::Add, WordId::from("w1"))
        .await
        .unwrap();

    let result = engine.drain_pending().await;

    assert!(!result.success);
    assert!(result.errors.is_empty());
    let pending = engine.pending_actions().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].retry_count, 1);
}

#[tokio::test]
async fn test_auto_sync_lifecycle() {
    let api = ScriptedApi::new();
    let settings = MemorySettingsStore::new();
    let (engine, _cache) = build_engine(api.clone(), settings, test_config()).await;

    engine.start_auto_sync().await;
    // a second start is a no-op, not a second timer
    engine.start_auto_sync().await;

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(api.pings() >= 1);

    engine.stop_auto_sync().await;
    let after_stop = api.pings();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(api.pings(), after_stop);
}
