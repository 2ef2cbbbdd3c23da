//! # Sync Queue Engine
//!
//! Owns the queue of pending favorites mutations and reconciles them with the
//! remote API.
//!
//! ## Overview
//!
//! Per-action lifecycle: `Pending -> Sent -> {Confirmed | Failed-Retryable ->
//! Pending | Failed-Terminal}`. Confirmed actions leave the queue; retryable
//! failures stay queued with an incremented retry count; exhausted or
//! terminal failures leave the queue and are surfaced in
//! [`SyncResult::errors`].
//!
//! ## Discipline
//!
//! - **Non-reentrant drain**: one sync pass at a time, enforced by an atomic
//!   flag held through an RAII guard so it clears on every exit path.
//! - **Offline short-circuit**: a failed connectivity probe aborts the drain
//!   without touching the queue or the network.
//! - **Coalescing**: actions for the same word collapse to the latest intent;
//!   actions for different words are processed in FIFO batches.
//! - **Durable queue**: the persisted queue is written back after every
//!   enqueue/dequeue so a crash neither loses nor duplicates mutations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use bridge_traits::network::NetworkMonitor;
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_cache::SharedCache;
use core_runtime::SyncTunables;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::FavoritesApi;
use crate::conflict;
use crate::error::{Result, SyncError};
use crate::models::{
    ActionId, ActionKind, FavoriteWord, PendingAction, SyncResult, SyncStatus, WordId,
};
use crate::store::FavoritesStore;

/// Cache key under which the favorites listing is stored.
pub const FAVORITES_CACHE_KEY: &str = "favorites:list";

/// Sync engine configuration
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
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

impl Default for SyncEngineConfig {
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

impl From<&SyncTunables> for SyncEngineConfig {
    fn from(tunables: &SyncTunables) -> Self {
        Self {
            batch_size: tunables.batch_size,
            batch_delay: tunables.batch_delay,
            auto_sync_interval: tunables.auto_sync_interval,
            probe_timeout: tunables.probe_timeout,
            request_timeout: tunables.request_timeout,
            max_retries: tunables.max_retries,
        }
    }
}

/// Running auto-sync timer
struct AutoSync {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Clears the drain flag on every exit path, including panics.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

fn unpoisoned<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sync engine for the user's favorite words.
///
/// Constructed once at process start and shared by handle; all collaborators
/// are injected.
pub struct SyncEngine {
    config: SyncEngineConfig,
    api: Arc<dyn FavoritesApi>,
    store: FavoritesStore,
    cache: SharedCache<Vec<FavoriteWord>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Arc<dyn Clock>,
    /// In-memory queue; the persisted copy is authoritative across restarts
    queue: Mutex<Vec<PendingAction>>,
    draining: AtomicBool,
    last_sync_at: StdMutex<Option<DateTime<Utc>>>,
    last_error: StdMutex<Option<String>>,
    auto_sync: Mutex<Option<AutoSync>>,
}

impl SyncEngine {
    /// Create an engine, restoring the persisted queue and last sync time.
    ///
    /// Corrupt persisted state degrades to empty rather than failing
    /// construction.
    pub async fn new(
        config: SyncEngineConfig,
        api: Arc<dyn FavoritesApi>,
        store: FavoritesStore,
        cache: SharedCache<Vec<FavoriteWord>>,
        network_monitor: Option<Arc<dyn NetworkMonitor>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let queue = store.load_queue().await;
        let last_sync_at = store.load_last_sync().await;

        if !queue.is_empty() {
            info!(pending = queue.len(), "Restored pending sync queue");
        }

        Self {
            config,
            api,
            store,
            cache,
            network_monitor,
            clock,
            queue: Mutex::new(queue),
            draining: AtomicBool::new(false),
            last_sync_at: StdMutex::new(last_sync_at),
            last_error: StdMutex::new(None),
            auto_sync: Mutex::new(None),
        }
    }

    /// Mark a word as favorited.
    ///
    /// The tentative state is applied to the local snapshot and cache
    /// synchronously, then the remote confirmation is queued; the UI never
    /// waits for the network.
    pub async fn favorite(&self, word: FavoriteWord) -> Result<()> {
        let mut snapshot = self.store.load_snapshot().await;
        snapshot.retain(|w| w.word_id != word.word_id);
        snapshot.push(word.clone());
        self.store.save_snapshot(&snapshot).await?;
        core_cache::lock(&self.cache).insert(FAVORITES_CACHE_KEY, snapshot);

        self.enqueue(ActionKind::Add, word.word_id).await
    }

    /// Mark a word as no longer favorited. Local-first like
    /// [`favorite`](Self::favorite).
    pub async fn unfavorite(&self, word_id: &WordId) -> Result<()> {
        let mut snapshot = self.store.load_snapshot().await;
        snapshot.retain(|w| w.word_id != *word_id);
        self.store.save_snapshot(&snapshot).await?;
        core_cache::lock(&self.cache).insert(FAVORITES_CACHE_KEY, snapshot);

        self.enqueue(ActionKind::Remove, word_id.clone()).await
    }

    /// Queue a mutation for the next drain and persist the queue.
    ///
    /// Actions are coalesced per word: a new action replaces any queued
    /// action for the same word, so "add then remove" collapses to the latest
    /// intent and the queue never duplicates network calls.
    pub async fn enqueue(&self, kind: ActionKind, word_id: WordId) -> Result<()> {
        let action = PendingAction::new(
            kind,
            word_id,
            self.config.max_retries,
            self.clock.unix_timestamp(),
        );

        let mut queue = self.queue.lock().await;
        let before = queue.len();
        queue.retain(|a| a.word_id != action.word_id);
        if queue.len() < before {
            debug!(word_id = %action.word_id, "Coalesced queued actions for word");
        }

        info!(
            action_id = %action.id,
            kind = %action.kind,
            word_id = %action.word_id,
            "Enqueued pending action"
        );
        queue.push(action);

        self.store.save_queue(&queue).await
    }

    /// Drain the pending queue against the remote API.
    ///
    /// Non-reentrant: a drain that finds another in flight returns
    /// immediately with a failed result instead of racing it. Offline, the
    /// queue is left untouched and no mutation call is attempted.
    #[instrument(skip(self))]
    pub async fn drain_pending(&self) -> SyncResult {
        let _guard = match self.try_begin_drain() {
            Some(guard) => guard,
            None => {
                debug!("Drain requested while another is in flight");
                return SyncResult::rejected(SyncError::AlreadySyncing.to_string());
            }
        };

        if !self.probe_online().await {
            let offline = SyncError::Offline.to_string();
            self.set_last_error(Some(offline.clone()));
            debug!("Drain skipped: {}", offline);
            return SyncResult::rejected(offline);
        }

        let pending = self.queue.lock().await.clone();
        info!(pending = pending.len(), "Draining pending actions");

        let mut synced = 0usize;
        let mut failed = 0usize;
        let mut deferred = 0usize;
        let mut errors = Vec::new();

        for (index, batch) in pending.chunks(self.config.batch_size.max(1)).enumerate() {
            if index > 0 {
                // spread batches out to stay under remote rate limits
                tokio::time::sleep(self.config.batch_delay).await;
            }

            for action in batch {
                match self.execute_action(action).await {
                    Ok(()) => {
                        synced += 1;
                        self.finish_action(action.id).await;
                        debug!(
                            action_id = %action.id,
                            word_id = %action.word_id,
                            "Action confirmed remotely"
                        );
                    }
                    Err(e) if e.is_retryable() => {
                        if let Some(exhausted) = self.record_retry(action.id).await {
                            failed += 1;
                            errors.push(format!(
                                "{} {} failed after {} attempts: {}",
                                exhausted.kind, exhausted.word_id, exhausted.retry_count, e
                            ));
                            warn!(
                                action_id = %action.id,
                                word_id = %action.word_id,
                                retry_count = exhausted.retry_count,
                                error = %e,
                                "Action failed permanently after max retries"
                            );
                        } else {
                            deferred += 1;
                            warn!(
                                action_id = %action.id,
                                word_id = %action.word_id,
                                error = %e,
                                "Action failed, will retry next drain"
                            );
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        self.finish_action(action.id).await;
                        errors.push(format!("{} {} failed: {}", action.kind, action.word_id, e));
                        warn!(
                            action_id = %action.id,
                            word_id = %action.word_id,
                            error = %e,
                            "Action failed terminally"
                        );
                    }
                }
            }
        }

        // the cached favorites listing may be stale now; the next read must
        // refetch authoritative data
        core_cache::lock(&self.cache).remove(FAVORITES_CACHE_KEY);

        let now = self.clock.now();
        *unpoisoned(&self.last_sync_at) = Some(now);
        if let Err(e) = self.store.save_last_sync(now).await {
            warn!(error = %e, "Failed to persist last sync timestamp");
        }

        if let Some(last) = errors.last() {
            self.set_last_error(Some(last.clone()));
        } else if deferred > 0 {
            self.set_last_error(Some(format!("{} actions deferred for retry", deferred)));
        } else {
            self.set_last_error(None);
        }

        info!(synced, failed, deferred, "Drain finished");
        SyncResult {
            success: errors.is_empty() && deferred == 0,
            synced,
            failed,
            errors,
        }
    }

    /// Fetch the remote snapshot, reconcile it with local state and the
    /// pending queue, persist the result as the new local truth, then drain
    /// whatever is still queued.
    #[instrument(skip(self))]
    pub async fn force_full_resync(&self) -> SyncResult {
        info!("Starting full resync");

        let remote = match self.with_timeout(self.api.fetch_favorites()).await {
            Ok(remote) => remote,
            Err(e) => {
                let message = format!("resync fetch failed: {}", e);
                self.set_last_error(Some(message.clone()));
                warn!(error = %e, "Full resync aborted");
                return SyncResult::rejected(message);
            }
        };

        let local = self.store.load_snapshot().await;
        let pending = self.queue.lock().await.clone();
        let resolved = conflict::resolve_with_pending(&local, &remote, &pending);

        debug!(
            remote = remote.len(),
            local = local.len(),
            resolved = resolved.len(),
            "Resolved favorites snapshots"
        );

        if let Err(e) = self.store.save_snapshot(&resolved).await {
            let message = format!("resync persist failed: {}", e);
            self.set_last_error(Some(message.clone()));
            return SyncResult::rejected(message);
        }

        core_cache::lock(&self.cache).remove(FAVORITES_CACHE_KEY);

        self.drain_pending().await
    }

    /// Start the periodic background drain.
    ///
    /// Idempotent: a second call while running does not create a second
    /// timer.
    pub async fn start_auto_sync(self: &Arc<Self>) {
        let mut slot = self.auto_sync.lock().await;
        if slot.is_some() {
            debug!("Auto-sync already running");
            return;
        }

        let token = CancellationToken::new();
        let child = token.clone();
        let engine = Arc::clone(self);
        let interval = self.config.auto_sync_interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the first tick completes immediately; consume it
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        let result = engine.drain_pending().await;
                        debug!(
                            success = result.success,
                            synced = result.synced,
                            "Auto-sync drain finished"
                        );
                    }
                }
            }
        });

        *slot = Some(AutoSync { token, task });
        info!(interval = ?interval, "Auto-sync started");
    }

    /// Stop the periodic background drain. A drain already in flight runs to
    /// completion first.
    pub async fn stop_auto_sync(&self) {
        let auto = self.auto_sync.lock().await.take();
        if let Some(auto) = auto {
            auto.token.cancel();
            if let Err(e) = auto.task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Auto-sync task ended abnormally");
                }
            }
            info!("Auto-sync stopped");
        }
    }

    /// Derived sync state for the UI.
    pub async fn status(&self) -> SyncStatus {
        SyncStatus {
            is_online: self.probe_online().await,
            is_syncing: self.draining.load(Ordering::SeqCst),
            pending_count: self.queue.lock().await.len(),
            last_sync_at: *unpoisoned(&self.last_sync_at),
            last_error: unpoisoned(&self.last_error).clone(),
        }
    }

    /// Snapshot of the queued actions.
    pub async fn pending_actions(&self) -> Vec<PendingAction> {
        self.queue.lock().await.clone()
    }

    /// Favorites for offline reads: cache first, persisted snapshot on miss.
    pub async fn local_snapshot(&self) -> Vec<FavoriteWord> {
        if let Some(words) = core_cache::lock(&self.cache).get(FAVORITES_CACHE_KEY) {
            return words.clone();
        }

        let words = self.store.load_snapshot().await;
        core_cache::lock(&self.cache).insert(FAVORITES_CACHE_KEY, words.clone());
        words
    }

    fn try_begin_drain(&self) -> Option<DrainGuard<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| DrainGuard {
                flag: &self.draining,
            })
    }

    /// Connectivity check: monitor fast path first, then a bounded probe
    /// against the API's health endpoint. A failed probe means "offline",
    /// never an application error.
    async fn probe_online(&self) -> bool {
        if let Some(monitor) = &self.network_monitor {
            if !monitor.is_connected().await {
                return false;
            }
        }

        matches!(
            tokio::time::timeout(self.config.probe_timeout, self.api.ping()).await,
            Ok(Ok(()))
        )
    }

    async fn execute_action(&self, action: &PendingAction) -> Result<()> {
        self.with_timeout(async {
            match action.kind {
                ActionKind::Add => self.api.add_favorite(&action.word_id).await,
                ActionKind::Remove => self.api.remove_favorite(&action.word_id).await,
            }
        })
        .await
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(
                self.config.request_timeout.as_millis() as u64
            )),
        }
    }

    /// Remove a confirmed or terminally failed action from the queue.
    async fn finish_action(&self, id: ActionId) {
        let mut queue = self.queue.lock().await;
        queue.retain(|a| a.id != id);
        self.persist_queue_best_effort(&queue).await;
    }

    /// Record a failed attempt. Returns the action when its retries are now
    /// exhausted; the action leaves the queue in that case.
    async fn record_retry(&self, id: ActionId) -> Option<PendingAction> {
        let mut queue = self.queue.lock().await;
        let position = queue.iter().position(|a| a.id == id)?;

        queue[position].retry_count += 1;
        let exhausted = if queue[position].can_retry() {
            None
        } else {
            Some(queue.remove(position))
        };

        self.persist_queue_best_effort(&queue).await;
        exhausted
    }

    /// Queue writes inside a drain are best effort; the retry counter is also
    /// persisted here so retries survive restarts.
    async fn persist_queue_best_effort(&self, queue: &[PendingAction]) {
        if let Err(e) = self.store.save_queue(queue).await {
            warn!(error = %e, "Failed to persist sync queue");
        }
    }

    fn set_last_error(&self, message: Option<String>) {
        *unpoisoned(&self.last_error) = message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_guard_clears_flag_on_drop() {
        let flag = AtomicBool::new(true);
        {
            let _guard = DrainGuard { flag: &flag };
        }
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_config_from_tunables() {
        let tunables = SyncTunables::default();
        let config = SyncEngineConfig::from(&tunables);

        assert_eq!(config.batch_size, tunables.batch_size);
        assert_eq!(config.max_retries, tunables.max_retries);
        assert_eq!(config.auto_sync_interval, tunables.auto_sync_interval);
    }
}
