//! Durable persisted state for the favorites core.

use bridge_traits::storage::SettingsStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::models::{FavoriteWord, PendingAction};

/// Key holding the serialized pending-action queue
pub const QUEUE_KEY: &str = "sync_queue";
/// Key holding the serialized favorites snapshot (local truth for offline reads)
pub const SNAPSHOT_KEY: &str = "favorites_snapshot";
/// Key holding the RFC 3339 timestamp of the last completed drain
pub const LAST_SYNC_KEY: &str = "last_sync_at";

/// Persistence layer over the platform [`SettingsStore`].
///
/// The persisted queue is the single source of truth for "what must still be
/// synced"; it is written back after every enqueue/dequeue so a process crash
/// neither loses nor duplicates pending mutations. Reads degrade to empty on
/// corruption: local state is a best-effort accelerator, never something the
/// app refuses to start over.
pub struct FavoritesStore {
    settings: Arc<dyn SettingsStore>,
}

impl FavoritesStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Load the pending-action queue, empty when absent or corrupt.
    pub async fn load_queue(&self) -> Vec<PendingAction> {
        self.load_list(QUEUE_KEY).await
    }

    /// Persist the pending-action queue.
    pub async fn save_queue(&self, queue: &[PendingAction]) -> Result<()> {
        self.save_list(QUEUE_KEY, queue).await
    }

    /// Load the favorites snapshot, empty when absent or corrupt.
    pub async fn load_snapshot(&self) -> Vec<FavoriteWord> {
        self.load_list(SNAPSHOT_KEY).await
    }

    /// Persist the favorites snapshot.
    pub async fn save_snapshot(&self, snapshot: &[FavoriteWord]) -> Result<()> {
        self.save_list(SNAPSHOT_KEY, snapshot).await
    }

    /// Load the last sync timestamp, if one was recorded and parses.
    pub async fn load_last_sync(&self) -> Option<DateTime<Utc>> {
        let raw = match self.settings.get_string(LAST_SYNC_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read last sync timestamp");
                return None;
            }
        };

        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(e) => {
                warn!(error = %e, raw, "Discarding malformed last sync timestamp");
                None
            }
        }
    }

    /// Persist the last sync timestamp as RFC 3339.
    pub async fn save_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
        self.settings
            .set_string(LAST_SYNC_KEY, &at.to_rfc3339())
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))
    }

    async fn load_list<T: serde::de::DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.settings.get_string(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key, error = %e, "Failed to read persisted state, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(e) => {
                warn!(key, error = %e, "Discarding corrupt persisted state");
                Vec::new()
            }
        }
    }

    async fn save_list<T: serde::Serialize>(&self, key: &str, list: &[T]) -> Result<()> {
        let raw = serde_json::to_string(list)?;
        self.settings
            .set_string(key, &raw)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        debug!(key, "Persisted state");
        Ok(())
    }
}
