//! Key-Value Settings Storage Abstraction
//!
//! Provides a platform-agnostic trait for durable key-value storage. The core
//! uses it to persist the pending sync queue, the favorites snapshot and the
//! last sync timestamp so they survive process restarts.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences/settings storage:
/// - iOS: UserDefaults
/// - Android: SharedPreferences / DataStore
/// - Desktop: SQLite or OS-specific preferences
///
/// Values are stored as strings; structured state is serialized by the caller.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_state(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("last_sync_at", "2026-08-05T12:00:00Z").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists without retrieving it
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    ///
    /// Use with caution! This will delete all stored state.
    async fn clear_all(&self) -> Result<()>;
}
