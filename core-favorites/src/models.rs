//! Favorites domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SyncError};

/// Server-assigned word identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(String);

impl WordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A favorited word with the user's annotations.
///
/// The device's copy is provisional until reconciled; the remote system owns
/// the authoritative copy once synchronized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteWord {
    /// Word identity
    pub word_id: WordId,
    /// The word itself, denormalized for offline display
    pub headword: String,
    /// User collection this word belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Free-form user notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Unix timestamp when the word was favorited
    pub added_at: i64,
}

/// Type-safe pending action identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(Uuid);

impl ActionId {
    /// Create a new random action ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an action ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SyncError::Serialization(format!("invalid action id: {}", e)))
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of pending favorites mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Add the word to the user's favorites
    Add,
    /// Remove the word from the user's favorites
    Remove,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            _ => Err(SyncError::Serialization(format!(
                "unknown action kind: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A favorites mutation waiting to be confirmed by the remote API.
///
/// Created when the user toggles a favorite without a confirmed connection;
/// destroyed when applied remotely or when its retries are exhausted (in
/// which case it is surfaced in [`SyncResult::errors`], never dropped
/// silently).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Unique identifier
    pub id: ActionId,
    /// Mutation kind
    pub kind: ActionKind,
    /// Target word
    pub word_id: WordId,
    /// Unix timestamp when the action was created
    pub created_at: i64,
    /// Number of failed sync attempts so far
    pub retry_count: u32,
    /// Attempts before the action is reported instead of retried
    pub max_retries: u32,
}

impl PendingAction {
    /// Create a new pending action.
    pub fn new(kind: ActionKind, word_id: WordId, max_retries: u32, created_at: i64) -> Self {
        Self {
            id: ActionId::new(),
            kind,
            word_id,
            created_at,
            retry_count: 0,
            max_retries,
        }
    }

    /// Whether the action may be attempted again after a transient failure.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

/// Outcome of one drain or resync pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    /// True when every processed action succeeded
    pub success: bool,
    /// Actions confirmed by the remote API
    pub synced: usize,
    /// Actions that failed terminally during this pass
    pub failed: usize,
    /// Human-readable descriptions of terminal failures and pass-level errors
    pub errors: Vec<String>,
}

impl SyncResult {
    /// A pass that processed nothing and failed for `reason`.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            synced: 0,
            failed: 0,
            errors: vec![reason.into()],
        }
    }
}

/// Derived sync state for the UI. Computed on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Whether the connectivity probe currently succeeds
    pub is_online: bool,
    /// Whether a drain is in flight
    pub is_syncing: bool,
    /// Number of actions waiting in the queue
    pub pending_count: usize,
    /// When the last drain finished
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Most recent sync failure, cleared by a clean pass
    pub last_error: Option<String>,
}
