use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("device is offline")]
    Offline,

    #[error("sync in progress")]
    AlreadySyncing,

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("remote returned HTTP {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    /// Whether the failure is worth another drain attempt.
    ///
    /// Offline, timeouts, transport failures and 5xx/429 responses are
    /// transient; everything else is terminal and must be surfaced, not
    /// retried forever.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Offline | Self::Timeout(_) | Self::Network(_) => true,
            Self::RemoteStatus { status, .. } => *status >= 500 || *status == 429,
            Self::AlreadySyncing | Self::Storage(_) | Self::Serialization(_) => false,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
