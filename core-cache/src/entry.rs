//! Cache entry type

use std::time::Duration;

/// A single cached value with its expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub data: T,
    /// Unix timestamp in milliseconds when the entry was stored
    pub stored_at: i64,
    /// Unix timestamp in milliseconds after which the entry is invisible.
    /// `None` means the entry never expires.
    pub expires_at: Option<i64>,
}

impl<T> CacheEntry<T> {
    /// Create an entry stored at `stored_at` with the given time-to-live.
    ///
    /// A zero `ttl` means the entry never expires.
    pub fn new(data: T, stored_at: i64, ttl: Duration) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(stored_at + ttl.as_millis() as i64)
        };

        Self {
            data,
            stored_at,
            expires_at,
        }
    }

    /// Whether the entry has expired at `now_millis`.
    ///
    /// An entry is visible while `now <= expires_at`.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at.is_some_and(|at| now_millis > at)
    }
}
