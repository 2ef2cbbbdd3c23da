//! Periodic expired-entry sweep.
//!
//! Lazy expiry only reclaims entries that are read again; keys that are
//! written once and never touched would otherwise sit in memory until
//! eviction. The sweeper runs [`MemoryCache::clear_expired`] on a fixed
//! interval, independent of reads.
//!
//! [`MemoryCache::clear_expired`]: crate::cache::MemoryCache::clear_expired

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{lock, SharedCache};

/// Handle to a running sweeper task.
///
/// The sweep stops when [`stop`](SweeperHandle::stop) is called or the handle
/// is dropped, so the task's lifetime is tied to its owner.
pub struct SweeperHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper.
    pub fn stop(self) {
        self.token.cancel();
        self.task.abort();
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawn a task that sweeps `cache` every `period`.
///
/// The first sweep happens one full period after start.
pub fn spawn_sweeper<T: Send + 'static>(
    cache: SharedCache<T>,
    period: Duration,
) -> SweeperHandle {
    let period = period.max(Duration::from_millis(1));
    let token = CancellationToken::new();
    let child = token.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first tick completes immediately; consume it
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = child.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = lock(&cache).clear_expired();
                    if removed > 0 {
                        debug!(removed, "Sweeper removed expired cache entries");
                    }
                }
            }
        }

        debug!("Cache sweeper stopped");
    });

    debug!(period = ?period, "Cache sweeper started");
    SweeperHandle { token, task }
}
