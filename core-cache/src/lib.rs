//! # Ephemeral Cache
//!
//! Process-local bounded key/value cache with per-entry expiration.
//!
//! ## Overview
//!
//! [`MemoryCache`] keeps server-fetched entities (word definitions, search
//! results, the favorites list) close to the UI without any I/O:
//!
//! - **TTL expiry**: entries become invisible once their deadline passes;
//!   expired entries are removed lazily on read and proactively by the
//!   [`sweeper`](sweeper::spawn_sweeper)
//! - **Bounded size**: inserting into a full cache evicts exactly one entry,
//!   chosen by the configured [`EvictionPolicy`] (FIFO or LRU)
//! - **Stats**: hit/miss counters and hit rate for diagnostics
//!
//! The cache never fails: a missing or expired key is an absent value, not an
//! error. Time comes from an injected [`Clock`](bridge_traits::time::Clock) so
//! expiry is deterministic under test.
//!
//! ## Sharing
//!
//! The cache is shared across the process by constructor injection, not a
//! global. [`SharedCache`] wraps it in `Arc<Mutex<_>>`; all operations are
//! synchronous and short, so a blocking mutex is sufficient.
//!
//! ## Usage
//!
//! ```ignore
//! use core_cache::{CacheConfig, MemoryCache};
//! use bridge_traits::time::SystemClock;
//! use std::sync::Arc;
//!
//! let mut cache = MemoryCache::new(CacheConfig::default(), Arc::new(SystemClock));
//! cache.insert("word:hello", definition);
//! if let Some(def) = cache.get("word:hello") {
//!     // serve from cache
//! }
//! ```

pub mod cache;
pub mod entry;
pub mod sweeper;

pub use cache::{CacheConfig, CacheStats, EvictionPolicy, MemoryCache};
pub use entry::CacheEntry;
pub use sweeper::{spawn_sweeper, SweeperHandle};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A cache shared between the sync engine, the sweeper and UI call sites.
pub type SharedCache<T> = Arc<Mutex<MemoryCache<T>>>;

/// Wrap a cache for process-wide sharing.
pub fn shared<T>(cache: MemoryCache<T>) -> SharedCache<T> {
    Arc::new(Mutex::new(cache))
}

/// Lock a shared cache.
///
/// Recovers from a poisoned mutex: cache operations uphold no cross-call
/// invariants that a panicked holder could have left half-applied.
pub fn lock<T>(cache: &SharedCache<T>) -> MutexGuard<'_, MemoryCache<T>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
