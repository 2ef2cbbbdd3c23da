//! Bounded in-memory cache with TTL expiry and FIFO/LRU eviction.

use bridge_traits::time::Clock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::entry::CacheEntry;

/// Eviction policy applied when an insert would exceed the size bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EvictionPolicy {
    /// Evict the oldest-inserted entry
    Fifo,
    /// Evict the least-recently-touched entry ("touched" = read or written)
    #[default]
    Lru,
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries; inserting beyond this evicts one entry first
    pub max_size: usize,
    /// TTL applied by [`MemoryCache::insert`]; zero means "never expires"
    pub default_ttl: Duration,
    /// Eviction policy
    pub policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 256,
            default_ttl: Duration::from_secs(300),
            policy: EvictionPolicy::Lru,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of stored entries (including expired entries not yet collected)
    pub size: usize,
    /// Number of lookups that returned a value
    pub hits: u64,
    /// Number of lookups that found nothing (missing or expired)
    pub misses: u64,
    /// `hits / (hits + misses)`, 0 when no lookups have occurred
    pub hit_rate: f64,
}

/// A stored entry together with its position in the eviction order.
struct Slot<T> {
    entry: CacheEntry<T>,
    order: u64,
}

/// Process-local bounded key/value cache.
///
/// Eviction order lives in a `BTreeMap` keyed by a monotonically increasing
/// touch counter: the smallest key is always the next eviction victim, so
/// promotion and eviction are index operations rather than scans, and the
/// order never depends on hash iteration.
pub struct MemoryCache<T> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    slots: HashMap<String, Slot<T>>,
    order: BTreeMap<u64, String>,
    next_order: u64,
    hits: u64,
    misses: u64,
}

impl<T> MemoryCache<T> {
    /// Create a cache with the given configuration and time source.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let mut config = config;
        config.max_size = config.max_size.max(1);

        Self {
            config,
            clock,
            slots: HashMap::new(),
            order: BTreeMap::new(),
            next_order: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Insert or overwrite an entry using the configured default TTL.
    ///
    /// May evict another caller's unrelated entry when the cache is full;
    /// callers must not assume long-lived presence of low-priority keys.
    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        let ttl = self.config.default_ttl;
        self.insert_with_ttl(key, value, ttl);
    }

    /// Insert or overwrite an entry with an explicit TTL.
    ///
    /// A zero `ttl` means the entry never expires.
    pub fn insert_with_ttl(&mut self, key: impl Into<String>, value: T, ttl: Duration) {
        let key = key.into();
        let now = self.clock.unix_timestamp_millis();

        if let Some(old) = self.slots.remove(&key) {
            // Overwrite: the entry re-enters the order at the tail
            self.order.remove(&old.order);
        } else if self.slots.len() >= self.config.max_size {
            self.evict_one();
        }

        let order = self.next_order_key();
        self.order.insert(order, key.clone());
        self.slots.insert(
            key,
            Slot {
                entry: CacheEntry::new(value, now, ttl),
                order,
            },
        );
    }

    /// Get a stored value if present and not expired.
    ///
    /// A lazily detected expired entry is removed and counted as a miss.
    /// Under the LRU policy a successful read promotes the entry to most
    /// recently used.
    pub fn get(&mut self, key: &str) -> Option<&T> {
        let now = self.clock.unix_timestamp_millis();

        let expired = match self.slots.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(slot) => slot.entry.is_expired(now),
        };

        if expired {
            self.remove_slot(key);
            self.misses += 1;
            trace!(key, "Removed lazily expired cache entry");
            return None;
        }

        self.hits += 1;
        if self.config.policy == EvictionPolicy::Lru {
            self.promote(key);
        }

        self.slots.get(key).map(|slot| &slot.entry.data)
    }

    /// Whether a non-expired entry exists for `key`.
    ///
    /// Removes a lazily detected expired entry like [`get`](Self::get), but
    /// records no hit/miss and performs no LRU promotion.
    pub fn contains_key(&mut self, key: &str) -> bool {
        let now = self.clock.unix_timestamp_millis();

        let expired = match self.slots.get(key) {
            None => return false,
            Some(slot) => slot.entry.is_expired(now),
        };

        if expired {
            self.remove_slot(key);
            return false;
        }

        true
    }

    /// Remove an entry.
    pub fn remove(&mut self, key: &str) {
        self.remove_slot(key);
    }

    /// Remove all entries and reset the hit/miss counters.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Proactively remove every expired entry, returning how many were
    /// removed.
    ///
    /// Intended to run on a fixed interval (see
    /// [`spawn_sweeper`](crate::sweeper::spawn_sweeper)) so memory does not
    /// grow from unread expired keys.
    pub fn clear_expired(&mut self) -> usize {
        let now = self.clock.unix_timestamp_millis();

        let expired: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let removed = expired.len();
        for key in &expired {
            self.remove_slot(key);
        }

        if removed > 0 {
            debug!(removed, "Cleared expired cache entries");
        }
        removed
    }

    /// Non-expired keys in eviction order (oldest first). Does not mutate.
    pub fn keys(&self) -> Vec<String> {
        let now = self.clock.unix_timestamp_millis();

        self.order
            .values()
            .filter(|key| {
                self.slots
                    .get(*key)
                    .is_some_and(|slot| !slot.entry.is_expired(now))
            })
            .cloned()
            .collect()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        };

        CacheStats {
            size: self.slots.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate,
        }
    }

    /// Replace the configuration.
    ///
    /// Shrinking `max_size` below the current size evicts entries, one per
    /// policy decision, until the bound holds again.
    pub fn configure(&mut self, config: CacheConfig) {
        self.config = config;
        self.config.max_size = self.config.max_size.max(1);

        while self.slots.len() > self.config.max_size {
            self.evict_one();
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn next_order_key(&mut self) -> u64 {
        let key = self.next_order;
        self.next_order += 1;
        key
    }

    /// Evict the entry at the front of the order index.
    fn evict_one(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.slots.remove(&key);
            debug!(key = %key, "Evicted cache entry");
        }
    }

    /// Move an entry to the tail of the order index.
    fn promote(&mut self, key: &str) {
        let new_order = self.next_order_key();

        let Some(slot) = self.slots.get_mut(key) else {
            return;
        };
        let old_order = slot.order;
        slot.order = new_order;

        self.order.remove(&old_order);
        self.order.insert(new_order, key.to_string());
    }

    fn remove_slot(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let slot = self.slots.remove(key)?;
        self.order.remove(&slot.order);
        Some(slot.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock advanced by hand so expiry tests never sleep.
    struct ManualClock {
        millis: AtomicI64,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                millis: AtomicI64::new(1_700_000_000_000),
            })
        }

        fn advance(&self, ms: i64) {
            self.millis.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
                .expect("valid timestamp")
        }
    }

    fn lru_cache(max_size: usize) -> (MemoryCache<&'static str>, Arc<ManualClock>) {
        let clock = ManualClock::new();
        let config = CacheConfig {
            max_size,
            default_ttl: Duration::ZERO,
            policy: EvictionPolicy::Lru,
        };
        (MemoryCache::new(config, clock.clone()), clock)
    }

    fn fifo_cache(max_size: usize) -> (MemoryCache<&'static str>, Arc<ManualClock>) {
        let clock = ManualClock::new();
        let config = CacheConfig {
            max_size,
            default_ttl: Duration::ZERO,
            policy: EvictionPolicy::Fifo,
        };
        (MemoryCache::new(config, clock.clone()), clock)
    }

    #[test]
    fn test_size_bound_holds_for_every_insert() {
        let (mut cache, _) = lru_cache(3);

        for i in 0..20 {
            cache.insert(format!("key{}", i), "value");
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let (mut cache, _) = lru_cache(2);

        cache.insert("a", "1");
        cache.insert("b", "2");
        cache.insert("a", "3");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(&"3"));
        assert_eq!(cache.get("b"), Some(&"2"));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (mut cache, clock) = lru_cache(10);

        cache.insert_with_ttl("word", "definition", Duration::from_millis(100));
        assert_eq!(cache.get("word"), Some(&"definition"));

        clock.advance(150);
        assert_eq!(cache.get("word"), None);
        // the expired entry was removed, not just hidden
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_expired_read_counts_as_miss() {
        let (mut cache, clock) = lru_cache(10);

        cache.insert_with_ttl("word", "definition", Duration::from_millis(100));
        clock.advance(150);
        cache.get("word");

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_default_ttl_applies() {
        let clock = ManualClock::new();
        let config = CacheConfig {
            max_size: 10,
            default_ttl: Duration::from_millis(200),
            policy: EvictionPolicy::Lru,
        };
        let mut cache = MemoryCache::new(config, clock.clone());

        cache.insert("word", "definition");
        clock.advance(150);
        assert_eq!(cache.get("word"), Some(&"definition"));

        clock.advance(100);
        assert_eq!(cache.get("word"), None);
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let (mut cache, clock) = lru_cache(10);

        cache.insert_with_ttl("word", "definition", Duration::ZERO);
        clock.advance(1_000_000_000);
        assert_eq!(cache.get("word"), Some(&"definition"));
    }

    #[test]
    fn test_lru_read_promotes() {
        let (mut cache, _) = lru_cache(2);

        cache.insert("a", "1");
        cache.insert("b", "2");
        cache.get("a"); // promotes a over b
        cache.insert("c", "3"); // evicts b

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(&"1"));
        assert_eq!(cache.get("c"), Some(&"3"));
    }

    #[test]
    fn test_fifo_ignores_reads() {
        let (mut cache, _) = fifo_cache(2);

        cache.insert("a", "1");
        cache.insert("b", "2");
        cache.get("a"); // no promotion under FIFO
        cache.insert("c", "3"); // evicts a, the oldest insert

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(&"2"));
        assert_eq!(cache.get("c"), Some(&"3"));
    }

    #[test]
    fn test_hit_rate() {
        let (mut cache, _) = lru_cache(10);

        cache.insert("a", "1");
        cache.get("a");
        cache.get("a");
        cache.get("a");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_rate_zero_without_lookups() {
        let (cache, _) = lru_cache(10);
        assert_eq!(cache.stats().hit_rate, 0.0);
    }

    #[test]
    fn test_contains_key_skips_stats_and_promotion() {
        let (mut cache, clock) = lru_cache(2);

        cache.insert("a", "1");
        cache.insert("b", "2");
        assert!(cache.contains_key("a"));
        assert!(!cache.contains_key("missing"));

        // no hit/miss recorded
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);

        // contains_key did not promote a, so a is still the eviction victim
        cache.insert("c", "3");
        assert!(!cache.contains_key("a"));

        // expired entries are removed on probe
        cache.insert_with_ttl("d", "4", Duration::from_millis(50));
        clock.advance(100);
        assert!(!cache.contains_key("d"));
        assert!(!cache.keys().contains(&"d".to_string()));
    }

    #[test]
    fn test_keys_excludes_expired() {
        let (mut cache, clock) = lru_cache(10);

        cache.insert_with_ttl("short", "1", Duration::from_millis(50));
        cache.insert_with_ttl("long", "2", Duration::from_millis(500));
        clock.advance(100);

        assert_eq!(cache.keys(), vec!["long".to_string()]);
        // keys() is a lazy scan; the expired entry is still stored
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear_resets_counters() {
        let (mut cache, _) = lru_cache(10);

        cache.insert("a", "1");
        cache.get("a");
        cache.get("missing");
        cache.clear();

        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_clear_expired_removes_unread_entries() {
        let (mut cache, clock) = lru_cache(10);

        cache.insert_with_ttl("a", "1", Duration::from_millis(50));
        cache.insert_with_ttl("b", "2", Duration::from_millis(50));
        cache.insert_with_ttl("c", "3", Duration::from_millis(500));
        clock.advance(100);

        let removed = cache.clear_expired();
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("c"), Some(&"3"));
    }

    #[test]
    fn test_configure_shrink_evicts_until_compliant() {
        let (mut cache, _) = lru_cache(5);

        for key in ["a", "b", "c", "d", "e"] {
            cache.insert(key, "value");
        }
        cache.get("a"); // most recently used

        cache.configure(CacheConfig {
            max_size: 2,
            default_ttl: Duration::ZERO,
            policy: EvictionPolicy::Lru,
        });

        assert_eq!(cache.len(), 2);
        // the two most recently touched entries survive
        assert!(cache.contains_key("a"));
        assert!(cache.contains_key("e"));
    }
}
