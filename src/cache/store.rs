//! Cache Store Module
//!
//! Bounded, thread-safe cache combining a key index with a recency list and
//! lazy TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::cache::{CacheEntry, CacheStats, NodeId, RecencyList};

// == Cache State ==
/// Everything guarded by the cache lock. Index and list change together.
#[derive(Debug)]
struct CacheState<V> {
    /// Key to recency-list node
    index: HashMap<String, NodeId>,
    /// Entries ordered from most to least recently used
    order: RecencyList<CacheEntry<V>>,
    stats: CacheStats,
}

impl<V> CacheState<V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            order: RecencyList::new(),
            stats: CacheStats::new(),
        }
    }

    fn unlink(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let id = self.index.remove(key)?;
        self.order.remove(id)
    }
}

// == Bounded TTL Cache ==
/// Fixed-capacity LRU store with absolute per-entry expiry.
///
/// Every operation runs under one exclusive lock covering the index, the
/// recency list and the statistics. Expired entries are only purged when a
/// lookup finds them; an expired entry that is never read again keeps its
/// slot until capacity pressure pushes it out of the back of the list.
#[derive(Debug)]
pub struct BoundedTtlCache<V = Bytes> {
    state: Mutex<CacheState<V>>,
    /// Maximum number of live entries
    capacity: usize,
    /// Lifetime of an entry measured from insertion
    ttl: Duration,
}

impl<V: Clone> BoundedTtlCache<V> {
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries; 0 makes every `put` self-evict
    /// * `ttl` - Entry lifetime; an age equal to the TTL already counts as expired
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::new()),
            capacity,
            ttl,
        }
    }

    // == Get ==
    /// Looks up a live entry and marks it most recently used.
    ///
    /// An entry whose age has reached the TTL is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = Instant::now();
        let mut state = self.state.lock();

        let id = match state.index.get(key).copied() {
            Some(id) => id,
            None => {
                state.stats.record_miss();
                return None;
            }
        };

        let expired = state
            .order
            .get(id)
            .map_or(true, |entry| entry.is_expired(self.ttl, now));

        if expired {
            state.unlink(key);
            state.stats.record_expiration();
            let remaining = state.index.len();
            state.stats.set_total_entries(remaining);
            trace!("Expired cache entry {}", key);
            return None;
        }

        state.order.move_to_front(id);
        state.stats.record_hit();
        state.order.get(id).cloned()
    }

    // == Put ==
    /// Inserts an entry at the front of the recency list, stamped with now.
    ///
    /// An existing entry under the same key is replaced rather than left
    /// behind as an unreachable node. If the list then holds more than
    /// `capacity` entries, exactly one entry is evicted from the back,
    /// whatever its TTL state.
    pub fn put(&self, key: impl Into<String>, payload: V) {
        let key = key.into();
        let entry = CacheEntry::new(key.clone(), payload);
        let mut state = self.state.lock();

        if state.unlink(&key).is_some() {
            trace!("Replacing cache entry {}", key);
        }

        let id = state.order.push_front(entry);
        state.index.insert(key, id);

        if state.order.len() > self.capacity {
            if let Some(evicted) = state.order.pop_back() {
                state.index.remove(&evicted.key);
                state.stats.record_eviction();
                trace!("Evicted cache entry {}", evicted.key);
            }
        }

        let total = state.index.len();
        state.stats.set_total_entries(total);
    }

    // == Remove ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.unlink(key).is_some();
        let total = state.index.len();
        state.stats.set_total_entries(total);
        removed
    }

    /// Removes an entry whose payload turned out to be unusable after `get`
    /// returned it, recounting that lookup as a miss.
    pub fn discard_hit(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.unlink(key).is_some();
        if removed {
            state.stats.reclassify_hit_as_miss();
        }
        let total = state.index.len();
        state.stats.set_total_entries(total);
        removed
    }

    // == Clear ==
    /// Drops every entry and returns how many were held.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.index.len();
        state.index.clear();
        state.order.clear();
        state.stats.set_total_entries(0);
        count
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats.clone()
    }

    /// Number of entries currently held, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Checks that the index and the recency list describe the same key set.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let state = self.state.lock();
        if state.index.len() != state.order.len() {
            return false;
        }
        state.order.iter().all(|entry| {
            state
                .index
                .get(&entry.key)
                .and_then(|&id| state.order.get(id))
                .is_some_and(|indexed| indexed.key == entry.key)
        })
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<String> {
        let state = self.state.lock();
        state.order.iter().map(|entry| entry.key.clone()).collect()
    }
}
