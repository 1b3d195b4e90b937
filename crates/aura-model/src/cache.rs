//! Bounded memoization cache for display formatting

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Default maximum number of entries in a format cache
pub const FORMAT_CACHE_MAX_SIZE: usize = 10_000;

/// Bounded cache for deterministic formatting functions
///
/// Entries are evicted in insertion order (FIFO) once the cache is full. A
/// cache hit does not move the entry, so a hot key inserted early is still
/// the first to go.
#[derive(Debug, Clone)]
pub struct FormatCache<K, V> {
    /// Cached values
    entries: HashMap<K, V>,
    /// Keys in insertion order for FIFO eviction
    order: VecDeque<K>,
    /// Maximum entries to keep (0 disables caching)
    capacity: usize,
}

impl<K, V> FormatCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        // Do not preallocate the full bound, most sessions never reach it
        let initial = capacity.min(1024);
        Self {
            entries: HashMap::with_capacity(initial),
            order: VecDeque::with_capacity(initial),
            capacity,
        }
    }

    /// Get the cached value for `key`, or compute, cache and return it
    pub fn get_or_compute<F>(&mut self, key: K, compute: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(cached) = self.entries.get(&key) {
            return cached.clone();
        }

        let value = compute(&key);

        if self.capacity == 0 {
            return value;
        }

        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }

        self.entries.insert(key.clone(), value.clone());
        self.order.push_back(key);

        value
    }

    /// Check whether `key` is currently cached
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all cached entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

impl<K, V> Default for FormatCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(FORMAT_CACHE_MAX_SIZE)
    }
}
