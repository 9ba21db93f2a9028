//! Thread-safe keyed cache with optional LRU bound.

use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::RwLock;

use lru::LruCache;
use metrics::counter;

use super::lock;

pub(crate) const METRIC_CACHE_HIT: &str = "iscogram_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "iscogram_cache_miss_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "iscogram_cache_evict_total";

enum Entries<K: Hash + Eq, V> {
    Unbounded(HashMap<K, V>),
    Bounded(LruCache<K, V>),
}

impl<K: Hash + Eq, V> Entries<K, V> {
    fn peek(&self, key: &K) -> Option<&V> {
        match self {
            Entries::Unbounded(map) => map.get(key),
            Entries::Bounded(lru) => lru.peek(key),
        }
    }

    fn touch(&mut self, key: &K) -> Option<&V> {
        match self {
            Entries::Unbounded(map) => map.get(key),
            Entries::Bounded(lru) => lru.get(key),
        }
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self {
            Entries::Unbounded(map) => map.get_mut(key),
            Entries::Bounded(lru) => lru.get_mut(key),
        }
    }

    /// Returns true when the insert pushed out a different key.
    fn insert(&mut self, key: K, value: V) -> bool {
        match self {
            Entries::Unbounded(map) => {
                map.insert(key, value);
                false
            }
            Entries::Bounded(lru) => {
                let evicts = !lru.contains(&key) && lru.len() == lru.cap().get();
                lru.put(key, value);
                evicts
            }
        }
    }

    fn clear(&mut self) {
        match self {
            Entries::Unbounded(map) => map.clear(),
            Entries::Bounded(lru) => lru.clear(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Entries::Unbounded(map) => map.len(),
            Entries::Bounded(lru) => lru.len(),
        }
    }
}

/// A named get/set map shared by concurrent requests.
///
/// Values are cloned out on [`get`](Self::get), so callers never observe a
/// value while another thread is writing it. Every operation holds the lock
/// only for the in-memory map access itself.
///
/// The default cache is unbounded. A bounded cache evicts the least recently
/// used key; eviction only ever removes entries, so a lookup never returns a
/// value that was not set since the last [`clear`](Self::clear).
pub struct KeyedCache<K: Hash + Eq, V> {
    name: &'static str,
    bounded: bool,
    entries: RwLock<Entries<K, V>>,
}

impl<K, V> KeyedCache<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    pub fn unbounded(name: &'static str) -> Self {
        Self {
            name,
            bounded: false,
            entries: RwLock::new(Entries::Unbounded(HashMap::new())),
        }
    }

    pub fn bounded(name: &'static str, capacity: NonZeroUsize) -> Self {
        Self {
            name,
            bounded: true,
            entries: RwLock::new(Entries::Bounded(LruCache::new(capacity))),
        }
    }

    /// Build an unbounded cache, or an LRU-bounded one when a capacity is given.
    pub fn with_capacity(name: &'static str, capacity: Option<NonZeroUsize>) -> Self {
        match capacity {
            Some(capacity) => Self::bounded(name, capacity),
            None => Self::unbounded(name),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &K) -> Option<V> {
        // LRU lookups reorder recency and therefore need the write lock.
        let value = if self.bounded {
            lock::write(&self.entries, self.name, "get")
                .touch(key)
                .cloned()
        } else {
            lock::read(&self.entries, self.name, "get")
                .peek(key)
                .cloned()
        };

        let metric = if value.is_some() {
            METRIC_CACHE_HIT
        } else {
            METRIC_CACHE_MISS
        };
        counter!(metric, "cache" => self.name).increment(1);

        value
    }

    pub fn set(&self, key: K, value: V) {
        let evicted = lock::write(&self.entries, self.name, "set").insert(key, value);
        if evicted {
            counter!(METRIC_CACHE_EVICT, "cache" => self.name).increment(1);
        }
    }

    /// Patch an existing entry in place under a single write lock.
    ///
    /// Returns false, leaving the cache untouched, when the key is absent.
    pub fn update<F>(&self, key: &K, patch: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        let mut entries = lock::write(&self.entries, self.name, "update");
        match entries.get_mut(key) {
            Some(value) => {
                patch(value);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        lock::write(&self.entries, self.name, "clear").clear();
    }

    pub fn len(&self) -> usize {
        lock::read(&self.entries, self.name, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
