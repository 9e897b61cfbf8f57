//! Least Recently Used (LRU) Cache Implementation
//!
//! A fixed-capacity, thread-safe LRU cache with O(1) `get` and `set`.
//!
//! # Algorithm
//!
//! Entries sit in a doubly linked recency list, most recently used at the
//! front. A hash map points from each key to its node. Every hit and every
//! `set` moves the node to the front; inserting a new key into a full cache
//! first drops the node at the back.
//!
//! ```text
//!   map: "b" ─┐   "a" ─┐          "c" ─┐
//!             ▼        ▼               ▼
//!   HEAD ⇄ [ b ] ⇄ [ a ] ⇄ ... ⇄ [ c ] ⇄ TAIL
//!          MRU                    LRU (next victim)
//! ```
//!
//! # Performance Characteristics
//!
//! - **Time Complexity**: `get` and `set` are O(1) expected
//! - **Space Complexity**: O(capacity); evicted nodes are recycled, so a warm
//!   cache stops allocating for its own bookkeeping
//!
//! # Thread Safety
//!
//! [`LruCache`] keeps the whole structure behind a single
//! `parking_lot::Mutex`. Operations are linearizable and hold the lock only
//! for the map and list update plus one `V::clone` on a hit. Recency order is
//! global, unlike a sharded cache where each shard evicts on its own.

use crate::list::{List, Slot, PREALLOC_LIMIT};
use crate::metrics::{CacheMetrics, CoreCacheMetrics};
use crate::traits::Cache;
use core::borrow::Borrow;
use core::fmt;
use core::hash::Hash;
use core::num::NonZeroUsize;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::trace;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// An entry a [`LruSegment::put`] pushed out of the segment.
///
/// Handed back to the caller so it is dropped after the lock is released.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Displaced<K, V> {
    /// The previous pair stored under the key that was just set.
    Replaced(K, V),
    /// The least recently used pair, evicted to make room for a new key.
    Evicted(K, V),
}

/// Single-threaded LRU algorithm.
///
/// [`LruCache`] wraps one of these in a mutex. All eviction logic lives here.
pub(crate) struct LruSegment<K, V> {
    list: List<(K, V)>,
    map: HashMap<K, Slot>,
    metrics: CoreCacheMetrics,
}

impl<K: Hash + Eq + Clone, V> LruSegment<K, V> {
    pub(crate) fn new(cap: NonZeroUsize) -> Self {
        LruSegment {
            list: List::new(cap),
            map: HashMap::with_capacity(cap.get().min(PREALLOC_LIMIT)),
            metrics: CoreCacheMetrics::default(),
        }
    }

    #[inline]
    pub(crate) fn cap(&self) -> NonZeroUsize {
        self.list.cap()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn metrics(&self) -> &CoreCacheMetrics {
        &self.metrics
    }

    /// Looks up `key` and, on a hit, marks it most recently used.
    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let Some(&slot) = self.map.get(key) else {
            self.metrics.record_miss();
            return None;
        };
        self.list.move_to_front(slot);
        self.metrics.record_hit();
        self.list.get(slot).map(|(_, v)| v)
    }

    /// Inserts or updates `key`, marking it most recently used.
    ///
    /// Returns the entry pushed out by the call: the previous pair when `key`
    /// was already present, or the least recently used pair evicted to make
    /// room. Updating a key that is already present never evicts.
    pub(crate) fn put(&mut self, key: K, value: V) -> Option<Displaced<K, V>> {
        if let Some(&slot) = self.map.get(&key) {
            self.list.move_to_front(slot);
            self.metrics.record_update();
            return self
                .list
                .update(slot, (key, value))
                .map(|(old_key, old_value)| Displaced::Replaced(old_key, old_value));
        }

        let mut evicted = None;
        if self.list.is_full() {
            if let Some((old_key, old_value)) = self.list.remove_last() {
                self.map.remove(&old_key);
                self.metrics.record_eviction();
                evicted = Some(Displaced::Evicted(old_key, old_value));
            }
        }

        if let Some(slot) = self.list.add((key.clone(), value)) {
            self.map.insert(key, slot);
            self.metrics.record_insertion();
        }

        evicted
    }
}

impl<K, V> fmt::Debug for LruSegment<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruSegment")
            .field("capacity", &self.list.cap())
            .field("len", &self.map.len())
            .finish()
    }
}

/// A thread-safe, fixed-capacity Least Recently Used cache keyed by `String`.
///
/// Obtain one through [`create_cache`](crate::create_cache).
///
/// # Examples
///
/// ```
/// use cache_aside::config::LruCacheConfig;
/// use cache_aside::create_cache;
///
/// let cache = create_cache(&LruCacheConfig::new(2)).unwrap();
///
/// cache.set("apple".to_string(), 1);
/// cache.set("banana".to_string(), 2);
///
/// // Accessing items updates their recency
/// assert_eq!(cache.get("apple"), Some(1));
///
/// // Adding beyond capacity evicts the least recently used item
/// cache.set("cherry".to_string(), 3);
/// assert_eq!(cache.get("banana"), None);
/// assert_eq!(cache.get("apple"), Some(1));
/// assert_eq!(cache.get("cherry"), Some(3));
/// ```
pub struct LruCache<V> {
    segment: Mutex<LruSegment<String, V>>,
}

impl<V> LruCache<V> {
    pub(crate) fn new(cap: NonZeroUsize) -> Self {
        LruCache {
            segment: Mutex::new(LruSegment::new(cap)),
        }
    }

    /// Maximum number of entries the cache holds.
    pub fn capacity(&self) -> NonZeroUsize {
        self.segment.lock().cap()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.segment.lock().len()
    }

    /// Stores `value` under `key` and marks it most recently used.
    ///
    /// If `key` is new and the cache is full, the least recently used entry
    /// is evicted first. Replacing the value of an existing key never evicts.
    pub fn set(&self, key: String, value: V) {
        let displaced = self.segment.lock().put(key, value);
        if let Some(Displaced::Evicted(evicted_key, _)) = &displaced {
            trace!(key = %evicted_key, "evicted least recently used entry");
        }
    }
}

impl<V: Clone> LruCache<V> {
    /// Returns a clone of the value stored under `key`, marking it most
    /// recently used. A miss has no effect on the cache contents.
    pub fn get(&self, key: &str) -> Option<V> {
        self.segment.lock().get(key).cloned()
    }
}

impl<V: Clone> Cache<V> for LruCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        LruCache::get(self, key)
    }

    fn set(&self, key: String, value: V) {
        LruCache::set(self, key, value)
    }
}

impl<V> CacheMetrics for LruCache<V> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        let segment = self.segment.lock();
        let mut metrics = segment.metrics().to_btreemap();
        metrics.insert("capacity".to_string(), segment.cap().get() as f64);
        metrics.insert("len".to_string(), segment.len() as f64);
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        "LRU"
    }
}

impl<V> fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segment = self.segment.lock();
        f.debug_struct("LruCache")
            .field("capacity", &segment.cap())
            .field("len", &segment.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(cap: usize) -> LruSegment<&'static str, i32> {
        LruSegment::new(NonZeroUsize::new(cap).unwrap())
    }

    fn cache<V>(cap: usize) -> LruCache<V> {
        LruCache::new(NonZeroUsize::new(cap).unwrap())
    }

    fn recency_order(segment: &LruSegment<&'static str, i32>) -> Vec<&'static str> {
        segment.list.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_lru_get_put() {
        let mut segment = segment(2);
        assert_eq!(segment.put("apple", 1), None);
        assert_eq!(segment.put("banana", 2), None);
        assert_eq!(segment.get("apple"), Some(&1));
        assert_eq!(segment.get("banana"), Some(&2));
        assert_eq!(segment.get("cherry"), None);
        assert_eq!(segment.put("apple", 3), Some(Displaced::Replaced("apple", 1)));
        assert_eq!(segment.get("apple"), Some(&3));
        assert_eq!(segment.put("cherry", 4), Some(Displaced::Evicted("banana", 2)));
        assert_eq!(segment.get("banana"), None);
        assert_eq!(segment.get("apple"), Some(&3));
        assert_eq!(segment.get("cherry"), Some(&4));
    }

    #[test]
    fn test_lru_recency_order_follows_access() {
        let mut segment = segment(3);
        segment.put("a", 1);
        segment.put("b", 2);
        segment.put("c", 3);
        assert_eq!(recency_order(&segment), vec!["c", "b", "a"]);

        segment.get("a");
        assert_eq!(recency_order(&segment), vec!["a", "c", "b"]);

        segment.put("b", 20);
        assert_eq!(recency_order(&segment), vec!["b", "a", "c"]);

        // A miss leaves the order alone
        segment.get("zzz");
        assert_eq!(recency_order(&segment), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_lru_update_at_capacity_does_not_evict() {
        let mut segment = segment(2);
        segment.put("a", 1);
        segment.put("b", 2);
        assert_eq!(segment.put("a", 10), Some(Displaced::Replaced("a", 1)));
        assert_eq!(segment.put("b", 20), Some(Displaced::Replaced("b", 2)));
        assert_eq!(segment.len(), 2);
        assert_eq!(segment.metrics().evictions, 0);
        assert_eq!(segment.metrics().updates, 2);
    }

    #[test]
    fn test_lru_capacity_one() {
        let mut segment = segment(1);
        assert_eq!(segment.put("a", 1), None);
        assert_eq!(segment.put("a", 2), Some(Displaced::Replaced("a", 1)));
        assert_eq!(segment.put("b", 3), Some(Displaced::Evicted("a", 2)));
        assert_eq!(segment.put("a", 4), Some(Displaced::Evicted("b", 3)));
        assert_eq!(segment.get("a"), Some(&4));
        assert_eq!(segment.get("b"), None);
        assert_eq!(segment.len(), 1);
    }

    #[test]
    fn test_lru_map_and_list_stay_in_step() {
        let mut segment = segment(4);
        let keys = ["a", "b", "c", "d", "e", "f", "g"];
        for round in 0..50usize {
            let key = keys[(round * 5) % keys.len()];
            if round % 3 == 0 {
                segment.get(key);
            } else {
                segment.put(key, round as i32);
            }
            assert!(segment.len() <= 4);
            assert_eq!(segment.len(), segment.list.len());
            for k in recency_order(&segment) {
                assert!(segment.map.contains_key(k));
            }
        }
    }

    #[test]
    fn test_lru_string_keys_borrowed_lookup() {
        let cache = cache(2);
        let key1 = String::from("apple");
        cache.set(key1.clone(), 1);
        cache.set(String::from("banana"), 2);
        assert_eq!(cache.get(&key1), Some(1));
        assert_eq!(cache.get("banana"), Some(2));
        assert_eq!(cache.get(""), None);
    }

    #[derive(Debug, Clone, Eq, PartialEq)]
    struct ComplexValue {
        val: i32,
        description: String,
    }

    #[test]
    fn test_lru_complex_values_are_cloned_out() {
        let cache = cache(2);
        let fruit = ComplexValue {
            val: 1,
            description: String::from("First fruit"),
        };
        cache.set("apple".to_string(), fruit.clone());
        let mut copy = cache.get("apple").unwrap();
        copy.description.push_str(" (edited)");
        assert_eq!(cache.get("apple"), Some(fruit));
    }

    #[test]
    fn test_lru_metrics() {
        let cache = cache(2);
        let metrics = cache.metrics();
        assert_eq!(metrics["requests"], 0.0);
        assert_eq!(metrics["capacity"], 2.0);
        assert_eq!(metrics["len"], 0.0);

        cache.set("apple".to_string(), 1);
        cache.set("banana".to_string(), 2);
        cache.get("apple");
        cache.get("banana");
        cache.get("cherry");
        cache.set("cherry".to_string(), 3);
        cache.set("cherry".to_string(), 4);

        let metrics = cache.metrics();
        assert_eq!(metrics["cache_hits"], 2.0);
        assert_eq!(metrics["cache_misses"], 1.0);
        assert_eq!(metrics["requests"], 3.0);
        assert_eq!(metrics["insertions"], 3.0);
        assert_eq!(metrics["updates"], 1.0);
        assert_eq!(metrics["evictions"], 1.0);
        assert_eq!(metrics["len"], 2.0);
        assert_eq!(cache.algorithm_name(), "LRU");
    }

    #[test]
    fn test_lru_through_cache_trait() {
        fn fill<C: Cache<u32>>(cache: &C) {
            for i in 0..5 {
                cache.set(format!("k{i}"), i);
            }
        }
        let cache = cache(3);
        fill(&cache);
        assert_eq!(Cache::get(&cache, "k1"), None);
        assert_eq!(Cache::get(&cache, "k4"), Some(4));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_lru_debug_reports_capacity_and_len() {
        let cache = cache(4);
        cache.set("a".to_string(), 1);
        assert_eq!(format!("{cache:?}"), "LruCache { capacity: 4, len: 1 }");
    }

    #[test]
    fn test_lru_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(cache(100));
        let num_threads = 4;
        let ops_per_thread = 100;

        let mut handles: Vec<thread::JoinHandle<()>> = Vec::new();

        // Spawn writer threads
        for t in 0..num_threads {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let key = format!("thread_{}_key_{}", t, i);
                    cache.set(key, t * 1000 + i);
                }
            }));
        }

        // Spawn reader threads
        for t in 0..num_threads {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let key = format!("thread_{}_key_{}", t, i);
                    let _ = cache.get(&key);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 100);
        assert!(cache.len() > 0);
    }

    #[test]
    fn test_lru_high_contention() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(cache(50));
        let num_threads = 8;
        let ops_per_thread = 500;

        let mut handles: Vec<thread::JoinHandle<()>> = Vec::new();

        for t in 0..num_threads {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let key = format!("key_{}", i % 100); // Overlapping keys
                    if i % 2 == 0 {
                        cache.set(key, t * 1000 + i);
                    } else {
                        let _ = cache.get(&key);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 50);
    }

    /// Value whose destructor takes the lock of the cache holding it.
    struct LocksOnDrop {
        owner: std::sync::Weak<LruCache<LocksOnDrop>>,
    }

    impl Drop for LocksOnDrop {
        fn drop(&mut self) {
            if let Some(cache) = self.owner.upgrade() {
                let _ = cache.capacity();
            }
        }
    }

    #[test]
    fn test_lru_displaced_values_dropped_outside_lock() {
        use std::sync::{mpsc, Arc};
        use std::thread;
        use std::time::Duration;

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            let cache = Arc::new(cache(1));
            let value = || LocksOnDrop {
                owner: Arc::downgrade(&cache),
            };
            cache.set("a".to_string(), value());
            cache.set("a".to_string(), value()); // replaced
            cache.set("b".to_string(), value()); // evicted
            done_tx.send(cache.metrics()).unwrap();
        });

        let metrics = done_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("dropping a displaced value deadlocked");
        assert_eq!(metrics["updates"], 1.0);
        assert_eq!(metrics["evictions"], 1.0);
    }

    #[test]
    fn test_lru_huge_capacity_constructs() {
        let cache = cache(usize::MAX);
        cache.set("a".to_string(), 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.capacity().get(), usize::MAX);
    }
}
