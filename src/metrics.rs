//! Cache Metrics
//!
//! Counters for the LRU cache and the repository decorator, reported through
//! the [`CacheMetrics`] trait as a `BTreeMap` so that output is always in the
//! same key order regardless of how the counters were recorded.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by every [`LruCache`](crate::LruCache).
///
/// These live inside the cache's lock, so plain integers suffice.
#[derive(Debug, Default, Clone)]
pub struct CoreCacheMetrics {
    /// Total number of `get` calls.
    pub requests: u64,

    /// Number of `get` calls that found their key.
    pub cache_hits: u64,

    /// Number of `set` calls that added a new key.
    pub insertions: u64,

    /// Number of `set` calls that replaced the value of an existing key.
    pub updates: u64,

    /// Number of entries dropped to make room for a new key.
    pub evictions: u64,
}

impl CoreCacheMetrics {
    pub(crate) fn record_hit(&mut self) {
        self.requests += 1;
        self.cache_hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.requests += 1;
    }

    pub(crate) fn record_insertion(&mut self) {
        self.insertions += 1;
    }

    pub(crate) fn record_update(&mut self) {
        self.updates += 1;
    }

    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Number of `get` calls that missed.
    pub fn cache_misses(&self) -> u64 {
        self.requests - self.cache_hits
    }

    /// Fraction of requests served from the cache, or 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Converts the counters to a `BTreeMap` for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert("cache_misses".to_string(), self.cache_misses() as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("insertions".to_string(), self.insertions as f64);
        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("updates".to_string(), self.updates as f64);
        metrics
    }
}

/// Counters tracked by a [`CachedRepository`](crate::CachedRepository).
///
/// The decorator is shared between threads without a lock of its own, so
/// counters are atomics updated with relaxed ordering. They are statistics,
/// not synchronization.
#[derive(Debug, Default)]
pub struct RepositoryMetrics {
    delegate_reads: AtomicU64,
    delegate_writes: AtomicU64,
    primary_hits: AtomicU64,
    secondary_index_hits: AtomicU64,
    stale_secondary_pointers: AtomicU64,
}

impl RepositoryMetrics {
    pub(crate) fn record_delegate_read(&self) {
        self.delegate_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delegate_write(&self) {
        self.delegate_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_primary_hit(&self) {
        self.primary_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_secondary_index_hit(&self) {
        self.secondary_index_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_secondary_pointer(&self) {
        self.stale_secondary_pointers.fetch_add(1, Ordering::Relaxed);
    }

    /// Calls made to the delegate's read operations.
    pub fn delegate_reads(&self) -> u64 {
        self.delegate_reads.load(Ordering::Relaxed)
    }

    /// Calls made to the delegate's `save` and `update`.
    pub fn delegate_writes(&self) -> u64 {
        self.delegate_writes.load(Ordering::Relaxed)
    }

    /// Lookups answered from the primary cache.
    pub fn primary_hits(&self) -> u64 {
        self.primary_hits.load(Ordering::Relaxed)
    }

    /// Lookups or existence checks answered through the secondary index.
    pub fn secondary_index_hits(&self) -> u64 {
        self.secondary_index_hits.load(Ordering::Relaxed)
    }

    /// Secondary index entries that pointed at an entity no longer cached
    /// under that key.
    pub fn stale_secondary_pointers(&self) -> u64 {
        self.stale_secondary_pointers.load(Ordering::Relaxed)
    }

    /// Converts the counters to a `BTreeMap` for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert("delegate_reads".to_string(), self.delegate_reads() as f64);
        metrics.insert("delegate_writes".to_string(), self.delegate_writes() as f64);
        metrics.insert("primary_hits".to_string(), self.primary_hits() as f64);
        metrics.insert(
            "secondary_index_hits".to_string(),
            self.secondary_index_hits() as f64,
        );
        metrics.insert(
            "stale_secondary_pointers".to_string(),
            self.stale_secondary_pointers() as f64,
        );
        metrics
    }
}

/// Uniform metrics reporting for caches and cache decorators.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Name identifying the implementation in reports.
    fn algorithm_name(&self) -> &'static str;
}
