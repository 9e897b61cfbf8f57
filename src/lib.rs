#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ caller                                                               │
//! │   │                                                                  │
//! │   ▼                                                                  │
//! │ CachedRepository<R> ──────────────────────────────▶ R: Repository    │
//! │   │          │                        (on miss / on write)           │
//! │   ▼          ▼                                                       │
//! │ LruCache<E>  LruCache<String>                                        │
//! │ id -> entity secondary key -> id                                     │
//! │   │          │                                                       │
//! │   └──────────┴──▶ Mutex<LruSegment>  (HashMap + recency List)        │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Reference
//!
//! | Item | Description |
//! |------|-------------|
//! | [`create_cache`] | Builds an [`LruCache`] from an [`LruCacheConfig`](config::LruCacheConfig) |
//! | [`LruCache`] | Thread-safe fixed-capacity LRU cache with `String` keys |
//! | [`Cache`] | The `get` / `set` interface |
//! | [`Repository`], [`Entity`] | Backing store contract |
//! | [`CachedRepository`] | Cache-aside reads, write-through writes, secondary key index |
//! | [`MemoryRepository`](memory::MemoryRepository) | In-memory store with call counters |
//!
//! ## Performance Characteristics
//!
//! | Operation | Cost |
//! |-----------|------|
//! | `LruCache::get` | O(1) expected, plus one value clone on a hit |
//! | `LruCache::set` | O(1) expected, at most one eviction |
//! | `CachedRepository` hit | one or two cache lookups, no delegate call |
//!
//! ## Modules
//!
//! - [`lru`]: The LRU cache
//! - [`config`]: Configuration structures
//! - [`metrics`]: Metrics collection
//! - [`cached`]: The repository decorator
//! - [`memory`]: In-memory repository

/// Index-based doubly linked list tracking recency order.
///
/// Internal infrastructure for [`lru`]; not part of the public API.
pub(crate) mod list;

/// Cache configuration structures.
pub mod config;

/// Error types.
pub mod error;

/// Construction of caches from configuration.
pub mod factory;

/// Least Recently Used (LRU) cache implementation.
///
/// Provides a fixed-size, thread-safe cache that evicts the least recently
/// used entry when full.
pub mod lru;

/// Cache metrics.
///
/// Counters for caches and the repository decorator behind a common
/// reporting trait.
pub mod metrics;

/// The [`Cache`] trait.
pub mod traits;

/// The [`Repository`] and [`Entity`] traits.
pub mod repository;

/// The caching repository decorator.
pub mod cached;

/// In-memory repository.
pub mod memory;

pub use cached::CachedRepository;
pub use error::CacheError;
pub use factory::create_cache;
pub use lru::LruCache;
pub use metrics::CacheMetrics;
pub use repository::{Entity, Repository};
pub use traits::Cache;
