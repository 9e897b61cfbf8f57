//! Cache Configuration Module
//!
//! Configuration structures for the LRU cache and the caching repository
//! decorator. Configs are plain structs with public fields:
//!
//! - **Simple**: Just create the struct with all fields set
//! - **Validated on use**: A literal config is checked when a cache is built
//!   from it, the `from_env` loaders check as they parse. A zero capacity
//!   fails with [`CacheError::InvalidConfiguration`]
//!
//! # Sizing
//!
//! Capacity is an item count. There is no byte accounting: an entry holding a
//! large value costs the same single slot as one holding a small value.
//!
//! A [`CachedRepository`](crate::CachedRepository) owns two caches. The primary
//! cache holds whole entities; the secondary index holds only `key -> id`
//! pointers, so it can usually afford the same or a larger capacity.
//!
//! # Environment
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `CACHE_CAPACITY` | primary cache capacity |
//! | `CACHE_SECONDARY_CAPACITY` | secondary index capacity (defaults to `CACHE_CAPACITY`) |
//!
//! # Examples
//!
//! ```
//! use cache_aside::config::LruCacheConfig;
//! use cache_aside::create_cache;
//!
//! let config = LruCacheConfig { capacity: 1000 };
//! let cache = create_cache::<i32>(&config).unwrap();
//! cache.set("answer".to_string(), 42);
//! assert_eq!(cache.get("answer"), Some(42));
//! ```

use crate::error::CacheError;
use core::num::NonZeroUsize;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 100;

/// Environment variable holding the primary cache capacity.
pub const CAPACITY_ENV: &str = "CACHE_CAPACITY";

/// Environment variable holding the secondary index capacity.
pub const SECONDARY_CAPACITY_ENV: &str = "CACHE_SECONDARY_CAPACITY";

/// Configuration for an LRU cache.
///
/// # Fields
///
/// - `capacity`: Maximum number of entries. Must be greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LruCacheConfig {
    /// Maximum number of entries the cache can hold.
    pub capacity: usize,
}

impl LruCacheConfig {
    /// Creates a configuration with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Checks the configuration and returns the capacity as a `NonZeroUsize`.
    pub fn validate(&self) -> Result<NonZeroUsize, CacheError> {
        NonZeroUsize::new(self.capacity)
            .ok_or_else(|| CacheError::invalid("capacity", "must be greater than zero"))
    }

    /// Loads the configuration from `CACHE_CAPACITY`.
    ///
    /// An unset variable yields the default capacity. A set variable that is
    /// not a positive integer is an error.
    pub fn from_env() -> Result<Self, CacheError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_vars<F>(lookup: F) -> Result<Self, CacheError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let capacity = parse_capacity(CAPACITY_ENV, lookup(CAPACITY_ENV))?;
        let config = Self {
            capacity: capacity.unwrap_or(DEFAULT_CAPACITY),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for LruCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Configuration for a [`CachedRepository`](crate::CachedRepository).
///
/// # Fields
///
/// - `primary`: Cache of whole entities keyed by id.
/// - `secondary_index`: Cache of `secondary key -> id` pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachedRepositoryConfig {
    /// Configuration of the entity cache.
    pub primary: LruCacheConfig,
    /// Configuration of the secondary key index.
    pub secondary_index: LruCacheConfig,
}

impl CachedRepositoryConfig {
    /// Uses the same capacity for both caches.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            primary: LruCacheConfig::new(capacity),
            secondary_index: LruCacheConfig::new(capacity),
        }
    }

    /// Checks both cache configurations.
    pub fn validate(&self) -> Result<(), CacheError> {
        self.primary.validate()?;
        self.secondary_index.validate()?;
        Ok(())
    }

    /// Loads the configuration from `CACHE_CAPACITY` and
    /// `CACHE_SECONDARY_CAPACITY`.
    pub fn from_env() -> Result<Self, CacheError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_vars<F>(lookup: F) -> Result<Self, CacheError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let primary = LruCacheConfig::from_vars(&lookup)?;
        let secondary = parse_capacity(SECONDARY_CAPACITY_ENV, lookup(SECONDARY_CAPACITY_ENV))?;
        let config = Self {
            primary,
            secondary_index: LruCacheConfig::new(secondary.unwrap_or(primary.capacity)),
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_capacity(var: &'static str, raw: Option<String>) -> Result<Option<usize>, CacheError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|e| CacheError::invalid(var, format!("is not a valid capacity ({raw:?}): {e}")))
}
