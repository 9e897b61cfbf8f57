//! Construction of caches from configuration.

use crate::config::LruCacheConfig;
use crate::error::CacheError;
use crate::lru::LruCache;
use tracing::info;

/// Builds an [`LruCache`] from `config`.
///
/// This is the only way to obtain an `LruCache`. A zero capacity fails with
/// [`CacheError::InvalidConfiguration`] and no cache is created.
///
/// # Examples
///
/// ```
/// use cache_aside::config::LruCacheConfig;
/// use cache_aside::{create_cache, CacheError};
///
/// let cache = create_cache::<String>(&LruCacheConfig::new(10)).unwrap();
/// cache.set("foo".to_string(), "bar".to_string());
/// assert_eq!(cache.get("foo").as_deref(), Some("bar"));
///
/// let err = create_cache::<String>(&LruCacheConfig::new(0)).unwrap_err();
/// assert!(matches!(err, CacheError::InvalidConfiguration { .. }));
/// ```
pub fn create_cache<V>(config: &LruCacheConfig) -> Result<LruCache<V>, CacheError> {
    let capacity = config.validate()?;
    info!(capacity = capacity.get(), "creating LRU cache");
    Ok(LruCache::new(capacity))
}
