//! Caching decorator for any [`Repository`].
//!
//! [`CachedRepository`] sits in front of a delegate repository and keeps two
//! caches:
//!
//! ```text
//!                       ┌──────────────────────────────┐
//!   find_by_id ────────▶│ primary: id -> entity        │──miss──┐
//!                       └──────────────────────────────┘        │
//!                                     ▲ revalidate              ▼
//!                       ┌──────────────────────────────┐   ┌──────────┐
//!   find_by_secondary ─▶│ secondary index: key -> id   │──▶│ delegate │
//!   exists_by_secondary │                              │   └──────────┘
//!                       └──────────────────────────────┘        │
//!                         ▲            fill both on success     │
//!                         └─────────────────────────────────────┘
//! ```
//!
//! - **Reads** are cache-aside: answer from the cache when possible, otherwise
//!   ask the delegate and remember what it returned. Absent results are never
//!   cached.
//! - **Writes** are write-through: the delegate is written first and the
//!   caches are only touched once it reports success.
//!
//! The two caches evict independently, so the secondary index may point at an
//! id the primary cache no longer holds, or at an entity whose secondary key
//! has since changed. An index hit is therefore only trusted after the
//! primary cache confirms it. `exists_by_secondary_key` is the exception: it
//! answers `true` straight from the index.
//!
//! # Concurrency
//!
//! Each cache call takes and releases its cache's lock before returning, so
//! no lock is held while the delegate runs. Two threads missing on the same
//! key at the same time will both query the delegate; both fills write the
//! same data.

use crate::config::CachedRepositoryConfig;
use crate::error::CacheError;
use crate::factory::create_cache;
use crate::lru::LruCache;
use crate::metrics::{CacheMetrics, RepositoryMetrics};
use crate::repository::{Entity, Repository};
use crate::traits::Cache;
use core::fmt;
use std::collections::BTreeMap;
use tracing::{debug, info, trace, warn};

/// A [`Repository`] decorator adding an entity cache and a secondary key
/// index in front of `R`.
///
/// `P` caches entities by id and `I` maps secondary keys to ids. Both default
/// to [`LruCache`].
///
/// # Examples
///
/// ```
/// use cache_aside::config::CachedRepositoryConfig;
/// use cache_aside::memory::MemoryRepository;
/// use cache_aside::{CachedRepository, Entity, Repository};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct User {
///     id: String,
///     email: String,
/// }
///
/// impl Entity for User {
///     fn id(&self) -> &str {
///         &self.id
///     }
///     fn secondary_key(&self) -> &str {
///         &self.email
///     }
/// }
///
/// let store = MemoryRepository::with_entities([User {
///     id: "u1".to_string(),
///     email: "ada@example.com".to_string(),
/// }]);
/// let repo = CachedRepository::new(store, &CachedRepositoryConfig::with_capacity(10)).unwrap();
///
/// // First lookup goes to the store, the second is served from the cache
/// let first = repo.find_by_id("u1").unwrap();
/// let second = repo.find_by_id("u1").unwrap();
/// assert_eq!(first, second);
/// assert_eq!(repo.delegate().read_calls(), 1);
///
/// // The lookup also filled the secondary index
/// assert!(repo.exists_by_secondary_key("ada@example.com").unwrap());
/// assert_eq!(repo.delegate().exists_calls(), 0);
/// ```
pub struct CachedRepository<R, P = LruCache<<R as Repository>::Entity>, I = LruCache<String>>
where
    R: Repository,
{
    delegate: R,
    primary: P,
    secondary_index: I,
    metrics: RepositoryMetrics,
}

impl<R> CachedRepository<R>
where
    R: Repository,
    R::Entity: Clone,
{
    /// Wraps `delegate` with two LRU caches sized by `config`.
    ///
    /// Fails with [`CacheError::InvalidConfiguration`] if either capacity is
    /// zero.
    pub fn new(delegate: R, config: &CachedRepositoryConfig) -> Result<Self, CacheError> {
        let primary = create_cache(&config.primary)?;
        let secondary_index = create_cache(&config.secondary_index)?;
        info!(
            primary_capacity = config.primary.capacity,
            secondary_index_capacity = config.secondary_index.capacity,
            "creating cached repository"
        );
        Ok(Self::with_caches(delegate, primary, secondary_index))
    }
}

impl<R, P, I> CachedRepository<R, P, I>
where
    R: Repository,
    R::Entity: Clone,
    P: Cache<R::Entity>,
    I: Cache<String>,
{
    /// Wraps `delegate` with caches built by the caller.
    ///
    /// The caches may already hold entries; they are used as they are.
    pub fn with_caches(delegate: R, primary: P, secondary_index: I) -> Self {
        CachedRepository {
            delegate,
            primary,
            secondary_index,
            metrics: RepositoryMetrics::default(),
        }
    }

    /// The wrapped repository.
    pub fn delegate(&self) -> &R {
        &self.delegate
    }

    /// The id -> entity cache.
    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// The secondary key -> id cache.
    pub fn secondary_index(&self) -> &I {
        &self.secondary_index
    }

    /// Hit, miss and delegate call counters.
    pub fn repository_metrics(&self) -> &RepositoryMetrics {
        &self.metrics
    }

    /// Drops the caches and returns the wrapped repository.
    pub fn into_inner(self) -> R {
        self.delegate
    }

    /// Records `entity` in both caches.
    fn remember(&self, entity: &R::Entity) {
        self.primary.set(entity.id().to_string(), entity.clone());
        self.secondary_index
            .set(entity.secondary_key().to_string(), entity.id().to_string());
    }

    /// Resolves `key` through the secondary index, trusting the result only
    /// if the primary cache still holds an entity under that key.
    fn cached_by_secondary_key(&self, key: &str) -> Option<R::Entity> {
        let id = self.secondary_index.get(key)?;
        match self.primary.get(&id) {
            Some(entity) if entity.secondary_key() == key => {
                self.metrics.record_secondary_index_hit();
                Some(entity)
            }
            _ => {
                self.metrics.record_stale_secondary_pointer();
                trace!(key, id = %id, "secondary index entry is stale");
                None
            }
        }
    }

    fn write_through(
        &self,
        operation: &'static str,
        entity: &R::Entity,
        result: Result<bool, R::Error>,
    ) -> Result<bool, R::Error> {
        match result {
            Ok(true) => {
                self.remember(entity);
                debug!(operation, id = entity.id(), "write-through cached entity");
                Ok(true)
            }
            Ok(false) => {
                debug!(operation, id = entity.id(), "delegate declined write");
                Ok(false)
            }
            Err(err) => {
                warn!(operation, id = entity.id(), "delegate write failed, cache left untouched");
                Err(err)
            }
        }
    }
}

impl<R, P, I> Repository for CachedRepository<R, P, I>
where
    R: Repository,
    R::Entity: Clone,
    P: Cache<R::Entity>,
    I: Cache<String>,
{
    type Entity = R::Entity;
    type Error = R::Error;

    fn find_by_id(&self, id: &str) -> Result<Option<R::Entity>, R::Error> {
        if let Some(entity) = self.primary.get(id) {
            self.metrics.record_primary_hit();
            trace!(id, "primary cache hit");
            return Ok(Some(entity));
        }

        self.metrics.record_delegate_read();
        let found = self.delegate.find_by_id(id)?;
        match &found {
            Some(entity) => {
                self.remember(entity);
                debug!(id, "cached entity loaded by id");
            }
            None => debug!(id, "no entity with id"),
        }
        Ok(found)
    }

    fn find_by_secondary_key(&self, key: &str) -> Result<Option<R::Entity>, R::Error> {
        if let Some(entity) = self.cached_by_secondary_key(key) {
            trace!(key, "secondary index hit");
            return Ok(Some(entity));
        }

        self.metrics.record_delegate_read();
        let found = self.delegate.find_by_secondary_key(key)?;
        match &found {
            Some(entity) => {
                self.remember(entity);
                debug!(key, id = entity.id(), "cached entity loaded by secondary key");
            }
            None => debug!(key, "no entity with secondary key"),
        }
        Ok(found)
    }

    fn find_all(&self) -> Result<Vec<R::Entity>, R::Error> {
        self.metrics.record_delegate_read();
        let entities = self.delegate.find_all()?;
        for entity in &entities {
            self.remember(entity);
        }
        debug!(count = entities.len(), "warmed caches from full listing");
        Ok(entities)
    }

    fn save(&self, entity: &R::Entity) -> Result<bool, R::Error> {
        self.metrics.record_delegate_write();
        let result = self.delegate.save(entity);
        self.write_through("save", entity, result)
    }

    fn update(&self, entity: &R::Entity) -> Result<bool, R::Error> {
        self.metrics.record_delegate_write();
        let result = self.delegate.update(entity);
        self.write_through("update", entity, result)
    }

    fn exists_by_secondary_key(&self, key: &str) -> Result<bool, R::Error> {
        if self.secondary_index.get(key).is_some() {
            self.metrics.record_secondary_index_hit();
            return Ok(true);
        }
        self.metrics.record_delegate_read();
        self.delegate.exists_by_secondary_key(key)
    }
}

impl<R, P, I> CacheMetrics for CachedRepository<R, P, I>
where
    R: Repository,
    P: CacheMetrics,
    I: CacheMetrics,
{
    /// Repository counters, followed by the metrics of each cache prefixed
    /// with `primary.` and `secondary_index.`.
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.metrics.to_btreemap();
        for (name, value) in self.primary.metrics() {
            metrics.insert(format!("primary.{name}"), value);
        }
        for (name, value) in self.secondary_index.metrics() {
            metrics.insert(format!("secondary_index.{name}"), value);
        }
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        "CachedRepository"
    }
}

impl<R, P, I> fmt::Debug for CachedRepository<R, P, I>
where
    R: Repository + fmt::Debug,
    P: fmt::Debug,
    I: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedRepository")
            .field("delegate", &self.delegate)
            .field("primary", &self.primary)
            .field("secondary_index", &self.secondary_index)
            .finish()
    }
}
