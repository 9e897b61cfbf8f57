//! Repository contract consumed and implemented by
//! [`CachedRepository`](crate::CachedRepository).
//!
//! A repository stores entities that have a unique primary id and a unique
//! secondary key (an email address, a username, ...). The trait says nothing
//! about where entities live; a JSON file, a database and an in-memory map
//! are all valid backing stores.

/// A stored record addressable by a primary id and a secondary key.
pub trait Entity {
    /// Unique identifier, the primary cache key.
    fn id(&self) -> &str;

    /// Unique secondary attribute, the secondary index key.
    fn secondary_key(&self) -> &str;
}

/// Persistence operations over one entity type.
///
/// Methods take `&self` so one repository can be shared between threads;
/// implementations synchronize internally. Any method may fail with
/// [`Self::Error`]. Absence is not a failure: lookups return `Ok(None)`.
pub trait Repository {
    /// The entity type stored.
    type Entity: Entity;

    /// Failure raised by the backing store.
    type Error;

    /// Returns the entity with the given id.
    fn find_by_id(&self, id: &str) -> Result<Option<Self::Entity>, Self::Error>;

    /// Returns the entity with the given secondary key.
    fn find_by_secondary_key(&self, key: &str) -> Result<Option<Self::Entity>, Self::Error>;

    /// Returns every stored entity.
    fn find_all(&self) -> Result<Vec<Self::Entity>, Self::Error>;

    /// Stores a new entity. `Ok(false)` means the store declined the write.
    fn save(&self, entity: &Self::Entity) -> Result<bool, Self::Error>;

    /// Replaces an existing entity. `Ok(false)` means no entity with that id
    /// existed, or the store otherwise declined the write.
    fn update(&self, entity: &Self::Entity) -> Result<bool, Self::Error>;

    /// Returns true if an entity with the given secondary key exists.
    fn exists_by_secondary_key(&self, key: &str) -> Result<bool, Self::Error>;
}

impl<R: Repository + ?Sized> Repository for std::sync::Arc<R> {
    type Entity = R::Entity;
    type Error = R::Error;

    fn find_by_id(&self, id: &str) -> Result<Option<Self::Entity>, Self::Error> {
        (**self).find_by_id(id)
    }

    fn find_by_secondary_key(&self, key: &str) -> Result<Option<Self::Entity>, Self::Error> {
        (**self).find_by_secondary_key(key)
    }

    fn find_all(&self) -> Result<Vec<Self::Entity>, Self::Error> {
        (**self).find_all()
    }

    fn save(&self, entity: &Self::Entity) -> Result<bool, Self::Error> {
        (**self).save(entity)
    }

    fn update(&self, entity: &Self::Entity) -> Result<bool, Self::Error> {
        (**self).update(entity)
    }

    fn exists_by_secondary_key(&self, key: &str) -> Result<bool, Self::Error> {
        (**self).exists_by_secondary_key(key)
    }
}
