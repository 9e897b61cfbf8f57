//! In-memory [`Repository`] implementation.
//!
//! Useful as a backing store in tests and examples. It counts the calls made
//! to it, so callers can assert whether a decorator reached the store, and it
//! can be switched into a failing state to exercise error paths.

use crate::repository::{Entity, Repository};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;
use tracing::debug;

/// Errors raised by [`MemoryRepository`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryRepositoryError {
    /// The repository was switched off with
    /// [`set_unavailable`](MemoryRepository::set_unavailable).
    #[error("repository unavailable")]
    Unavailable,

    /// Another entity already uses the secondary key.
    #[error("secondary key {key:?} already belongs to entity {owner:?}")]
    DuplicateSecondaryKey {
        /// The contested secondary key.
        key: String,
        /// Id of the entity holding it.
        owner: String,
    },
}

#[derive(Debug)]
struct Tables<E> {
    by_id: BTreeMap<String, E>,
    by_secondary_key: BTreeMap<String, String>,
}

/// A thread-safe repository backed by ordered maps.
///
/// `find_all` returns entities ordered by id.
#[derive(Debug)]
pub struct MemoryRepository<E> {
    tables: RwLock<Tables<E>>,
    unavailable: AtomicBool,
    read_calls: AtomicUsize,
    write_calls: AtomicUsize,
    exists_calls: AtomicUsize,
}

impl<E: Entity + Clone> MemoryRepository<E> {
    /// Creates an empty repository.
    pub fn new() -> Self {
        MemoryRepository {
            tables: RwLock::new(Tables {
                by_id: BTreeMap::new(),
                by_secondary_key: BTreeMap::new(),
            }),
            unavailable: AtomicBool::new(false),
            read_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            exists_calls: AtomicUsize::new(0),
        }
    }

    /// Creates a repository pre-loaded with `entities`.
    ///
    /// Seeding does not count as a call. Later entities replace earlier ones
    /// with the same id.
    pub fn with_entities<I: IntoIterator<Item = E>>(entities: I) -> Self {
        let repo = Self::new();
        for entity in entities {
            repo.insert(entity);
        }
        repo
    }

    /// Stores `entity` directly, bypassing call counting and validation.
    ///
    /// Simulates a write made by another process behind a cache's back.
    pub fn insert(&self, entity: E) {
        let mut tables = self.tables.write();
        if let Some(previous) = tables.by_id.get(entity.id()) {
            let old_key = previous.secondary_key().to_string();
            tables.by_secondary_key.remove(&old_key);
        }
        tables
            .by_secondary_key
            .insert(entity.secondary_key().to_string(), entity.id().to_string());
        tables.by_id.insert(entity.id().to_string(), entity);
    }

    /// Makes every subsequent call fail with
    /// [`MemoryRepositoryError::Unavailable`] until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `find_by_id`, `find_by_secondary_key` and `find_all` calls.
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Number of `save` and `update` calls.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Number of `exists_by_secondary_key` calls.
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Resets all call counters to zero.
    pub fn reset_counters(&self) {
        self.read_calls.store(0, Ordering::SeqCst);
        self.write_calls.store(0, Ordering::SeqCst);
        self.exists_calls.store(0, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), MemoryRepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MemoryRepositoryError::Unavailable);
        }
        Ok(())
    }

    fn check_secondary_key_free(
        tables: &Tables<E>,
        entity: &E,
    ) -> Result<(), MemoryRepositoryError> {
        match tables.by_secondary_key.get(entity.secondary_key()) {
            Some(owner) if owner != entity.id() => {
                Err(MemoryRepositoryError::DuplicateSecondaryKey {
                    key: entity.secondary_key().to_string(),
                    owner: owner.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl<E: Entity + Clone> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity + Clone> Repository for MemoryRepository<E> {
    type Entity = E;
    type Error = MemoryRepositoryError;

    fn find_by_id(&self, id: &str) -> Result<Option<E>, MemoryRepositoryError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.tables.read().by_id.get(id).cloned())
    }

    fn find_by_secondary_key(&self, key: &str) -> Result<Option<E>, MemoryRepositoryError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let tables = self.tables.read();
        Ok(tables
            .by_secondary_key
            .get(key)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    fn find_all(&self) -> Result<Vec<E>, MemoryRepositoryError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.tables.read().by_id.values().cloned().collect())
    }

    fn save(&self, entity: &E) -> Result<bool, MemoryRepositoryError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut tables = self.tables.write();
        if tables.by_id.contains_key(entity.id()) {
            debug!(id = entity.id(), "save declined, id already stored");
            return Ok(false);
        }
        Self::check_secondary_key_free(&tables, entity)?;
        tables
            .by_secondary_key
            .insert(entity.secondary_key().to_string(), entity.id().to_string());
        tables
            .by_id
            .insert(entity.id().to_string(), entity.clone());
        Ok(true)
    }

    fn update(&self, entity: &E) -> Result<bool, MemoryRepositoryError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut tables = self.tables.write();
        let Some(previous_key) = tables
            .by_id
            .get(entity.id())
            .map(|previous| previous.secondary_key().to_string())
        else {
            debug!(id = entity.id(), "update declined, id not stored");
            return Ok(false);
        };
        Self::check_secondary_key_free(&tables, entity)?;
        tables.by_secondary_key.remove(&previous_key);
        tables
            .by_secondary_key
            .insert(entity.secondary_key().to_string(), entity.id().to_string());
        tables
            .by_id
            .insert(entity.id().to_string(), entity.clone());
        Ok(true)
    }

    fn exists_by_secondary_key(&self, key: &str) -> Result<bool, MemoryRepositoryError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.tables.read().by_secondary_key.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Account {
        id: String,
        login: String,
    }

    impl Entity for Account {
        fn id(&self) -> &str {
            &self.id
        }

        fn secondary_key(&self) -> &str {
            &self.login
        }
    }

    fn account(id: &str, login: &str) -> Account {
        Account {
            id: id.to_string(),
            login: login.to_string(),
        }
    }

    #[test]
    fn test_save_then_find() {
        let repo = MemoryRepository::new();
        assert_eq!(repo.save(&account("1", "ada")), Ok(true));
        assert_eq!(repo.find_by_id("1"), Ok(Some(account("1", "ada"))));
        assert_eq!(
            repo.find_by_secondary_key("ada"),
            Ok(Some(account("1", "ada")))
        );
        assert_eq!(repo.exists_by_secondary_key("ada"), Ok(true));
        assert_eq!(repo.exists_by_secondary_key("bob"), Ok(false));
        assert_eq!(repo.read_calls(), 2);
        assert_eq!(repo.write_calls(), 1);
        assert_eq!(repo.exists_calls(), 2);
    }

    #[test]
    fn test_save_existing_id_is_declined() {
        let repo = MemoryRepository::with_entities([account("1", "ada")]);
        assert_eq!(repo.save(&account("1", "other")), Ok(false));
        assert_eq!(repo.find_by_id("1"), Ok(Some(account("1", "ada"))));
    }

    #[test]
    fn test_duplicate_secondary_key_is_an_error() {
        let repo = MemoryRepository::with_entities([account("1", "ada")]);
        assert_eq!(
            repo.save(&account("2", "ada")),
            Err(MemoryRepositoryError::DuplicateSecondaryKey {
                key: "ada".to_string(),
                owner: "1".to_string(),
            })
        );
        assert_eq!(repo.find_by_id("2"), Ok(None));
    }

    #[test]
    fn test_update_moves_secondary_key() {
        let repo = MemoryRepository::with_entities([account("1", "ada")]);
        assert_eq!(repo.update(&account("1", "lovelace")), Ok(true));
        assert_eq!(repo.find_by_secondary_key("ada"), Ok(None));
        assert_eq!(
            repo.find_by_secondary_key("lovelace"),
            Ok(Some(account("1", "lovelace")))
        );
        assert_eq!(repo.update(&account("9", "nobody")), Ok(false));
    }

    #[test]
    fn test_find_all_is_ordered_by_id() {
        let repo =
            MemoryRepository::with_entities([account("b", "2"), account("a", "1"), account("c", "3")]);
        let ids: Vec<String> = repo.find_all().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unavailable_fails_every_call() {
        let repo = MemoryRepository::with_entities([account("1", "ada")]);
        repo.set_unavailable(true);
        assert_eq!(repo.find_by_id("1"), Err(MemoryRepositoryError::Unavailable));
        assert_eq!(repo.find_all(), Err(MemoryRepositoryError::Unavailable));
        assert_eq!(
            repo.save(&account("2", "bob")),
            Err(MemoryRepositoryError::Unavailable)
        );
        assert_eq!(
            repo.exists_by_secondary_key("ada"),
            Err(MemoryRepositoryError::Unavailable)
        );
        repo.set_unavailable(false);
        assert_eq!(repo.find_by_id("1"), Ok(Some(account("1", "ada"))));

        repo.reset_counters();
        assert_eq!(repo.read_calls(), 0);
        assert_eq!(repo.write_calls(), 0);
        assert_eq!(repo.exists_calls(), 0);
    }
}
