//! The cache interface shared by [`LruCache`](crate::LruCache) and anything
//! a [`CachedRepository`](crate::CachedRepository) can be built on.
//!
//! The interface is deliberately narrow: there is no `remove`, `len` or
//! `contains`. Presence is observed only through [`Cache::get`], and entries
//! leave the cache only through the implementation's eviction policy.

/// A string-keyed cache shared between threads.
///
/// Both methods take `&self`; implementations synchronize internally.
pub trait Cache<V> {
    /// Returns a copy of the value stored under `key`, if any.
    ///
    /// A hit counts as a use of the entry for eviction purposes.
    fn get(&self, key: &str) -> Option<V>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Never fails. May evict another entry to stay within capacity.
    fn set(&self, key: String, value: V);
}

impl<V, C: Cache<V> + ?Sized> Cache<V> for &C {
    fn get(&self, key: &str) -> Option<V> {
        (**self).get(key)
    }

    fn set(&self, key: String, value: V) {
        (**self).set(key, value)
    }
}

impl<V, C: Cache<V> + ?Sized> Cache<V> for std::sync::Arc<C> {
    fn get(&self, key: &str) -> Option<V> {
        (**self).get(key)
    }

    fn set(&self, key: String, value: V) {
        (**self).set(key, value)
    }
}
