//! Error types for cache construction.
//!
//! A running cache never fails: `get` on an absent key is a miss, not an
//! error, and `set` always succeeds. The only failure the crate itself can
//! produce is a bad configuration. Failures of a backing repository are the
//! repository's own error type and pass through [`CachedRepository`]
//! untouched.
//!
//! [`CachedRepository`]: crate::CachedRepository

use thiserror::Error;

/// Errors raised while building a cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A configuration value was rejected. No cache was created.
    #[error("invalid cache configuration: {field} {reason}")]
    InvalidConfiguration {
        /// Name of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl CacheError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CacheError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}
