//! Error types for the adaptcache library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: invalid construction parameters (zero capacity, zero GC
//!   cooldown). Fatal, never retried.
//! - [`InvariantError`]: an internal-consistency fault reported by
//!   `check_invariants` methods.
//! - [`LoadError`]: failures surfaced by the coalescing loader. Producer
//!   errors are shared verbatim with every waiter of the same call.
//!
//! Absent or expired keys are not errors; lookups return `Option`.
//!
//! ## Example Usage
//!
//! ```
//! use adaptcache::error::ConfigError;
//! use adaptcache::policy::arc::ArcCore;
//!
//! let cache: Result<ArcCore<String, i32>, ConfigError> = ArcCore::try_new(100);
//! assert!(cache.is_ok());
//!
//! let bad = ArcCore::<String, i32>::try_new(0);
//! assert!(bad.unwrap_err().to_string().contains("capacity"));
//! ```

use std::sync::Arc;

use thiserror::Error;

/// Error returned when internal cache invariants are violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Error returned when cache configuration parameters are invalid.
///
/// # Example
///
/// ```
/// use adaptcache::ttl::TtlCache;
///
/// let err = TtlCache::<u64, u64>::try_new(0).unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Failure of a coalesced load.
///
/// `E` is the producer's own error type. It is held behind an [`Arc`] so the
/// single failure of a shared call can be handed to every waiter.
#[derive(Debug, Error)]
pub enum LoadError<E> {
    /// The producer returned an error. Never cached.
    #[error("producer failed: {0}")]
    Producer(Arc<E>),
    /// A cached value exists but is not of the requested type.
    #[error("cached value is not a `{expected}`")]
    TypeMismatch { expected: &'static str },
    /// The producer panicked; the panic itself is resumed on the leading caller.
    #[error("producer panicked before publishing a result")]
    Panicked,
    /// The caller stopped waiting for a call led by another caller. The call
    /// itself still completes.
    #[error("gave up waiting for an in-flight load")]
    Abandoned,
}

impl<E> LoadError<E> {
    /// Returns the producer's error, if that is what this is.
    pub fn producer(&self) -> Option<&E> {
        match self {
            Self::Producer(err) => Some(&**err),
            _ => None,
        }
    }
}

impl<E> Clone for LoadError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Producer(err) => Self::Producer(Arc::clone(err)),
            Self::TypeMismatch { expected } => Self::TypeMismatch {
                expected: *expected,
            },
            Self::Panicked => Self::Panicked,
            Self::Abandoned => Self::Abandoned,
        }
    }
}
