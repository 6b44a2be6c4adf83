//! Cache-aside adaptation of arbitrary method invocations.
//!
//! ## Architecture
//!
//! Each adapted method gets one validated [`AsideBinding`] describing its
//! caching profile. Every call then flows through the binding:
//!
//! ```text
//!   caller ──► AsideBinding::invoke_*()
//!                  │
//!                  ├── CacheResolver  ──► which Cache
//!                  ├── KeyGenerator   ──► InvocationKey from key args
//!                  └── operation      ──► get / put / remove around
//!                                         the underlying call
//! ```
//!
//! ## Key Components
//!
//! - [`AsideBinding`] / [`AsideOperation`]: per-method profile and the
//!   four caching behaviors (`cache-result`, `cache-put`,
//!   `remove-entry`, `remove-all`).
//! - [`InvocationKey`] / [`component`]: dynamically typed argument
//!   tuples with type-aware equality.
//! - [`CachedOutcome`]: cached value or an explicit `Null`, so "computed
//!   nothing" is itself cacheable.
//! - [`CacheResolver`] / [`KeyGenerator`]: the two extension seams.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use lockaside::aside::{
//!     component, AsideBinding, AsideOperation, CachedOutcome, FixedCacheResolver,
//! };
//! use lockaside::builder::CacheBuilder;
//!
//! let cache = CacheBuilder::<_, CachedOutcome<String>>::new("users.find")
//!     .build_started()?;
//! let binding = AsideBinding::try_new(
//!     "find_user",
//!     AsideOperation::CacheResult { skip_get: false },
//!     1,
//!     &[],
//!     None,
//!     FixedCacheResolver::new(Arc::clone(&cache)),
//! )?;
//!
//! // First call misses and runs the underlying lookup.
//! let args = [component(42u64)];
//! let found = binding.invoke_result(&args, || {
//!     Ok::<_, String>(Some("Alice".to_string()))
//! })?;
//! assert_eq!(found.as_deref(), Some("Alice"));
//!
//! // Second call is served from the cache; the closure's answer is
//! // ignored because it never runs.
//! let cached = binding.invoke_result(&args, || Ok::<_, String>(None))?;
//! assert_eq!(cached.as_deref(), Some("Alice"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Implementation Notes
//!
//! - Bindings are validated once at construction; the invocation paths
//!   only check the argument count and the operation profile.
//! - The underlying operation sees no retries and no swallowed errors: a
//!   failure propagates as [`AsideError::Underlying`] and skips any
//!   `after_invocation` cache work.

use thiserror::Error;

use crate::error::CacheError;

pub mod binding;
pub mod context;
pub mod generator;
pub mod key;
pub mod outcome;
pub mod resolver;

pub use binding::{AsideBinding, AsideOperation};
pub use context::Invocation;
pub use generator::{KeyGenerator, TupleKeyGenerator};
pub use key::{component, InvocationKey, KeyComponent};
pub use outcome::CachedOutcome;
pub use resolver::{CacheResolver, FixedCacheResolver};

/// Error raised while running an adapted invocation.
#[derive(Debug, Error)]
pub enum AsideError<E> {
    /// The underlying operation failed; nothing was cached for it.
    #[error("underlying invocation failed: {0}")]
    Underlying(E),

    /// The cache itself rejected an operation.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The binding is for a different operation kind than the entry point
    /// called.
    #[error("method `{method}` is bound to {actual}, not {expected}")]
    Profile {
        method: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Wrong number of arguments for the bound method.
    #[error("method `{method}` takes {expected} arguments, {actual} supplied")]
    Arity {
        method: String,
        expected: usize,
        actual: usize,
    },

    /// The value-marked argument is not of the cached value type.
    #[error("argument at position {position} is not the cached value type")]
    ValueType { position: usize },
}

/// Error raised while constructing an [`AsideBinding`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    /// A key position lies beyond the method's arity.
    #[error("key position {position} out of range for a {arity}-argument method")]
    KeyPosition { position: usize, arity: usize },

    /// The same position was key-marked twice.
    #[error("key position {position} marked twice")]
    DuplicateKeyPosition { position: usize },

    /// The value position lies beyond the method's arity.
    #[error("value position {position} out of range for a {arity}-argument method")]
    ValuePosition { position: usize, arity: usize },

    /// The value position is also key-marked.
    #[error("value position {position} is also marked as a key")]
    ValuePositionIsKey { position: usize },

    /// Only `cache-put` bindings take a value position.
    #[error("{kind} bindings take no value position")]
    UnexpectedValue { kind: &'static str },

    /// `cache-put` bindings require a value position.
    #[error("cache-put bindings require a value position")]
    MissingValue,
}
