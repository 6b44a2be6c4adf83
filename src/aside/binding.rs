//! Bindings between adapted methods and their caching behavior.
//!
//! ## Architecture
//!
//! A binding is configured once per method and then drives every call:
//!
//! ```text
//!   invoke_*(args, proceed)
//!        │
//!        ├─ profile + arity check
//!        ├─ resolver ──► target Cache
//!        ├─ generator ──► InvocationKey
//!        └─ operation-specific cache work around proceed()
//! ```
//!
//! ## Key Components
//!
//! - [`AsideOperation`]: what the method does to its cache, with the
//!   per-operation switches (`skip_get`, `after_invocation`).
//! - [`AsideBinding`]: validated method profile plus resolver and key
//!   generator. Construction rejects inconsistent key and value
//!   positions, so the invocation paths never re-validate.
//!
//! ## Implementation Notes
//!
//! - A `cache-result` hit short-circuits the underlying operation, and a
//!   cached `Null` outcome is a hit like any other.
//! - `after_invocation` operations skip their cache work when the
//!   underlying operation fails; their `before` counterparts have already
//!   mutated the cache by then.
//! - Key positions passed explicitly are stored sorted ascending. An
//!   empty list means "every argument except the value position".

use std::sync::Arc;

use tracing::{debug, trace};

use crate::aside::context::Invocation;
use crate::aside::generator::{KeyGenerator, TupleKeyGenerator};
use crate::aside::key::KeyComponent;
use crate::aside::outcome::CachedOutcome;
use crate::aside::resolver::CacheResolver;
use crate::aside::{AsideError, BindingError};

// ---------------------------------------------------------------------------
// AsideOperation
// ---------------------------------------------------------------------------

/// What an adapted method does to its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsideOperation {
    /// Cache the produced value under the invocation key; later hits
    /// short-circuit the method.
    CacheResult {
        /// Skip the pre-invocation lookup and always run the method. The
        /// produced value still overwrites the cached outcome.
        skip_get: bool,
    },
    /// Store an argument-supplied value under the invocation key.
    CachePut {
        /// Write after the underlying invocation instead of before.
        after_invocation: bool,
    },
    /// Remove the entry at the invocation key.
    RemoveEntry {
        /// Remove after the underlying invocation instead of before.
        after_invocation: bool,
    },
    /// Remove every entry in the resolved cache.
    RemoveAll {
        /// Remove after the underlying invocation instead of before.
        after_invocation: bool,
    },
}

impl AsideOperation {
    /// Short name used in errors and trace events.
    pub const fn kind(&self) -> &'static str {
        match self {
            AsideOperation::CacheResult { .. } => "cache-result",
            AsideOperation::CachePut { .. } => "cache-put",
            AsideOperation::RemoveEntry { .. } => "remove-entry",
            AsideOperation::RemoveAll { .. } => "remove-all",
        }
    }
}

// ---------------------------------------------------------------------------
// AsideBinding
// ---------------------------------------------------------------------------

/// Validated binding of one method to one caching operation.
pub struct AsideBinding<V> {
    method: String,
    operation: AsideOperation,
    arity: usize,
    // Effective key positions, ascending and in bounds.
    key_positions: Vec<usize>,
    value_position: Option<usize>,
    resolver: Arc<dyn CacheResolver<V>>,
    generator: Arc<dyn KeyGenerator>,
}

impl<V> AsideBinding<V> {
    /// Bind `method` with the default [`TupleKeyGenerator`].
    ///
    /// `key_positions` lists the key-marked argument positions; empty
    /// means every argument except `value_position`. `value_position` is
    /// required for `cache-put` bindings and rejected for all others.
    pub fn try_new(
        method: impl Into<String>,
        operation: AsideOperation,
        arity: usize,
        key_positions: &[usize],
        value_position: Option<usize>,
        resolver: impl CacheResolver<V> + 'static,
    ) -> Result<Self, BindingError> {
        Self::with_generator(
            method,
            operation,
            arity,
            key_positions,
            value_position,
            resolver,
            TupleKeyGenerator,
        )
    }

    /// As [`try_new`](Self::try_new), with a custom key generator.
    pub fn with_generator(
        method: impl Into<String>,
        operation: AsideOperation,
        arity: usize,
        key_positions: &[usize],
        value_position: Option<usize>,
        resolver: impl CacheResolver<V> + 'static,
        generator: impl KeyGenerator + 'static,
    ) -> Result<Self, BindingError> {
        match (&operation, value_position) {
            (AsideOperation::CachePut { .. }, None) => return Err(BindingError::MissingValue),
            (AsideOperation::CachePut { .. }, Some(_)) => {},
            (_, Some(_)) => {
                return Err(BindingError::UnexpectedValue {
                    kind: operation.kind(),
                });
            },
            (_, None) => {},
        }

        let mut seen = vec![false; arity];
        let mut effective = Vec::with_capacity(key_positions.len());
        for &position in key_positions {
            if position >= arity {
                return Err(BindingError::KeyPosition { position, arity });
            }
            if seen[position] {
                return Err(BindingError::DuplicateKeyPosition { position });
            }
            seen[position] = true;
            effective.push(position);
        }
        if let Some(position) = value_position {
            if position >= arity {
                return Err(BindingError::ValuePosition { position, arity });
            }
            if seen[position] {
                return Err(BindingError::ValuePositionIsKey { position });
            }
        }

        if effective.is_empty() {
            effective = (0..arity)
                .filter(|position| Some(*position) != value_position)
                .collect();
        } else {
            effective.sort_unstable();
        }

        Ok(Self {
            method: method.into(),
            operation,
            arity,
            key_positions: effective,
            value_position,
            resolver: Arc::new(resolver),
            generator: Arc::new(generator),
        })
    }

    /// Name of the bound method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The bound operation.
    pub fn operation(&self) -> AsideOperation {
        self.operation
    }

    /// Expected argument count.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Effective key positions, ascending.
    pub fn key_positions(&self) -> &[usize] {
        &self.key_positions
    }

    /// Position of the cached value argument, for `cache-put` bindings.
    pub fn value_position(&self) -> Option<usize> {
        self.value_position
    }

    fn check_arity<E>(&self, actual: usize) -> Result<(), AsideError<E>> {
        if actual == self.arity {
            Ok(())
        } else {
            Err(AsideError::Arity {
                method: self.method.clone(),
                expected: self.arity,
                actual,
            })
        }
    }

    fn profile_mismatch<E>(&self, expected: &'static str) -> AsideError<E> {
        AsideError::Profile {
            method: self.method.clone(),
            expected,
            actual: self.operation.kind(),
        }
    }
}

impl<V> AsideBinding<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Run a `cache-result` invocation.
    ///
    /// On a hit the cached outcome is returned and `proceed` never runs;
    /// a cached `Null` yields `Ok(None)` the same way. On a miss (or with
    /// `skip_get`) the produced result is cached, `None` included.
    pub fn invoke_result<E, F>(
        &self,
        args: &[Arc<dyn KeyComponent>],
        proceed: F,
    ) -> Result<Option<V>, AsideError<E>>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        let skip_get = match self.operation {
            AsideOperation::CacheResult { skip_get } => skip_get,
            _ => return Err(self.profile_mismatch("cache-result")),
        };
        self.check_arity(args.len())?;
        let invocation = Invocation::new(&self.method, args, &self.key_positions);
        let cache = self.resolver.resolve(&invocation);
        let key = self.generator.generate(&invocation);

        if !skip_get {
            if let Some(outcome) = cache.get(&key)? {
                trace!(method = %self.method, null = outcome.is_null(), "cached outcome served");
                return Ok(outcome.value().cloned());
            }
        }

        let produced = proceed().map_err(AsideError::Underlying)?;
        trace!(method = %self.method, null = produced.is_none(), "invocation outcome stored");
        cache.put(key, CachedOutcome::from_option(produced.clone()))?;
        Ok(produced)
    }

    /// Run a `cache-put` invocation: store the value-marked argument
    /// under the invocation key, before or after `proceed` per the
    /// binding.
    pub fn invoke_put<R, E, F>(
        &self,
        args: &[Arc<dyn KeyComponent>],
        proceed: F,
    ) -> Result<R, AsideError<E>>
    where
        F: FnOnce() -> Result<R, E>,
    {
        let (after_invocation, position) = match (self.operation, self.value_position) {
            (AsideOperation::CachePut { after_invocation }, Some(position)) => {
                (after_invocation, position)
            },
            _ => return Err(self.profile_mismatch("cache-put")),
        };
        self.check_arity(args.len())?;
        let value = match args[position].as_any().downcast_ref::<V>() {
            Some(value) => value.clone(),
            None => return Err(AsideError::ValueType { position }),
        };
        let invocation = Invocation::new(&self.method, args, &self.key_positions);
        let cache = self.resolver.resolve(&invocation);
        let key = self.generator.generate(&invocation);

        if after_invocation {
            let output = proceed().map_err(AsideError::Underlying)?;
            cache.put(key, CachedOutcome::Value(value))?;
            debug!(method = %self.method, "value cached after invocation");
            Ok(output)
        } else {
            cache.put(key, CachedOutcome::Value(value))?;
            debug!(method = %self.method, "value cached before invocation");
            proceed().map_err(AsideError::Underlying)
        }
    }

    /// Run a `remove-entry` invocation: drop the entry at the invocation
    /// key, before or after `proceed` per the binding.
    pub fn invoke_remove_entry<R, E, F>(
        &self,
        args: &[Arc<dyn KeyComponent>],
        proceed: F,
    ) -> Result<R, AsideError<E>>
    where
        F: FnOnce() -> Result<R, E>,
    {
        let after_invocation = match self.operation {
            AsideOperation::RemoveEntry { after_invocation } => after_invocation,
            _ => return Err(self.profile_mismatch("remove-entry")),
        };
        self.check_arity(args.len())?;
        let invocation = Invocation::new(&self.method, args, &self.key_positions);
        let cache = self.resolver.resolve(&invocation);
        let key = self.generator.generate(&invocation);

        if after_invocation {
            let output = proceed().map_err(AsideError::Underlying)?;
            let removed = cache.remove(&key)?;
            debug!(method = %self.method, removed, "entry invalidated after invocation");
            Ok(output)
        } else {
            let removed = cache.remove(&key)?;
            debug!(method = %self.method, removed, "entry invalidated before invocation");
            proceed().map_err(AsideError::Underlying)
        }
    }

    /// Run a `remove-all` invocation: empty the resolved cache, before or
    /// after `proceed` per the binding.
    pub fn invoke_remove_all<R, E, F>(
        &self,
        args: &[Arc<dyn KeyComponent>],
        proceed: F,
    ) -> Result<R, AsideError<E>>
    where
        F: FnOnce() -> Result<R, E>,
    {
        let after_invocation = match self.operation {
            AsideOperation::RemoveAll { after_invocation } => after_invocation,
            _ => return Err(self.profile_mismatch("remove-all")),
        };
        self.check_arity(args.len())?;
        let invocation = Invocation::new(&self.method, args, &self.key_positions);
        let cache = self.resolver.resolve(&invocation);

        if after_invocation {
            let output = proceed().map_err(AsideError::Underlying)?;
            cache.remove_all()?;
            debug!(method = %self.method, "cache emptied after invocation");
            Ok(output)
        } else {
            cache.remove_all()?;
            debug!(method = %self.method, "cache emptied before invocation");
            proceed().map_err(AsideError::Underlying)
        }
    }
}

impl<V> std::fmt::Debug for AsideBinding<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsideBinding")
            .field("method", &self.method)
            .field("operation", &self.operation.kind())
            .field("arity", &self.arity)
            .field("key_positions", &self.key_positions)
            .field("value_position", &self.value_position)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
