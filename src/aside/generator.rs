//! Key derivation from invocations.

use crate::aside::context::Invocation;
use crate::aside::key::InvocationKey;

/// Derives the cache key for an invocation.
///
/// Implementations must be pure with respect to the invocation: equal
/// invocations must produce equal keys, or hits can never happen.
pub trait KeyGenerator: Send + Sync {
    /// Build the key for `invocation`.
    fn generate(&self, invocation: &Invocation<'_>) -> InvocationKey;
}

/// Default generator: the key is the tuple of key-marked arguments in
/// declaration order. With no key-marked arguments it yields the empty
/// tuple, so every such invocation shares one entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct TupleKeyGenerator;

impl KeyGenerator for TupleKeyGenerator {
    fn generate(&self, invocation: &Invocation<'_>) -> InvocationKey {
        InvocationKey::new(invocation.key_args().cloned().collect())
    }
}
