//! Resolution of the cache an invocation targets.

use std::sync::Arc;

use crate::aside::context::Invocation;
use crate::aside::key::InvocationKey;
use crate::aside::outcome::CachedOutcome;
use crate::cache::Cache;

/// Picks the cache an invocation reads and writes.
///
/// Most bindings target one fixed cache; multi-tenant setups can route on
/// the invocation's arguments instead.
pub trait CacheResolver<V>: Send + Sync {
    /// The cache for `invocation`.
    fn resolve(&self, invocation: &Invocation<'_>) -> Arc<Cache<InvocationKey, CachedOutcome<V>>>;
}

/// Resolver that always hands back the same cache.
pub struct FixedCacheResolver<V> {
    cache: Arc<Cache<InvocationKey, CachedOutcome<V>>>,
}

impl<V> FixedCacheResolver<V> {
    /// Route every invocation to `cache`.
    pub fn new(cache: Arc<Cache<InvocationKey, CachedOutcome<V>>>) -> Self {
        Self { cache }
    }
}

impl<V> CacheResolver<V> for FixedCacheResolver<V>
where
    V: Send + Sync + 'static,
{
    fn resolve(&self, _invocation: &Invocation<'_>) -> Arc<Cache<InvocationKey, CachedOutcome<V>>> {
        Arc::clone(&self.cache)
    }
}

impl<V> std::fmt::Debug for FixedCacheResolver<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedCacheResolver").finish()
    }
}
