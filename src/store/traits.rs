//! Storage backends for the cache.
//!
//! Stores focus on key/value ownership and map semantics. They perform no
//! key-level locking of their own: the cache serializes same-key access
//! above this layer, and the store only guards its map for point-in-time
//! integrity. This keeps locking policy independent of how values are
//! stored and copied.

use std::sync::Arc;

use thiserror::Error;

use crate::error::BoxError;

/// Error produced when a value copy fails.
#[derive(Debug, Error)]
#[error("value copy failed: {0}")]
pub struct CopyError(#[source] pub BoxError);

/// Error returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A by-value copy failed on the way in or out of the store.
    #[error(transparent)]
    Copy(#[from] CopyError),
}

/// Produces independent copies of values for by-value storage.
///
/// Implementations must round-trip faithfully (the copy compares equal to
/// the original) and must not share mutable state between copy and
/// original.
pub trait ValueCopier<V>: Send + Sync {
    /// Return an independent copy of `value`.
    fn copy(&self, value: &V) -> Result<V, CopyError>;
}

/// Keyed map abstraction the cache writes through.
///
/// Values travel as `Arc<V>` so by-reference stores can share them without
/// copying. Only by-value stores copy, which is why the read and write
/// operations are fallible. Conditional operations compare with the stored
/// representation directly, so implementations require `V: PartialEq`.
pub trait BackingStore<K, V>: Send + Sync {
    /// Fetch the value at `key`.
    fn get(&self, key: &K) -> Result<Option<Arc<V>>, StoreError>;

    /// Insert or overwrite the value at `key`.
    fn put(&self, key: K, value: Arc<V>) -> Result<(), StoreError>;

    /// Insert or overwrite, returning the previous value if present.
    fn get_and_put(&self, key: K, value: Arc<V>) -> Result<Option<Arc<V>>, StoreError>;

    /// Insert only if `key` is absent. Returns whether it inserted.
    fn put_if_absent(&self, key: K, value: Arc<V>) -> Result<bool, StoreError>;

    /// Remove the entry at `key`. Returns whether an entry was removed.
    fn remove(&self, key: &K) -> bool;

    /// Remove the entry at `key` only if its value equals `expected`.
    fn remove_if(&self, key: &K, expected: &V) -> bool;

    /// Remove the entry at `key`, returning the removed value.
    fn get_and_remove(&self, key: &K) -> Result<Option<Arc<V>>, StoreError>;

    /// Overwrite the value at `key` only if an entry is present.
    fn replace(&self, key: &K, value: Arc<V>) -> Result<bool, StoreError>;

    /// Overwrite only if the present value equals `expected`.
    fn replace_if(&self, key: &K, expected: &V, value: Arc<V>) -> Result<bool, StoreError>;

    /// Overwrite the value at `key` if present, returning the previous one.
    fn get_and_replace(&self, key: &K, value: Arc<V>) -> Result<Option<Arc<V>>, StoreError>;

    /// Check whether `key` has an entry.
    fn contains_key(&self, key: &K) -> bool;

    /// Current number of entries.
    fn len(&self) -> usize;

    /// Check whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries.
    fn clear(&self);

    /// Copy of the current key set, in no particular order.
    fn snapshot_keys(&self) -> Vec<K>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_error_display_includes_source() {
        let err = CopyError("field not serializable".into());
        assert!(err.to_string().contains("field not serializable"));
    }

    #[test]
    fn store_error_wraps_copy_error() {
        let err = StoreError::from(CopyError("boom".into()));
        assert!(matches!(err, StoreError::Copy(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<CopyError>();
        assert_error::<StoreError>();
    }
}
