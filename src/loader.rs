//! Read-through loader seam.
//!
//! A loader supplies values the cache does not hold: synchronously on a
//! `get` miss, and asynchronously for
//! [`Cache::load`](crate::cache::Cache::load) /
//! [`Cache::load_all`](crate::cache::Cache::load_all). Loader calls run
//! under the key's lock, so a loader must not call back into the cache for
//! the key it is loading.

use crate::error::BoxError;

/// Supplies values for keys the cache cannot resolve from its store.
pub trait CacheLoader<K: Clone, V>: Send + Sync {
    /// Load the value for `key`, or `None` if the source has no entry.
    fn load(&self, key: &K) -> Result<Option<V>, BoxError>;

    /// Load values for `keys`, omitting keys the source has no entry for.
    ///
    /// The default delegates to [`load`](Self::load) per key; bulk sources
    /// can override with one round trip.
    fn load_all(&self, keys: &[K]) -> Result<Vec<(K, V)>, BoxError> {
        let mut loaded = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.load(key)? {
                loaded.push((key.clone(), value));
            }
        }
        Ok(loaded)
    }
}

/// Adapter turning a closure into a [`CacheLoader`].
pub struct FnLoader<F> {
    load: F,
}

impl<F> FnLoader<F> {
    /// Wrap `load` as a loader.
    pub fn new(load: F) -> Self {
        Self { load }
    }
}

impl<K, V, F> CacheLoader<K, V> for FnLoader<F>
where
    K: Clone,
    F: Fn(&K) -> Result<Option<V>, BoxError> + Send + Sync,
{
    /// Invoke the wrapped closure.
    fn load(&self, key: &K) -> Result<Option<V>, BoxError> {
        (self.load)(key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_loader_delegates() {
        let loader = FnLoader::new(|key: &u64| {
            if *key < 10 {
                Ok(Some(key * 2))
            } else {
                Ok(None)
            }
        });
        assert_eq!(loader.load(&4).unwrap(), Some(8));
        assert_eq!(loader.load(&11).unwrap(), None);
    }

    #[test]
    fn default_load_all_omits_absent_keys() {
        let loader = FnLoader::new(|key: &u64| {
            if *key % 2 == 0 {
                Ok(Some(format!("v{key}")))
            } else {
                Ok(None)
            }
        });
        let loaded = loader.load_all(&[1, 2, 3, 4]).unwrap();
        assert_eq!(
            loaded,
            vec![(2, "v2".to_string()), (4, "v4".to_string())]
        );
    }

    #[test]
    fn load_all_propagates_errors() {
        let loader = FnLoader::new(|_key: &u64| -> Result<Option<String>, BoxError> {
            Err("source offline".into())
        });
        let err = loader.load_all(&[1]).unwrap_err();
        assert!(err.to_string().contains("source offline"));
    }
}
