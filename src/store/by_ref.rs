//! By-reference store: shares stored values with readers.
//!
//! ## Key Components
//!
//! - [`ByRefStore`]: `RwLock`-guarded hash map holding `Arc<V>` entries.
//!
//! Readers receive a clone of the stored `Arc`, so a value handed out is
//! the same allocation the store keeps. Interior mutability in `V` is
//! therefore visible through the store. That is the by-reference hazard
//! [`ByValueStore`](crate::store::ByValueStore) removes.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use lockaside::store::{BackingStore, ByRefStore};
//!
//! let store: ByRefStore<u64, String> = ByRefStore::new();
//! store.put(1, Arc::new("a".to_string()))?;
//! assert!(store.contains_key(&1));
//! assert_eq!(store.len(), 1);
//! # Ok::<(), lockaside::store::StoreError>(())
//! ```
//!
//! ## Thread Safety
//!
//! `Send + Sync`. The map lock only protects map integrity; same-key
//! operation ordering is the cache's per-key lock manager's job.

use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::store::traits::{BackingStore, StoreError};

/// Store that hands out the stored `Arc<V>` itself.
#[derive(Debug)]
pub struct ByRefStore<K, V> {
    map: RwLock<FxHashMap<K, Arc<V>>>,
}

impl<K, V> ByRefStore<K, V> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            map: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<K, V> Default for ByRefStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> BackingStore<K, V> for ByRefStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: PartialEq + Send + Sync,
{
    /// Fetch the value at `key`.
    fn get(&self, key: &K) -> Result<Option<Arc<V>>, StoreError> {
        Ok(self.map.read().get(key).cloned())
    }

    /// Insert or overwrite the value at `key`.
    fn put(&self, key: K, value: Arc<V>) -> Result<(), StoreError> {
        self.map.write().insert(key, value);
        Ok(())
    }

    /// Insert or overwrite, returning the previous value.
    fn get_and_put(&self, key: K, value: Arc<V>) -> Result<Option<Arc<V>>, StoreError> {
        Ok(self.map.write().insert(key, value))
    }

    /// Insert only if `key` is absent.
    fn put_if_absent(&self, key: K, value: Arc<V>) -> Result<bool, StoreError> {
        match self.map.write().entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => Ok(false),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            },
        }
    }

    /// Remove the entry at `key`.
    fn remove(&self, key: &K) -> bool {
        self.map.write().remove(key).is_some()
    }

    /// Remove the entry at `key` only if its value equals `expected`.
    fn remove_if(&self, key: &K, expected: &V) -> bool {
        let mut map = self.map.write();
        let matches = match map.get(key) {
            Some(stored) => stored.as_ref() == expected,
            None => false,
        };
        if matches {
            map.remove(key);
        }
        matches
    }

    /// Remove the entry at `key`, returning the removed value.
    fn get_and_remove(&self, key: &K) -> Result<Option<Arc<V>>, StoreError> {
        Ok(self.map.write().remove(key))
    }

    /// Overwrite only if an entry is present.
    fn replace(&self, key: &K, value: Arc<V>) -> Result<bool, StoreError> {
        match self.map.write().get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Overwrite only if the present value equals `expected`.
    fn replace_if(&self, key: &K, expected: &V, value: Arc<V>) -> Result<bool, StoreError> {
        match self.map.write().get_mut(key) {
            Some(slot) if slot.as_ref() == expected => {
                *slot = value;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    /// Overwrite if present, returning the previous value.
    fn get_and_replace(&self, key: &K, value: Arc<V>) -> Result<Option<Arc<V>>, StoreError> {
        Ok(self
            .map
            .write()
            .get_mut(key)
            .map(|slot| std::mem::replace(slot, value)))
    }

    /// Check whether `key` has an entry.
    fn contains_key(&self, key: &K) -> bool {
        self.map.read().contains_key(key)
    }

    /// Current number of entries.
    fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Drop all entries.
    fn clear(&self) {
        self.map.write().clear();
    }

    /// Copy of the current key set.
    fn snapshot_keys(&self) -> Vec<K> {
        self.map.read().keys().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ByRefStore<&'static str, String> {
        ByRefStore::new()
    }

    #[test]
    fn basic_ops() {
        let store = store();
        let value = Arc::new("v1".to_string());

        store.put("k1", Arc::clone(&value)).unwrap();
        assert_eq!(store.get(&"k1").unwrap(), Some(Arc::clone(&value)));
        assert!(store.contains_key(&"k1"));
        assert_eq!(store.len(), 1);
        assert!(store.remove(&"k1"));
        assert!(!store.remove(&"k1"));
        assert!(store.is_empty());
    }

    #[test]
    fn readers_share_the_stored_allocation() {
        let store = store();
        let value = Arc::new("shared".to_string());
        store.put("k", Arc::clone(&value)).unwrap();

        let fetched = store.get(&"k").unwrap().unwrap();
        assert!(Arc::ptr_eq(&fetched, &value));
    }

    #[test]
    fn get_and_put_returns_previous() {
        let store = store();
        assert_eq!(
            store.get_and_put("k", Arc::new("v1".to_string())).unwrap(),
            None
        );
        let previous = store.get_and_put("k", Arc::new("v2".to_string())).unwrap();
        assert_eq!(previous.as_deref(), Some(&"v1".to_string()));
        assert_eq!(
            store.get(&"k").unwrap().as_deref(),
            Some(&"v2".to_string())
        );
    }

    #[test]
    fn put_if_absent_only_inserts_once() {
        let store = store();
        assert!(store
            .put_if_absent("k", Arc::new("first".to_string()))
            .unwrap());
        assert!(!store
            .put_if_absent("k", Arc::new("second".to_string()))
            .unwrap());
        assert_eq!(
            store.get(&"k").unwrap().as_deref(),
            Some(&"first".to_string())
        );
    }

    #[test]
    fn conditional_remove_checks_equality() {
        let store = store();
        store.put("k", Arc::new("v1".to_string())).unwrap();

        assert!(!store.remove_if(&"k", &"other".to_string()));
        assert!(store.contains_key(&"k"));
        assert!(store.remove_if(&"k", &"v1".to_string()));
        assert!(!store.contains_key(&"k"));
        assert!(!store.remove_if(&"k", &"v1".to_string()));
    }

    #[test]
    fn replace_requires_presence() {
        let store = store();
        assert!(!store.replace(&"k", Arc::new("v1".to_string())).unwrap());
        store.put("k", Arc::new("v1".to_string())).unwrap();
        assert!(store.replace(&"k", Arc::new("v2".to_string())).unwrap());
        assert_eq!(
            store.get(&"k").unwrap().as_deref(),
            Some(&"v2".to_string())
        );
    }

    #[test]
    fn conditional_replace_checks_equality() {
        let store = store();
        store.put("k", Arc::new("v1".to_string())).unwrap();

        assert!(!store
            .replace_if(&"k", &"other".to_string(), Arc::new("v2".to_string()))
            .unwrap());
        assert!(store
            .replace_if(&"k", &"v1".to_string(), Arc::new("v2".to_string()))
            .unwrap());
        assert_eq!(
            store.get(&"k").unwrap().as_deref(),
            Some(&"v2".to_string())
        );
    }

    #[test]
    fn get_and_remove_and_replace_return_previous() {
        let store = store();
        store.put("k", Arc::new("v1".to_string())).unwrap();

        let previous = store
            .get_and_replace(&"k", Arc::new("v2".to_string()))
            .unwrap();
        assert_eq!(previous.as_deref(), Some(&"v1".to_string()));

        let removed = store.get_and_remove(&"k").unwrap();
        assert_eq!(removed.as_deref(), Some(&"v2".to_string()));
        assert_eq!(store.get_and_remove(&"k").unwrap(), None);
        assert_eq!(
            store.get_and_replace(&"k", Arc::new("v3".to_string())).unwrap(),
            None
        );
    }

    #[test]
    fn snapshot_keys_and_clear() {
        let store = store();
        store.put("a", Arc::new("1".to_string())).unwrap();
        store.put("b", Arc::new("2".to_string())).unwrap();

        let mut keys = store.snapshot_keys();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b"]);

        store.clear();
        assert!(store.is_empty());
        assert!(store.snapshot_keys().is_empty());
    }
}
