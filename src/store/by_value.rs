//! By-value store: isolates readers from the stored representation.
//!
//! ## Architecture
//!
//! Every value passes through the configured [`ValueCopier`] twice: once on
//! the way in (the store keeps its own snapshot, so later mutation of the
//! caller's data cannot corrupt it) and once on the way out (every reader
//! gets an independent copy, so nothing a reader does is visible to the
//! store or to other readers).
//!
//! ```text
//!   put(v) ──copy──► [ stored snapshot ] ──copy──► get() -> fresh copy
//! ```
//!
//! Keys are moved into the store, so ownership already isolates them and
//! only values are copied.
//!
//! ## Key Components
//!
//! - [`ByValueStore`]: the copying store.
//! - [`CloneCopier`]: copies via `Clone`. Cheap, but a `Clone` that shares
//!   interior state (an `Arc` field, for instance) is not a true copy.
//! - [`JsonCopier`]: copies by a serde round-trip through
//!   `serde_json::Value`. Slower, but structurally deep.
//!
//! ## Implementation Notes
//!
//! - Copy failures surface as [`StoreError::Copy`] before any mutation on
//!   the write path. A copy-out failure on an operation that also mutated
//!   (such as `get_and_put`) reports the error after the mutation stands.

use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::traits::{BackingStore, CopyError, StoreError, ValueCopier};

/// Copier that clones the value.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneCopier;

impl<V> ValueCopier<V> for CloneCopier
where
    V: Clone,
{
    /// Return `value.clone()`.
    fn copy(&self, value: &V) -> Result<V, CopyError> {
        Ok(value.clone())
    }
}

/// Copier that round-trips the value through `serde_json::Value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCopier;

impl<V> ValueCopier<V> for JsonCopier
where
    V: Serialize + DeserializeOwned,
{
    /// Serialize and re-deserialize `value`.
    fn copy(&self, value: &V) -> Result<V, CopyError> {
        let tree = serde_json::to_value(value).map_err(|err| CopyError(Box::new(err)))?;
        serde_json::from_value(tree).map_err(|err| CopyError(Box::new(err)))
    }
}

/// Store that keeps and hands out independent value copies.
pub struct ByValueStore<K, V> {
    map: RwLock<FxHashMap<K, Arc<V>>>,
    copier: Box<dyn ValueCopier<V>>,
}

impl<K, V> ByValueStore<K, V> {
    /// Create an empty store using `copier` for both directions.
    pub fn new<C>(copier: C) -> Self
    where
        C: ValueCopier<V> + 'static,
    {
        Self::from_boxed(Box::new(copier))
    }

    /// As [`new`](Self::new), for an already boxed copier.
    pub fn from_boxed(copier: Box<dyn ValueCopier<V>>) -> Self {
        Self {
            map: RwLock::new(FxHashMap::default()),
            copier,
        }
    }

    fn copy_in(&self, value: &V) -> Result<Arc<V>, StoreError> {
        Ok(Arc::new(self.copier.copy(value)?))
    }

    fn copy_out(&self, stored: Option<Arc<V>>) -> Result<Option<Arc<V>>, StoreError> {
        match stored {
            Some(value) => Ok(Some(Arc::new(self.copier.copy(&value)?))),
            None => Ok(None),
        }
    }
}

impl<K, V> BackingStore<K, V> for ByValueStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: PartialEq + Send + Sync,
{
    /// Fetch an independent copy of the value at `key`.
    fn get(&self, key: &K) -> Result<Option<Arc<V>>, StoreError> {
        let stored = self.map.read().get(key).cloned();
        self.copy_out(stored)
    }

    /// Snapshot `value` and store the snapshot at `key`.
    fn put(&self, key: K, value: Arc<V>) -> Result<(), StoreError> {
        let incoming = self.copy_in(&value)?;
        self.map.write().insert(key, incoming);
        Ok(())
    }

    /// Snapshot and store, returning a copy of the previous value.
    fn get_and_put(&self, key: K, value: Arc<V>) -> Result<Option<Arc<V>>, StoreError> {
        let incoming = self.copy_in(&value)?;
        let previous = self.map.write().insert(key, incoming);
        self.copy_out(previous)
    }

    /// Snapshot and store only if `key` is absent.
    fn put_if_absent(&self, key: K, value: Arc<V>) -> Result<bool, StoreError> {
        let incoming = self.copy_in(&value)?;
        match self.map.write().entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => Ok(false),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(incoming);
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

    /// Remove the entry at `key`, returning a copy of the removed value.
    fn get_and_remove(&self, key: &K) -> Result<Option<Arc<V>>, StoreError> {
        let removed = self.map.write().remove(key);
        self.copy_out(removed)
    }

    /// Snapshot and overwrite only if an entry is present.
    fn replace(&self, key: &K, value: Arc<V>) -> Result<bool, StoreError> {
        let incoming = self.copy_in(&value)?;
        match self.map.write().get_mut(key) {
            Some(slot) => {
                *slot = incoming;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Snapshot and overwrite only if the present value equals `expected`.
    fn replace_if(&self, key: &K, expected: &V, value: Arc<V>) -> Result<bool, StoreError> {
        let incoming = self.copy_in(&value)?;
        match self.map.write().get_mut(key) {
            Some(slot) if slot.as_ref() == expected => {
                *slot = incoming;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    /// Snapshot and overwrite if present, returning a copy of the previous
    /// value.
    fn get_and_replace(&self, key: &K, value: Arc<V>) -> Result<Option<Arc<V>>, StoreError> {
        let incoming = self.copy_in(&value)?;
        let previous = self
            .map
            .write()
            .get_mut(key)
            .map(|slot| std::mem::replace(slot, incoming));
        self.copy_out(previous)
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

impl<K, V> std::fmt::Debug for ByValueStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByValueStore")
            .field("len", &self.map.read().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    /// Copier that always fails, for the error path.
    struct RefusingCopier;

    impl<V> ValueCopier<V> for RefusingCopier {
        fn copy(&self, _value: &V) -> Result<V, CopyError> {
            Err(CopyError("copier refused".into()))
        }
    }

    #[test]
    fn reads_get_independent_copies() {
        let store: ByValueStore<u64, Vec<String>> = ByValueStore::new(CloneCopier);
        store
            .put(1, Arc::new(vec!["a".to_string(), "b".to_string()]))
            .unwrap();

        let first = store.get(&1).unwrap().unwrap();
        let second = store.get(&1).unwrap().unwrap();
        assert_eq!(first, second);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn stored_snapshot_is_independent_of_the_input() {
        let store: ByValueStore<u64, Vec<String>> = ByValueStore::new(CloneCopier);
        let original = Arc::new(vec!["a".to_string()]);
        store.put(1, Arc::clone(&original)).unwrap();

        let fetched = store.get(&1).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&fetched, &original));
        assert_eq!(*fetched, *original);
    }

    #[test]
    fn json_copier_round_trips_structured_values() {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Profile {
            name: String,
            visits: u32,
        }

        let store: ByValueStore<&'static str, Profile> = ByValueStore::new(JsonCopier);
        let profile = Profile {
            name: "alice".to_string(),
            visits: 3,
        };
        store.put("p", Arc::new(profile.clone())).unwrap();
        assert_eq!(store.get(&"p").unwrap().as_deref(), Some(&profile));
    }

    #[test]
    fn copy_failure_on_put_leaves_store_unchanged() {
        let store: ByValueStore<u64, String> = ByValueStore::new(RefusingCopier);
        let err = store.put(1, Arc::new("v".to_string())).unwrap_err();
        assert!(matches!(err, StoreError::Copy(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn conditional_ops_compare_against_the_snapshot() {
        let store: ByValueStore<u64, String> = ByValueStore::new(CloneCopier);
        store.put(1, Arc::new("v1".to_string())).unwrap();

        assert!(store.remove_if(&1, &"v1".to_string()));
        assert!(!store.contains_key(&1));

        store.put(1, Arc::new("v1".to_string())).unwrap();
        assert!(store
            .replace_if(&1, &"v1".to_string(), Arc::new("v2".to_string()))
            .unwrap());
        assert_eq!(
            store.get(&1).unwrap().as_deref(),
            Some(&"v2".to_string())
        );
    }
}
