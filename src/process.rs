//! Lock-guarded read-modify-write view over one cache entry.
//!
//! ## Key Components
//!
//! - [`MutableEntry`]: the view handed to entry-processor closures by
//!   [`Cache::invoke`](crate::cache::Cache::invoke) and
//!   [`Cache::try_invoke`](crate::cache::Cache::try_invoke).
//!
//! The entry records intent, not effects: `set_value` and `remove` stage a
//! pending mutation, and the cache commits the final staged state to the
//! store exactly once after the closure returns. If both are called, the
//! latest call wins. If the closure fails (or panics), the commit is
//! skipped and the store is untouched.
//!
//! The existence snapshot is taken when the view is created, under the
//! key's lock, so it cannot be invalidated by concurrent writers for the
//! lifetime of the view.

use std::sync::Arc;

use crate::store::{BackingStore, StoreError};

/// Staged mutation for one entry.
enum Pending<V> {
    Untouched,
    Put(Arc<V>),
    Remove,
}

/// What a committed entry view actually did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mutation {
    Put,
    Removed,
}

/// Mutable view of one entry, staged until commit.
pub struct MutableEntry<'a, K, V> {
    key: &'a K,
    store: &'a dyn BackingStore<K, V>,
    existed: bool,
    pending: Pending<V>,
}

impl<'a, K, V> MutableEntry<'a, K, V>
where
    K: Clone,
{
    pub(crate) fn new(key: &'a K, store: &'a dyn BackingStore<K, V>) -> Self {
        Self {
            key,
            store,
            existed: store.contains_key(key),
            pending: Pending::Untouched,
        }
    }

    /// The key this view is bound to.
    pub fn key(&self) -> &K {
        self.key
    }

    /// Whether the entry exists, as staged by this view.
    ///
    /// Reflects pending mutations: `true` after `set_value`, `false` after
    /// `remove`, otherwise the existence snapshot taken at creation.
    pub fn exists(&self) -> bool {
        match self.pending {
            Pending::Put(_) => true,
            Pending::Remove => false,
            Pending::Untouched => self.existed,
        }
    }

    /// The entry's value, as staged by this view.
    ///
    /// Returns the pending value after `set_value`, `None` after `remove`,
    /// and otherwise reads through to the store.
    pub fn value(&self) -> Result<Option<Arc<V>>, StoreError> {
        match &self.pending {
            Pending::Put(value) => Ok(Some(Arc::clone(value))),
            Pending::Remove => Ok(None),
            Pending::Untouched => self.store.get(self.key),
        }
    }

    /// Stage a write of `value`, replacing any staged removal.
    pub fn set_value(&mut self, value: V) {
        self.pending = Pending::Put(Arc::new(value));
    }

    /// Stage a removal, replacing any staged write.
    pub fn remove(&mut self) {
        self.pending = Pending::Remove;
    }

    /// Apply the staged state to the store.
    ///
    /// Called once by the cache, under the key's lock, after the processor
    /// closure returns successfully.
    pub(crate) fn commit(self) -> Result<Option<Mutation>, StoreError> {
        match self.pending {
            Pending::Untouched => Ok(None),
            Pending::Put(value) => {
                self.store.put(self.key.clone(), value)?;
                Ok(Some(Mutation::Put))
            },
            Pending::Remove => {
                if self.store.remove(self.key) {
                    Ok(Some(Mutation::Removed))
                } else {
                    Ok(None)
                }
            },
        }
    }
}

impl<K, V> std::fmt::Debug for MutableEntry<'_, K, V>
where
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let staged = match self.pending {
            Pending::Untouched => "untouched",
            Pending::Put(_) => "put",
            Pending::Remove => "remove",
        };
        f.debug_struct("MutableEntry")
            .field("key", &self.key)
            .field("existed", &self.existed)
            .field("staged", &staged)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ByRefStore;

    fn seeded() -> ByRefStore<&'static str, String> {
        let store = ByRefStore::new();
        store.put("k", Arc::new("old".to_string())).unwrap();
        store
    }

    #[test]
    fn untouched_commit_changes_nothing() {
        let store = seeded();
        let entry = MutableEntry::new(&"k", &store);
        assert!(entry.exists());
        assert_eq!(entry.commit().unwrap(), None);
        assert_eq!(
            store.get(&"k").unwrap().as_deref(),
            Some(&"old".to_string())
        );
    }

    #[test]
    fn set_value_stages_then_commits() {
        let store = seeded();
        let mut entry = MutableEntry::new(&"k", &store);
        entry.set_value("new".to_string());

        // Staged, not yet visible in the store.
        assert_eq!(
            entry.value().unwrap().as_deref(),
            Some(&"new".to_string())
        );
        assert_eq!(
            store.get(&"k").unwrap().as_deref(),
            Some(&"old".to_string())
        );

        assert_eq!(entry.commit().unwrap(), Some(Mutation::Put));
        assert_eq!(
            store.get(&"k").unwrap().as_deref(),
            Some(&"new".to_string())
        );
    }

    #[test]
    fn remove_then_set_value_keeps_the_value() {
        let store = seeded();
        let mut entry = MutableEntry::new(&"k", &store);
        entry.remove();
        assert!(!entry.exists());
        entry.set_value("final".to_string());
        assert!(entry.exists());

        assert_eq!(entry.commit().unwrap(), Some(Mutation::Put));
        assert_eq!(
            store.get(&"k").unwrap().as_deref(),
            Some(&"final".to_string())
        );
    }

    #[test]
    fn set_value_then_remove_removes() {
        let store = seeded();
        let mut entry = MutableEntry::new(&"k", &store);
        entry.set_value("never stored".to_string());
        entry.remove();
        assert_eq!(entry.value().unwrap(), None);

        assert_eq!(entry.commit().unwrap(), Some(Mutation::Removed));
        assert!(!store.contains_key(&"k"));
    }

    #[test]
    fn remove_on_absent_entry_commits_nothing() {
        let store: ByRefStore<&'static str, String> = ByRefStore::new();
        let mut entry = MutableEntry::new(&"missing", &store);
        assert!(!entry.exists());
        entry.remove();
        assert_eq!(entry.commit().unwrap(), None);
    }

    #[test]
    fn value_reads_through_when_untouched() {
        let store = seeded();
        let entry = MutableEntry::new(&"k", &store);
        assert_eq!(
            entry.value().unwrap().as_deref(),
            Some(&"old".to_string())
        );
    }
}
