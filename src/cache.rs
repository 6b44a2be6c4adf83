//! The cache: per-key-locked store access, lifecycle and loaders.
//!
//! ## Key Components
//!
//! - [`Cache`]: composes a [`LockManager`](crate::lock::LockManager), a
//!   [`BackingStore`](crate::store::BackingStore), a statistics recorder
//!   and an optional [`CacheLoader`](crate::loader::CacheLoader) behind the
//!   keyed-cache operations.
//! - [`CacheState`]: `Uninitialised -> Started -> Stopped`, forward-only.
//!   Every data operation requires `Started`.
//! - [`CacheIter`]: entry traversal with per-entry locking and removal
//!   support.
//! - [`LoadHandle`]: pending result of an asynchronous `load`/`load_all`.
//!
//! ## Example Usage
//!
//! ```
//! use lockaside::builder::CacheBuilder;
//! use lockaside::error::BoxError;
//! use lockaside::loader::FnLoader;
//!
//! let loader = FnLoader::new(|key: &String| -> Result<Option<String>, BoxError> {
//!     Ok(Some(format!("value of {key}")))
//! });
//! let cache = CacheBuilder::<String, String>::new("users")
//!     .loader(loader)
//!     .statistics(true)
//!     .build_started()?;
//!
//! // Miss, resolved read-through from the loader.
//! let value = cache.get(&"u1".to_string())?;
//! assert_eq!(value.as_deref().map(String::as_str), Some("value of u1"));
//! # Ok::<(), lockaside::error::CacheError>(())
//! ```
//!
//! ## Thread Safety
//!
//! `Cache` is `Send + Sync` and is shared behind an `Arc`. Store mutation
//! for a key happens only while holding that key's lock; operations on
//! different keys run in parallel. Bulk operations (`put_all`,
//! `remove_all`) lock each key independently and are not atomic as a
//! whole.
//!
//! ## Implementation Notes
//!
//! - A `get` miss runs the loader under the key's lock and stores the
//!   result before releasing it, so concurrent readers of the same key
//!   never trigger duplicate loads.
//! - Locks are not reentrant: loaders and entry processors must not call
//!   back into the cache for the key they run under.
//! - Statistics writes are relaxed atomics; disabled statistics skip
//!   timing entirely.
//! - `stop` first blocks new operations, then drains in-flight
//!   asynchronous loads, then clears the store, so nothing can repopulate
//!   a stopped cache.

use std::hash::Hash;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::error::{BoxError, CacheError};
pub use crate::executor::LoadHandle;
use crate::executor::LoadExecutor;
use crate::loader::CacheLoader;
use crate::lock::LockManager;
use crate::process::{Mutation, MutableEntry};
use crate::stats::{CacheStats, CacheStatsSnapshot};
use crate::store::BackingStore;

// ---------------------------------------------------------------------------
// CacheState
// ---------------------------------------------------------------------------

/// Lifecycle state of a cache. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheState {
    /// Built but not yet started.
    Uninitialised,
    /// Accepting operations.
    Started,
    /// Stopped and emptied. Terminal.
    Stopped,
}

impl CacheState {
    /// Whether operations are accepted in this state.
    pub const fn is_started(self) -> bool {
        matches!(self, CacheState::Started)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => CacheState::Started,
            2 => CacheState::Stopped,
            _ => CacheState::Uninitialised,
        }
    }
}

impl std::fmt::Display for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            CacheState::Uninitialised => "uninitialised",
            CacheState::Started => "started",
            CacheState::Stopped => "stopped",
        };
        f.write_str(text)
    }
}

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

/// One key/value pair yielded during traversal.
#[derive(Debug)]
pub struct CacheEntry<K, V> {
    key: K,
    value: Arc<V>,
}

impl<K, V> CacheEntry<K, V> {
    /// The entry's key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The entry's value.
    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    /// Deconstruct into key and value.
    pub fn into_parts(self) -> (K, Arc<V>) {
        (self.key, self.value)
    }
}

impl<K: Clone, V> Clone for CacheEntry<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: Arc::clone(&self.value),
        }
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Keyed cache with per-key locking, lifecycle and read-through loading.
///
/// Built by [`CacheBuilder`](crate::builder::CacheBuilder).
pub struct Cache<K, V> {
    name: String,
    state: AtomicU8,
    store: Box<dyn BackingStore<K, V>>,
    locks: LockManager<K>,
    stats: CacheStats,
    stats_enabled: bool,
    loader: Option<Arc<dyn CacheLoader<K, V>>>,
    executor: Option<LoadExecutor>,
    // Back-reference for asynchronous load jobs; Weak so queued jobs never
    // keep a dropped cache alive.
    myself: Weak<Cache<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub(crate) fn assemble(
        name: String,
        store: Box<dyn BackingStore<K, V>>,
        loader: Option<Arc<dyn CacheLoader<K, V>>>,
        stats_enabled: bool,
        load_workers: usize,
    ) -> Arc<Self> {
        let executor = loader.as_ref().map(|_| LoadExecutor::new(load_workers));
        Arc::new_cyclic(|myself| Self {
            name,
            state: AtomicU8::new(0),
            store,
            locks: LockManager::new(),
            stats: CacheStats::new(),
            stats_enabled,
            loader,
            executor,
            myself: Weak::clone(myself),
        })
    }

    // -- lifecycle --------------------------------------------------------

    /// Transition `Uninitialised -> Started`.
    pub fn start(&self) -> Result<(), CacheError> {
        self.transition(CacheState::Uninitialised, CacheState::Started)?;
        info!(cache = %self.name, "cache started");
        Ok(())
    }

    /// Transition `Started -> Stopped`, draining in-flight loads and
    /// clearing every entry. Terminal.
    pub fn stop(&self) -> Result<(), CacheError> {
        self.transition(CacheState::Started, CacheState::Stopped)?;
        if let Some(executor) = &self.executor {
            executor.stop();
        }
        self.store.clear();
        info!(cache = %self.name, "cache stopped, entries cleared");
        Ok(())
    }

    fn transition(&self, from: CacheState, to: CacheState) -> Result<(), CacheError> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|actual| CacheError::Lifecycle {
                name: self.name.clone(),
                from: CacheState::from_u8(actual),
                to,
            })?;
        Ok(())
    }

    /// This cache's diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CacheState {
        CacheState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn ensure_started(&self) -> Result<(), CacheError> {
        let state = self.state();
        if state.is_started() {
            Ok(())
        } else {
            Err(CacheError::NotStarted {
                name: self.name.clone(),
                state,
            })
        }
    }

    fn timer(&self) -> Option<Instant> {
        if self.stats_enabled {
            Some(Instant::now())
        } else {
            None
        }
    }

    // -- reads ------------------------------------------------------------

    /// Fetch the value at `key`.
    ///
    /// On a miss with a loader configured, the loader runs under the key's
    /// lock and its result (if any) is stored before the lock is released.
    /// The read still counts as a miss.
    pub fn get(&self, key: &K) -> Result<Option<Arc<V>>, CacheError> {
        self.ensure_started()?;
        let started_at = self.timer();
        let value = {
            let _guard = self.locks.acquire(key.clone());
            let looked_up = self.store.get(key)?;
            match looked_up {
                Some(value) => {
                    if self.stats_enabled {
                        self.stats.record_hit();
                    }
                    Some(value)
                },
                None => {
                    if self.stats_enabled {
                        self.stats.record_miss();
                    }
                    self.load_through(key)?
                },
            }
        };
        if let Some(started_at) = started_at {
            self.stats.add_get_time(started_at.elapsed());
        }
        Ok(value)
    }

    /// Read-through on a miss; caller holds the key's lock.
    fn load_through(&self, key: &K) -> Result<Option<Arc<V>>, CacheError> {
        let loader = match &self.loader {
            Some(loader) => loader,
            None => return Ok(None),
        };
        match loader.load(key).map_err(CacheError::Loader)? {
            Some(value) => {
                let value = Arc::new(value);
                self.store.put(key.clone(), Arc::clone(&value))?;
                debug!(cache = %self.name, "read-through load stored a value");
                Ok(Some(value))
            },
            None => Ok(None),
        }
    }

    /// Fetch the values for `keys`, omitting keys that resolve to absent.
    pub fn get_all(&self, keys: &[K]) -> Result<FxHashMap<K, Arc<V>>, CacheError> {
        self.ensure_started()?;
        let mut found = FxHashMap::default();
        for key in keys {
            if let Some(value) = self.get(key)? {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    /// Check whether `key` has an entry. Records no statistics.
    pub fn contains_key(&self, key: &K) -> Result<bool, CacheError> {
        self.ensure_started()?;
        Ok(self.store.contains_key(key))
    }

    /// Current number of entries.
    pub fn len(&self) -> Result<usize, CacheError> {
        self.ensure_started()?;
        Ok(self.store.len())
    }

    /// Check whether the cache is empty.
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    // -- writes -----------------------------------------------------------

    /// Insert or overwrite the value at `key`.
    pub fn put(&self, key: K, value: V) -> Result<(), CacheError> {
        self.ensure_started()?;
        let started_at = self.timer();
        let value = Arc::new(value);
        {
            let _guard = self.locks.acquire(key.clone());
            self.store.put(key, value)?;
        }
        if self.stats_enabled {
            self.stats.record_put();
            if let Some(started_at) = started_at {
                self.stats.add_put_time(started_at.elapsed());
            }
        }
        Ok(())
    }

    /// Insert or overwrite, returning the previous value if present.
    pub fn get_and_put(&self, key: K, value: V) -> Result<Option<Arc<V>>, CacheError> {
        self.ensure_started()?;
        let started_at = self.timer();
        let value = Arc::new(value);
        let previous = {
            let _guard = self.locks.acquire(key.clone());
            self.store.get_and_put(key, value)?
        };
        if self.stats_enabled {
            match &previous {
                Some(_) => self.stats.record_hit(),
                None => self.stats.record_miss(),
            }
            self.stats.record_put();
            if let Some(started_at) = started_at {
                let elapsed = started_at.elapsed();
                self.stats.add_get_time(elapsed);
                self.stats.add_put_time(elapsed);
            }
        }
        Ok(previous)
    }

    /// Insert every entry, each under its own key lock.
    pub fn put_all<I>(&self, entries: I) -> Result<(), CacheError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.ensure_started()?;
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Insert only if `key` is absent. Statistics count only actual
    /// inserts.
    pub fn put_if_absent(&self, key: K, value: V) -> Result<bool, CacheError> {
        self.ensure_started()?;
        let started_at = self.timer();
        let value = Arc::new(value);
        let inserted = {
            let _guard = self.locks.acquire(key.clone());
            self.store.put_if_absent(key, value)?
        };
        if inserted && self.stats_enabled {
            self.stats.record_put();
            if let Some(started_at) = started_at {
                self.stats.add_put_time(started_at.elapsed());
            }
        }
        Ok(inserted)
    }

    /// Overwrite the value at `key` only if an entry is present.
    pub fn replace(&self, key: &K, value: V) -> Result<bool, CacheError> {
        self.ensure_started()?;
        let started_at = self.timer();
        let value = Arc::new(value);
        let replaced = {
            let _guard = self.locks.acquire(key.clone());
            self.store.replace(key, value)?
        };
        if self.stats_enabled {
            if replaced {
                self.stats.record_hit();
                self.stats.record_put();
                if let Some(started_at) = started_at {
                    self.stats.add_put_time(started_at.elapsed());
                }
            } else {
                self.stats.record_miss();
            }
        }
        Ok(replaced)
    }

    /// Overwrite only if the present value equals `expected`.
    pub fn replace_if(&self, key: &K, expected: &V, value: V) -> Result<bool, CacheError> {
        self.ensure_started()?;
        let started_at = self.timer();
        let value = Arc::new(value);
        let replaced = {
            let _guard = self.locks.acquire(key.clone());
            self.store.replace_if(key, expected, value)?
        };
        if self.stats_enabled {
            if replaced {
                self.stats.record_hit();
                self.stats.record_put();
                if let Some(started_at) = started_at {
                    self.stats.add_put_time(started_at.elapsed());
                }
            } else {
                self.stats.record_miss();
            }
        }
        Ok(replaced)
    }

    /// Overwrite if present, returning the previous value.
    pub fn get_and_replace(&self, key: &K, value: V) -> Result<Option<Arc<V>>, CacheError> {
        self.ensure_started()?;
        let started_at = self.timer();
        let value = Arc::new(value);
        let previous = {
            let _guard = self.locks.acquire(key.clone());
            self.store.get_and_replace(key, value)?
        };
        if self.stats_enabled {
            match &previous {
                Some(_) => {
                    self.stats.record_hit();
                    self.stats.record_put();
                    if let Some(started_at) = started_at {
                        self.stats.add_put_time(started_at.elapsed());
                    }
                },
                None => self.stats.record_miss(),
            }
        }
        Ok(previous)
    }

    // -- removals ---------------------------------------------------------

    /// Remove the entry at `key`. Returns whether an entry was removed.
    pub fn remove(&self, key: &K) -> Result<bool, CacheError> {
        self.ensure_started()?;
        let started_at = self.timer();
        let removed = {
            let _guard = self.locks.acquire(key.clone());
            self.store.remove(key)
        };
        if removed && self.stats_enabled {
            self.stats.record_removal();
            if let Some(started_at) = started_at {
                self.stats.add_remove_time(started_at.elapsed());
            }
        }
        Ok(removed)
    }

    /// Remove the entry at `key` only if its value equals `expected`.
    pub fn remove_if(&self, key: &K, expected: &V) -> Result<bool, CacheError> {
        self.ensure_started()?;
        let started_at = self.timer();
        let removed = {
            let _guard = self.locks.acquire(key.clone());
            self.store.remove_if(key, expected)
        };
        if removed && self.stats_enabled {
            self.stats.record_removal();
            if let Some(started_at) = started_at {
                self.stats.add_remove_time(started_at.elapsed());
            }
        }
        Ok(removed)
    }

    /// Remove the entry at `key`, returning the removed value.
    pub fn get_and_remove(&self, key: &K) -> Result<Option<Arc<V>>, CacheError> {
        self.ensure_started()?;
        let started_at = self.timer();
        let removed = {
            let _guard = self.locks.acquire(key.clone());
            self.store.get_and_remove(key)?
        };
        if self.stats_enabled {
            match &removed {
                Some(_) => {
                    self.stats.record_hit();
                    self.stats.record_removal();
                    if let Some(started_at) = started_at {
                        self.stats.add_remove_time(started_at.elapsed());
                    }
                },
                None => self.stats.record_miss(),
            }
        }
        Ok(removed)
    }

    /// Remove the given keys, each under its own key lock.
    ///
    /// Not atomic as a whole: concurrent readers may observe a partially
    /// removed set. Statistics count confirmed removals only.
    pub fn remove_all_keys(&self, keys: &[K]) -> Result<(), CacheError> {
        self.ensure_started()?;
        let mut removed = 0u64;
        for key in keys {
            let _guard = self.locks.acquire(key.clone());
            if self.store.remove(key) {
                removed += 1;
            }
        }
        if self.stats_enabled && removed > 0 {
            self.stats.record_removals(removed);
        }
        Ok(())
    }

    /// Remove every entry, key by key, under per-key locks.
    pub fn remove_all(&self) -> Result<(), CacheError> {
        self.ensure_started()?;
        let keys = self.store.snapshot_keys();
        self.remove_all_keys(&keys)
    }

    /// Drop every entry in one sweep.
    ///
    /// Unlike [`remove_all`](Self::remove_all) this takes no per-key locks
    /// and records no statistics.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.ensure_started()?;
        self.store.clear();
        Ok(())
    }

    // -- entry processor --------------------------------------------------

    /// Run `processor` on a lock-guarded mutable view of `key`, then commit
    /// the staged state exactly once.
    pub fn invoke<R, F>(&self, key: &K, processor: F) -> Result<R, CacheError>
    where
        F: FnOnce(&mut MutableEntry<'_, K, V>) -> R,
    {
        self.ensure_started()?;
        let _guard = self.locks.acquire(key.clone());
        let mut entry = MutableEntry::new(key, self.store.as_ref());
        let output = processor(&mut entry);
        self.commit_entry(entry)?;
        Ok(output)
    }

    /// Fallible variant of [`invoke`](Self::invoke): a processor error
    /// skips the commit, leaving the entry untouched.
    pub fn try_invoke<R, F>(&self, key: &K, processor: F) -> Result<R, CacheError>
    where
        F: FnOnce(&mut MutableEntry<'_, K, V>) -> Result<R, BoxError>,
    {
        self.ensure_started()?;
        let _guard = self.locks.acquire(key.clone());
        let mut entry = MutableEntry::new(key, self.store.as_ref());
        let output = processor(&mut entry).map_err(CacheError::Processor)?;
        self.commit_entry(entry)?;
        Ok(output)
    }

    fn commit_entry(&self, entry: MutableEntry<'_, K, V>) -> Result<(), CacheError> {
        let mutation = entry.commit()?;
        if self.stats_enabled {
            match mutation {
                Some(Mutation::Put) => self.stats.record_put(),
                Some(Mutation::Removed) => self.stats.record_removal(),
                None => {},
            }
        }
        Ok(())
    }

    // -- traversal --------------------------------------------------------

    /// Iterate over entries.
    ///
    /// The key set is snapshotted up front; each step locks its key just
    /// long enough to read one consistent entry. Keys removed since the
    /// snapshot are skipped. The traversal as a whole is not a consistent
    /// snapshot of the cache.
    pub fn iter(&self) -> Result<CacheIter<'_, K, V>, CacheError> {
        self.ensure_started()?;
        Ok(CacheIter {
            cache: self,
            keys: self.store.snapshot_keys().into_iter(),
            current: None,
        })
    }

    // -- asynchronous loading ---------------------------------------------

    /// Schedule a background load of `key`.
    ///
    /// Returns `Ok(None)` without scheduling anything when no loader is
    /// configured or the key is already present. The handle resolves with
    /// the loaded value, or `None` if the loader had nothing (or the key
    /// appeared in the meantime). Load writes record no statistics.
    pub fn load(&self, key: K) -> Result<Option<LoadHandle<Option<Arc<V>>>>, CacheError> {
        self.ensure_started()?;
        let loader = match &self.loader {
            Some(loader) => Arc::clone(loader),
            None => return Ok(None),
        };
        let executor = match &self.executor {
            Some(executor) => executor,
            None => return Ok(None),
        };
        if self.store.contains_key(&key) {
            return Ok(None);
        }

        let (handle, resolver) = LoadHandle::new();
        let cache = Weak::clone(&self.myself);
        debug!(cache = %self.name, "scheduling asynchronous load");
        let accepted = executor.submit(Box::new(move || {
            if resolver.is_cancelled() {
                return;
            }
            let cache = match cache.upgrade() {
                Some(cache) => cache,
                None => return,
            };
            resolver.resolve(cache.run_load(&loader, &key));
        }));
        if !accepted {
            return Err(CacheError::NotStarted {
                name: self.name.clone(),
                state: self.state(),
            });
        }
        Ok(Some(handle))
    }

    fn run_load(
        &self,
        loader: &Arc<dyn CacheLoader<K, V>>,
        key: &K,
    ) -> Result<Option<Arc<V>>, CacheError> {
        self.ensure_started()?;
        let _guard = self.locks.acquire(key.clone());
        if self.store.contains_key(key) {
            return Ok(None);
        }
        match loader.load(key) {
            Ok(Some(value)) => {
                let value = Arc::new(value);
                self.store.put(key.clone(), Arc::clone(&value))?;
                Ok(Some(value))
            },
            Ok(None) => Ok(None),
            Err(err) => {
                warn!(cache = %self.name, error = %err, "loader failed during asynchronous load");
                Err(CacheError::Loader(err))
            },
        }
    }

    /// Schedule a background load of every missing key in `keys`.
    ///
    /// Present keys are never replaced. Returns `Ok(None)` when there is
    /// nothing to load. The handle resolves with the number of entries
    /// stored.
    pub fn load_all(&self, keys: &[K]) -> Result<Option<LoadHandle<usize>>, CacheError> {
        self.ensure_started()?;
        let loader = match &self.loader {
            Some(loader) => Arc::clone(loader),
            None => return Ok(None),
        };
        let executor = match &self.executor {
            Some(executor) => executor,
            None => return Ok(None),
        };
        let missing: Vec<K> = keys
            .iter()
            .filter(|key| !self.store.contains_key(key))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(None);
        }

        let (handle, resolver) = LoadHandle::new();
        let cache = Weak::clone(&self.myself);
        debug!(cache = %self.name, keys = missing.len(), "scheduling asynchronous bulk load");
        let accepted = executor.submit(Box::new(move || {
            if resolver.is_cancelled() {
                return;
            }
            let cache = match cache.upgrade() {
                Some(cache) => cache,
                None => return,
            };
            resolver.resolve(cache.run_load_all(&loader, &missing));
        }));
        if !accepted {
            return Err(CacheError::NotStarted {
                name: self.name.clone(),
                state: self.state(),
            });
        }
        Ok(Some(handle))
    }

    fn run_load_all(
        &self,
        loader: &Arc<dyn CacheLoader<K, V>>,
        keys: &[K],
    ) -> Result<usize, CacheError> {
        self.ensure_started()?;
        let loaded = match loader.load_all(keys) {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(cache = %self.name, error = %err, "loader failed during asynchronous bulk load");
                return Err(CacheError::Loader(err));
            },
        };
        let mut stored = 0usize;
        for (key, value) in loaded {
            let _guard = self.locks.acquire(key.clone());
            if self.store.put_if_absent(key, Arc::new(value))? {
                stored += 1;
            }
        }
        Ok(stored)
    }

    // -- statistics -------------------------------------------------------

    /// Snapshot the statistics, or `None` when statistics are disabled.
    pub fn statistics(&self) -> Option<CacheStatsSnapshot> {
        if self.stats_enabled {
            Some(self.stats.snapshot())
        } else {
            None
        }
    }

    /// Zero the statistics counters and restart the accumulation window.
    pub fn reset_statistics(&self) {
        if self.stats_enabled {
            self.stats.reset();
        }
    }
}

impl<K, V> std::fmt::Debug for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("len", &self.store.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CacheIter
// ---------------------------------------------------------------------------

/// Entry iterator with per-entry locking.
pub struct CacheIter<'a, K, V> {
    cache: &'a Cache<K, V>,
    keys: std::vec::IntoIter<K>,
    current: Option<K>,
}

impl<K, V> CacheIter<'_, K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Remove the most recently yielded entry under its key lock.
    ///
    /// Returns `false` when nothing has been yielded yet, or when the
    /// entry has already vanished.
    pub fn remove_current(&mut self) -> Result<bool, CacheError> {
        self.cache.ensure_started()?;
        let key = match self.current.take() {
            Some(key) => key,
            None => return Ok(false),
        };
        let removed = {
            let _guard = self.cache.locks.acquire(key.clone());
            self.cache.store.remove(&key)
        };
        if removed && self.cache.stats_enabled {
            self.cache.stats.record_removal();
        }
        Ok(removed)
    }
}

impl<K, V> Iterator for CacheIter<'_, K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    type Item = Result<CacheEntry<K, V>, CacheError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.keys.next()?;
            let fetched = {
                let _guard = self.cache.locks.acquire(key.clone());
                self.cache.store.get(&key)
            };
            match fetched {
                Ok(Some(value)) => {
                    if self.cache.stats_enabled {
                        self.cache.stats.record_hit();
                    }
                    self.current = Some(key.clone());
                    return Some(Ok(CacheEntry { key, value }));
                },
                Ok(None) => {
                    // Removed since the key snapshot; skip it.
                    if self.cache.stats_enabled {
                        self.cache.stats.record_miss();
                    }
                },
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
