//! Builder for assembling caches.
//!
//! Picks the backing store (by-reference by default, by-value when a
//! copier is configured), wires in an optional loader, and decides whether
//! statistics are recorded.
//!
//! ## Example
//!
//! ```rust
//! use lockaside::builder::CacheBuilder;
//!
//! let cache = CacheBuilder::<u64, String>::new("sessions")
//!     .statistics(true)
//!     .build_started()?;
//!
//! cache.put(1, "hello".to_string())?;
//! assert_eq!(cache.get(&1)?.as_deref(), Some(&"hello".to_string()));
//! # Ok::<(), lockaside::error::CacheError>(())
//! ```

use std::hash::Hash;
use std::sync::Arc;

use crate::cache::Cache;
use crate::error::CacheError;
use crate::loader::CacheLoader;
use crate::store::{BackingStore, ByRefStore, ByValueStore, ValueCopier};

/// Load workers spawned when a loader is configured without an explicit
/// worker count.
const DEFAULT_LOAD_WORKERS: usize = 1;

/// Builder for [`Cache`] instances.
pub struct CacheBuilder<K, V> {
    name: String,
    copier: Option<Box<dyn ValueCopier<V>>>,
    loader: Option<Arc<dyn CacheLoader<K, V>>>,
    statistics: bool,
    load_workers: usize,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: PartialEq + Send + Sync + 'static,
{
    /// Start a builder for a cache named `name`.
    ///
    /// Defaults: by-reference storage, no loader, statistics disabled.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            copier: None,
            loader: None,
            statistics: false,
            load_workers: DEFAULT_LOAD_WORKERS,
        }
    }

    /// Store values by value: `copier` snapshots every value on the way in
    /// and hands each reader an independent copy on the way out.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lockaside::builder::CacheBuilder;
    /// use lockaside::store::CloneCopier;
    ///
    /// let cache = CacheBuilder::<u64, Vec<u8>>::new("blobs")
    ///     .store_by_value(CloneCopier)
    ///     .build_started()
    ///     .unwrap();
    /// cache.put(7, vec![1, 2, 3]).unwrap();
    /// ```
    pub fn store_by_value(mut self, copier: impl ValueCopier<V> + 'static) -> Self {
        self.copier = Some(Box::new(copier));
        self
    }

    /// Configure a read-through loader. Misses consult it synchronously;
    /// `load`/`load_all` run it on background workers.
    pub fn loader(mut self, loader: impl CacheLoader<K, V> + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Enable or disable statistics recording.
    pub fn statistics(mut self, enabled: bool) -> Self {
        self.statistics = enabled;
        self
    }

    /// Number of background load workers. Clamped to at least one; ignored
    /// when no loader is configured.
    pub fn load_workers(mut self, workers: usize) -> Self {
        self.load_workers = workers.max(1);
        self
    }

    /// Assemble the cache in the `Uninitialised` state.
    pub fn build(self) -> Arc<Cache<K, V>> {
        let store: Box<dyn BackingStore<K, V>> = match self.copier {
            Some(copier) => Box::new(ByValueStore::from_boxed(copier)),
            None => Box::new(ByRefStore::new()),
        };
        Cache::assemble(
            self.name,
            store,
            self.loader,
            self.statistics,
            self.load_workers,
        )
    }

    /// Assemble the cache and start it.
    pub fn build_started(self) -> Result<Arc<Cache<K, V>>, CacheError> {
        let cache = self.build();
        cache.start()?;
        Ok(cache)
    }
}

impl<K, V> std::fmt::Debug for CacheBuilder<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("name", &self.name)
            .field("by_value", &self.copier.is_some())
            .field("loader", &self.loader.is_some())
            .field("statistics", &self.statistics)
            .field("load_workers", &self.load_workers)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
