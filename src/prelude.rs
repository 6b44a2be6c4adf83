pub use crate::aside::{
    component, AsideBinding, AsideError, AsideOperation, BindingError, CacheResolver,
    CachedOutcome, FixedCacheResolver, Invocation, InvocationKey, KeyComponent, KeyGenerator,
    TupleKeyGenerator,
};
pub use crate::builder::CacheBuilder;
pub use crate::cache::{Cache, CacheEntry, CacheIter, CacheState, LoadHandle};
pub use crate::error::{BoxError, CacheError};
pub use crate::loader::{CacheLoader, FnLoader};
pub use crate::lock::{KeyGuard, LockManager};
pub use crate::process::MutableEntry;
pub use crate::stats::CacheStatsSnapshot;
pub use crate::store::{
    BackingStore, ByRefStore, ByValueStore, CloneCopier, CopyError, JsonCopier, StoreError,
    ValueCopier,
};
