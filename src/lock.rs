//! Per-key lock manager with pooled handles.
//!
//! Serializes all mutating access to a single cache key while leaving
//! operations on different keys fully parallel. The cache acquires a key's
//! lock for the duration of one operation (including any loader call made on
//! a miss) and releases it when the returned guard drops.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        LockManager<K>                           │
//! │                                                                  │
//! │   table: DashMap<K, Arc<LockHandle>>     pool: Vec<handle>      │
//! │                                                                  │
//! │   acquire(k):                                                    │
//! │     1. take a handle from the pool and lock it (uncontended)    │
//! │     2. insert-if-absent table[k] = handle                       │
//! │        ├── vacant: caller now owns k            ──► KeyGuard    │
//! │        └── occupied: clone existing handle,                     │
//! │            drop the shard guard, block on it,                   │
//! │            recycle it, retry from 2                             │
//! │                                                                  │
//! │   release (guard drop):                                          │
//! │     remove table[k], unlock, offer handle to pool               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`LockManager`]: owns the key table and the handle pool.
//! - [`KeyGuard`]: RAII proof of exclusive access to one key; releasing is
//!   its `Drop` impl, so the key is freed on every exit path, including
//!   unwinding.
//! - `LockHandle` (internal): one raw mutex, shared via `Arc` so waiters
//!   can block on a handle the releasing thread has already unmapped.
//!
//! ## Example Usage
//!
//! ```
//! use lockaside::lock::LockManager;
//!
//! let manager: LockManager<u64> = LockManager::new();
//! {
//!     let _guard = manager.acquire(7);
//!     assert_eq!(manager.active_keys(), 1);
//! }
//! // Guard dropped, key unmapped.
//! assert_eq!(manager.active_keys(), 0);
//! ```
//!
//! ## Thread Safety
//!
//! - `LockManager` is `Send + Sync`; one instance is shared by all threads
//!   using a cache.
//! - `KeyGuard` is neither `Send` nor `Sync`: the underlying raw mutex must
//!   be released on the thread that acquired it.
//! - Locks are not reentrant. Acquiring a key already held by the same
//!   thread deadlocks, so code running under a key's lock (loaders, entry
//!   processors) must not call back into the cache for that key.
//!
//! ## Implementation Notes
//!
//! - A contended waiter blocks on the *previous* holder's handle, but never
//!   adopts it for the key: another release may already be in flight, so the
//!   waiter re-runs the insert-if-absent step with its own handle.
//! - The table's shard guard is dropped before blocking, so a waiter never
//!   stalls unrelated keys that hash to the same shard.
//! - A handle goes back to the pool only when its `Arc` count shows no other
//!   thread can still be blocked on it; otherwise it is simply dropped. The
//!   pool is bounded and purely an allocation-recycling optimisation.

use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::lock_api::RawMutex as RawMutexApi;
use parking_lot::{Mutex, RawMutex};
use rustc_hash::FxBuildHasher;

/// Upper bound on recycled handles kept by the pool.
const POOL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// LockHandle / LockPool
// ---------------------------------------------------------------------------

/// One raw mutex, pooled and shared between a holder and its waiters.
struct LockHandle {
    raw: RawMutex,
}

impl LockHandle {
    fn new() -> Self {
        Self {
            raw: <RawMutex as RawMutexApi>::INIT,
        }
    }
}

/// Bounded free list of unlocked handles.
struct LockPool {
    free: Mutex<Vec<Arc<LockHandle>>>,
}

impl LockPool {
    fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
        }
    }

    /// Pop a recycled handle, or allocate a fresh one.
    fn take(&self) -> Arc<LockHandle> {
        if let Some(handle) = self.free.lock().pop() {
            return handle;
        }
        Arc::new(LockHandle::new())
    }

    /// Return a handle to the pool.
    ///
    /// Accepts only sole-reference handles: while another `Arc` to this
    /// handle exists, a waiter may still be about to block on it, and
    /// re-issuing it for a different key would let two keys share one lock.
    fn offer(&self, handle: Arc<LockHandle>) {
        if Arc::strong_count(&handle) != 1 {
            return;
        }
        let mut free = self.free.lock();
        if free.len() < POOL_CAPACITY {
            free.push(handle);
        }
    }

    fn len(&self) -> usize {
        self.free.lock().len()
    }
}

// ---------------------------------------------------------------------------
// LockManager
// ---------------------------------------------------------------------------

/// Issues at most one lock holder per key.
pub struct LockManager<K> {
    table: DashMap<K, Arc<LockHandle>, FxBuildHasher>,
    pool: LockPool,
}

impl<K> LockManager<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            table: DashMap::with_hasher(FxBuildHasher::default()),
            pool: LockPool::new(),
        }
    }

    /// Block until the calling thread exclusively holds `key`.
    ///
    /// The returned guard releases the key when dropped.
    pub fn acquire(&self, key: K) -> KeyGuard<'_, K> {
        let handle = self.pool.take();
        // Sole reference, so this cannot contend.
        handle.raw.lock();

        loop {
            let existing = match self.table.entry(key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(&handle));
                    break;
                },
                Entry::Occupied(slot) => Arc::clone(slot.get()),
            };
            // The entry (and its shard guard) is dropped before blocking.
            existing.raw.lock();
            // SAFETY: the preceding `lock` call succeeded on this thread,
            // so this thread holds `existing` here.
            unsafe { existing.raw.unlock() };
            self.pool.offer(existing);
        }

        KeyGuard {
            manager: self,
            key,
            handle: Some(handle),
            _not_send: PhantomData,
        }
    }

    /// Number of keys currently locked.
    pub fn active_keys(&self) -> usize {
        self.table.len()
    }

    /// Number of recycled handles currently pooled.
    pub fn pooled_handles(&self) -> usize {
        self.pool.len()
    }

    fn release(&self, key: &K, handle: Arc<LockHandle>) {
        self.table.remove(key);
        // SAFETY: `handle` is the mapping this guard installed in
        // `acquire`, and the owning thread is the only possible holder.
        unsafe { handle.raw.unlock() };
        self.pool.offer(handle);
    }
}

impl<K> Default for LockManager<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> std::fmt::Debug for LockManager<K>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("active_keys", &self.table.len())
            .field("pooled_handles", &self.pool.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// KeyGuard
// ---------------------------------------------------------------------------

/// Exclusive hold on one key, released on drop.
pub struct KeyGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    manager: &'a LockManager<K>,
    key: K,
    handle: Option<Arc<LockHandle>>,
    // The raw mutex must be released on the acquiring thread.
    _not_send: PhantomData<*mut ()>,
}

impl<K> KeyGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    /// The key this guard holds.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K> Drop for KeyGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.manager.release(&self.key, handle);
        }
    }
}

impl<K> std::fmt::Debug for KeyGuard<'_, K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.key).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn acquire_release_clears_table() {
        let manager: LockManager<u64> = LockManager::new();
        {
            let guard = manager.acquire(1);
            assert_eq!(guard.key(), &1);
            assert_eq!(manager.active_keys(), 1);
        }
        assert_eq!(manager.active_keys(), 0);
    }

    #[test]
    fn sequential_acquires_reuse_pooled_handle() {
        let manager: LockManager<u64> = LockManager::new();
        drop(manager.acquire(1));
        assert_eq!(manager.pooled_handles(), 1);
        drop(manager.acquire(2));
        // The same handle served both keys.
        assert_eq!(manager.pooled_handles(), 1);
    }

    #[test]
    fn distinct_keys_lock_independently() {
        let manager: LockManager<&'static str> = LockManager::new();
        let a = manager.acquire("a");
        let b = manager.acquire("b");
        assert_eq!(manager.active_keys(), 2);
        drop(a);
        drop(b);
        assert_eq!(manager.active_keys(), 0);
    }

    #[test]
    fn contended_acquire_waits_for_release() {
        let manager = Arc::new(LockManager::<u64>::new());
        let entered = Arc::new(Barrier::new(2));
        let order = Arc::new(AtomicUsize::new(0));

        let handle = {
            let manager = Arc::clone(&manager);
            let entered = Arc::clone(&entered);
            let order = Arc::clone(&order);
            thread::spawn(move || {
                let _guard = manager.acquire(9);
                entered.wait();
                // Keep the key held long enough for the main thread to block.
                thread::sleep(Duration::from_millis(50));
                order.store(1, Ordering::SeqCst);
            })
        };

        entered.wait();
        let _guard = manager.acquire(9);
        // By the time this acquire returns, the first holder has finished.
        assert_eq!(order.load(Ordering::SeqCst), 1);
        handle.join().unwrap();
    }

    #[test]
    fn mutual_exclusion_under_contention() {
        const THREADS: usize = 8;
        const ITERATIONS: usize = 200;

        let manager = Arc::new(LockManager::<&'static str>::new());
        let in_section = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let mut handles = Vec::new();
        for _ in 0..THREADS {
            let manager = Arc::clone(&manager);
            let in_section = Arc::clone(&in_section);
            let peak = Arc::clone(&peak);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for _ in 0..ITERATIONS {
                    let _guard = manager.acquire("hot");
                    let now = in_section.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    in_section.fetch_sub(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_keys(), 0);
    }

    #[test]
    fn key_released_when_holder_panics() {
        let manager = Arc::new(LockManager::<u64>::new());
        let result = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let _guard = manager.acquire(5);
                panic!("holder died");
            })
            .join()
        };
        assert!(result.is_err());

        // The unwound thread released the key on the way out.
        assert_eq!(manager.active_keys(), 0);
        let _guard = manager.acquire(5);
    }

    #[test]
    fn pool_stays_bounded() {
        let manager: LockManager<u64> = LockManager::new();
        let guards: Vec<_> = (0..100).map(|k| manager.acquire(k)).collect();
        drop(guards);
        assert!(manager.pooled_handles() <= POOL_CAPACITY);
        assert_eq!(manager.active_keys(), 0);
    }
}
