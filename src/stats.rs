//! Cache statistics counters and snapshots.
//!
//! ## Key Components
//!
//! - [`CacheStats`]: atomic hit/miss/put/removal counters plus cumulative
//!   nanosecond timings, written on the hot path with relaxed ordering.
//! - [`CacheStatsSnapshot`]: a `Copy` view taken at one instant, with
//!   derived rates and averages.
//!
//! Counters are best-effort under concurrency: a reader racing a writer may
//! observe counts that are off by in-flight operations. They are monotonic
//! between resets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Atomic statistics recorder shared by all threads using a cache.
#[derive(Debug)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    removals: AtomicU64,
    get_time_ns: AtomicU64,
    put_time_ns: AtomicU64,
    remove_time_ns: AtomicU64,
    since: Mutex<Instant>,
}

impl CacheStats {
    /// Create a recorder with all counters at zero.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            removals: AtomicU64::new(0),
            get_time_ns: AtomicU64::new(0),
            put_time_ns: AtomicU64::new(0),
            remove_time_ns: AtomicU64::new(0),
            since: Mutex::new(Instant::now()),
        }
    }

    /// Record a read that found an entry.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a read that found nothing.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one committed write.
    pub fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` committed writes.
    pub fn record_puts(&self, count: u64) {
        self.puts.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one confirmed removal.
    pub fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` confirmed removals.
    pub fn record_removals(&self, count: u64) {
        self.removals.fetch_add(count, Ordering::Relaxed);
    }

    /// Add elapsed time to the cumulative get timer.
    pub fn add_get_time(&self, elapsed: Duration) {
        self.get_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Add elapsed time to the cumulative put timer.
    pub fn add_put_time(&self, elapsed: Duration) {
        self.put_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Add elapsed time to the cumulative remove timer.
    pub fn add_remove_time(&self, elapsed: Duration) {
        self.remove_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Snapshot current values.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            get_time_ns: self.get_time_ns.load(Ordering::Relaxed),
            put_time_ns: self.put_time_ns.load(Ordering::Relaxed),
            remove_time_ns: self.remove_time_ns.load(Ordering::Relaxed),
            accumulating_for: self.since.lock().elapsed(),
        }
    }

    /// Zero every counter and restart the accumulation window.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.puts.store(0, Ordering::Relaxed);
        self.removals.store(0, Ordering::Relaxed);
        self.get_time_ns.store(0, Ordering::Relaxed);
        self.put_time_ns.store(0, Ordering::Relaxed);
        self.remove_time_ns.store(0, Ordering::Relaxed);
        *self.since.lock() = Instant::now();
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a cache's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    /// Reads that found an entry.
    pub hits: u64,
    /// Reads that found nothing in the store.
    pub misses: u64,
    /// Committed writes.
    pub puts: u64,
    /// Confirmed removals.
    pub removals: u64,
    /// Cumulative time spent in read operations.
    pub get_time_ns: u64,
    /// Cumulative time spent in write operations.
    pub put_time_ns: u64,
    /// Cumulative time spent in remove operations.
    pub remove_time_ns: u64,
    /// Time since the counters started (or were last reset).
    pub accumulating_for: Duration,
}

impl CacheStatsSnapshot {
    /// Total reads, hit or miss.
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate in percent; 0.0 when no reads were recorded.
    pub fn hit_rate_pct(&self) -> f64 {
        let requests = self.requests();
        if requests == 0 {
            return 0.0;
        }
        (self.hits as f64 / requests as f64) * 100.0
    }

    /// Mean read latency in nanoseconds; 0 when no reads were recorded.
    pub fn avg_get_time_ns(&self) -> u64 {
        let requests = self.requests();
        if requests == 0 {
            return 0;
        }
        self.get_time_ns / requests
    }

    /// Mean write latency in nanoseconds; 0 when no puts were recorded.
    pub fn avg_put_time_ns(&self) -> u64 {
        if self.puts == 0 {
            return 0;
        }
        self.put_time_ns / self.puts
    }

    /// Mean removal latency in nanoseconds; 0 when none were recorded.
    pub fn avg_remove_time_ns(&self) -> u64 {
        if self.removals == 0 {
            return 0;
        }
        self.remove_time_ns / self.removals
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
