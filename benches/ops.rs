//! Micro-operation benchmarks for the cache and the aside layer.
//!
//! Run with: `cargo bench --bench ops`
//!
//! Measures per-operation latency (nanoseconds) for lock-guarded gets and
//! puts, the read-through miss path, and a cache-aside hit through a
//! binding.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use lockaside::aside::{
    component, AsideBinding, AsideOperation, CachedOutcome, FixedCacheResolver, InvocationKey,
};
use lockaside::builder::CacheBuilder;
use lockaside::cache::Cache;
use lockaside::loader::FnLoader;
use lockaside::store::CloneCopier;

const CAPACITY: usize = 16_384;
const OPS: u64 = 100_000;

// ============================================================================
// Get Hit Latency (ns/op)
// ============================================================================

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit_ns");
    group.throughput(Throughput::Elements(OPS));

    // By-reference store: the hit hands out the stored Arc.
    group.bench_function("by_ref", |b| {
        b.iter_custom(|iters| {
            let cache: Arc<Cache<u64, u64>> =
                CacheBuilder::new("bench_by_ref").build_started().unwrap();
            for i in 0..CAPACITY as u64 {
                cache.put(i, i).unwrap();
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    let key = i % (CAPACITY as u64);
                    black_box(cache.get(&key).unwrap());
                }
            }
            start.elapsed()
        })
    });

    // By-value store: every hit pays for one value copy.
    group.bench_function("by_value", |b| {
        b.iter_custom(|iters| {
            let cache: Arc<Cache<u64, u64>> = CacheBuilder::new("bench_by_value")
                .store_by_value(CloneCopier)
                .build_started()
                .unwrap();
            for i in 0..CAPACITY as u64 {
                cache.put(i, i).unwrap();
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    let key = i % (CAPACITY as u64);
                    black_box(cache.get(&key).unwrap());
                }
            }
            start.elapsed()
        })
    });

    // Statistics on: same path plus counters and timers.
    group.bench_function("by_ref_with_stats", |b| {
        b.iter_custom(|iters| {
            let cache: Arc<Cache<u64, u64>> = CacheBuilder::new("bench_stats")
                .statistics(true)
                .build_started()
                .unwrap();
            for i in 0..CAPACITY as u64 {
                cache.put(i, i).unwrap();
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    let key = i % (CAPACITY as u64);
                    black_box(cache.get(&key).unwrap());
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Put Latency (ns/op)
// ============================================================================

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("overwrite", |b| {
        b.iter_custom(|iters| {
            let cache: Arc<Cache<u64, u64>> =
                CacheBuilder::new("bench_put").build_started().unwrap();
            for i in 0..CAPACITY as u64 {
                cache.put(i, i).unwrap();
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    let key = i % (CAPACITY as u64);
                    cache.put(key, i).unwrap();
                }
            }
            start.elapsed()
        })
    });

    group.bench_function("entry_processor_rmw", |b| {
        b.iter_custom(|iters| {
            let cache: Arc<Cache<u64, u64>> =
                CacheBuilder::new("bench_rmw").build_started().unwrap();
            for i in 0..CAPACITY as u64 {
                cache.put(i, 0).unwrap();
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    let key = i % (CAPACITY as u64);
                    cache
                        .invoke(&key, |entry| {
                            let current = entry.value().unwrap().map(|v| *v).unwrap_or(0);
                            entry.set_value(current + 1);
                        })
                        .unwrap();
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Read-Through Miss (ns/op)
// ============================================================================

fn bench_read_through(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_through_ns");
    group.throughput(Throughput::Elements(OPS));

    // Every get misses and fills from a trivial loader.
    group.bench_function("cold_load", |b| {
        b.iter_custom(|iters| {
            let mut total = std::time::Duration::ZERO;
            for _ in 0..iters {
                let loader = FnLoader::new(|key: &u64| Ok(Some(*key)));
                let cache: Arc<Cache<u64, u64>> = CacheBuilder::new("bench_load")
                    .loader(loader)
                    .build_started()
                    .unwrap();
                let start = Instant::now();
                for i in 0..OPS {
                    black_box(cache.get(&i).unwrap());
                }
                total += start.elapsed();
            }
            total
        })
    });

    group.finish();
}

// ============================================================================
// Cache-Aside Hit Through a Binding (ns/op)
// ============================================================================

fn bench_aside_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("aside_hit_ns");
    group.throughput(Throughput::Elements(OPS));

    // Key construction, tuple hashing and the cache get, per call.
    group.bench_function("invoke_result", |b| {
        b.iter_custom(|iters| {
            let cache: Arc<Cache<InvocationKey, CachedOutcome<u64>>> =
                CacheBuilder::new("bench_aside").build_started().unwrap();
            let binding = AsideBinding::try_new(
                "bench.find",
                AsideOperation::CacheResult { skip_get: false },
                1,
                &[],
                None,
                FixedCacheResolver::new(Arc::clone(&cache)),
            )
            .unwrap();
            for i in 0..CAPACITY as u64 {
                binding
                    .invoke_result(&[component(i)], || Ok::<_, String>(Some(i)))
                    .unwrap();
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    let key = i % (CAPACITY as u64);
                    black_box(
                        binding
                            .invoke_result(&[component(key)], || Ok::<_, String>(None))
                            .unwrap(),
                    );
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_get_hit,
    bench_put,
    bench_read_through,
    bench_aside_hit
);
criterion_main!(benches);
