use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use std::sync::Arc;

use bidlock_core::backoff::NoDelay;
use bidlock_core::infrastructure::LockStore;
use bidlock_core::infrastructure_in_memory::InMemoryStore;
use bidlock_core::lock::LockManager;

fn bench_acquire_release(c: &mut Criterion) {
    let locks = LockManager::new(Arc::new(InMemoryStore::new())).with_backoff(NoDelay);

    c.bench_function("lock_acquire_release_cycle", |b| {
        b.iter(|| {
            let guard = locks.acquire(black_box("lock:auction:item1")).unwrap();
            black_box(guard.is_some())
        })
    });
}

fn bench_many_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock_throughput");

    for key_count in [10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("keys", key_count),
            &key_count,
            |b, &count| {
                b.iter(|| {
                    let store = InMemoryStore::new();

                    // Each owner locks a different auction
                    for i in 0..count {
                        store
                            .try_acquire(&format!("lock:auction:{}", i), &format!("o{}", i), 5000, 1000)
                            .unwrap();
                    }

                    black_box(store.holder("lock:auction:0", 1000).unwrap())
                })
            },
        );
    }

    group.finish();
}

fn bench_eviction(c: &mut Criterion) {
    c.bench_function("evict_1000_expired", |b| {
        b.iter(|| {
            let store = InMemoryStore::new();

            for i in 0..1000 {
                store
                    .try_acquire(&format!("k{}", i), "owner", 100, 1000)
                    .unwrap();
            }

            // Evict all (now > expires_at)
            black_box(store.evict_expired(99999).unwrap())
        })
    });
}

criterion_group!(benches, bench_acquire_release, bench_many_keys, bench_eviction);
criterion_main!(benches);
