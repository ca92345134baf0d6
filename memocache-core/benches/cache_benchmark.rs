use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use memocache_core::cache::CacheBuilder;
use memocache_core::eviction::StrategyKind;

fn bench_insert_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_sequential");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("FIFO", size), size, |b, &size| {
            b.iter(|| {
                let cache = CacheBuilder::<i32>::new("bench")
                    .max_entries(size)
                    .cleanup_interval(std::time::Duration::ZERO)
                    .eviction(StrategyKind::Fifo)
                    .build()
                    .unwrap();
                for i in 0..size {
                    cache.set(&format!("key{i}"), black_box(i as i32)).unwrap();
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("LRU", size), size, |b, &size| {
            b.iter(|| {
                let cache = CacheBuilder::<i32>::new("bench")
                    .max_entries(size)
                    .cleanup_interval(std::time::Duration::ZERO)
                    .eviction(StrategyKind::Lru)
                    .build()
                    .unwrap();
                for i in 0..size {
                    cache.set(&format!("key{i}"), black_box(i as i32)).unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_get_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_sequential");

    for size in [10, 100, 1000].iter() {
        let cache = Arc::new(
            CacheBuilder::<i32>::new("bench")
                .max_entries(*size)
                .cleanup_interval(std::time::Duration::ZERO)
                .eviction(StrategyKind::Fifo)
                .build()
                .unwrap(),
        );
        for i in 0..*size {
            cache.set(&format!("key{i}"), i as i32).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("FIFO", size), size, |b, &size| {
            b.iter(|| {
                for i in 0..size {
                    black_box(cache.get(&format!("key{i}")));
                }
            });
        });
    }

    group.finish();
}

fn bench_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("eviction");

    group.bench_function("FIFO_eviction", |b| {
        b.iter(|| {
            let cache = CacheBuilder::<i32>::new("bench")
                .max_entries(50)
                .cleanup_interval(std::time::Duration::ZERO)
                .eviction(StrategyKind::Fifo)
                .build()
                .unwrap();
            for i in 0..100 {
                cache.set(&format!("key{i}"), black_box(i as i32)).unwrap();
            }
        });
    });

    group.bench_function("LRU_eviction", |b| {
        b.iter(|| {
            let cache = CacheBuilder::<i32>::new("bench")
                .max_entries(50)
                .cleanup_interval(std::time::Duration::ZERO)
                .eviction(StrategyKind::Lru)
                .build()
                .unwrap();
            for i in 0..100 {
                cache.set(&format!("key{i}"), black_box(i as i32)).unwrap();
            }
        });
    });

    group.finish();
}

fn bench_concurrent_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_mixed");

    for num_threads in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let cache = Arc::new(
                        CacheBuilder::<i32>::new("bench")
                            .max_entries(100)
                            .cleanup_interval(std::time::Duration::ZERO)
                            .eviction(StrategyKind::Fifo)
                            .build()
                            .unwrap(),
                    );
                    let handles: Vec<_> = (0..num_threads)
                        .map(|thread_id| {
                            let cache = cache.clone();
                            thread::spawn(move || {
                                for i in 0..50 {
                                    if i % 2 == 0 {
                                        cache
                                            .set(&format!("key{}", thread_id * 50 + i), black_box(i as i32))
                                            .unwrap();
                                    } else {
                                        black_box(cache.get(&format!("key{}", thread_id * 50 + i)));
                                    }
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_sequential,
    bench_get_sequential,
    bench_eviction,
    bench_concurrent_mixed
);
criterion_main!(benches);
