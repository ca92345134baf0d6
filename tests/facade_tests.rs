use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use memocache::{Cache, CacheBuilder, EvictReason, StrategyKind};

#[test]
fn cold_miss_then_warm_hit_then_delete() {
    let cache: Cache<i32> = CacheBuilder::new("s1")
        .max_entries(10)
        .default_ttl(Duration::from_secs(3600))
        .eviction(StrategyKind::Lru)
        .build()
        .unwrap();

    cache.set("a", 1).unwrap();
    assert_eq!(cache.get("a"), Some(1));
    assert_eq!(cache.get("b"), None);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);

    assert!(cache.delete("a"));
    assert_eq!(cache.get("a"), None);
    let stats = cache.stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.invalidations, 1);
}

#[test]
fn lru_capacity_overflow_evicts_least_recently_used() {
    let cache: Cache<i32> = CacheBuilder::new("s2")
        .max_entries(2)
        .eviction(StrategyKind::Lru)
        .build()
        .unwrap();

    let evicted = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = evicted.clone();
    cache.hooks().on_evict_legacy(move |key, value, reason| {
        sink.lock().unwrap().push((key.to_string(), *value, reason));
    });

    cache.set("a", 1).unwrap();
    cache.set("b", 2).unwrap();
    cache.get("a");
    cache.set("c", 3).unwrap();

    let mut keys = cache.keys();
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "c".to_string()]);

    let log = evicted.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0, "b");
    assert_eq!(log[0].1, 2);
    assert!(matches!(log[0].2, EvictReason::Capacity | EvictReason::Lru));
}

#[test]
fn ttl_sweep_reports_evict_reason_ttl() {
    let evicted = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = evicted.clone();

    let cache: Cache<i32> = CacheBuilder::new("s5")
        .max_entries(10)
        .default_ttl(Duration::from_millis(50))
        .cleanup_interval(Duration::from_millis(10))
        .build()
        .unwrap();
    cache.hooks().on_evict_legacy(move |key, value, reason| {
        sink.lock().unwrap().push((key.to_string(), *value, reason));
    });

    cache.set("a", 1).unwrap();
    std::thread::sleep(Duration::from_millis(150));

    assert_eq!(cache.get("a"), None);
    let log = evicted.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0, "a");
    assert!(matches!(log[0].2, EvictReason::Ttl));
}

#[test]
fn get_or_compute_shares_result_across_calls() {
    let cache: Cache<i32> = CacheBuilder::new("s6").max_entries(10).build().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let calls = calls.clone();
        let value = cache
            .get_or_compute("k", &[], move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            })
            .unwrap();
        assert_eq!(value, 42);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
