use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::context::HookContext;
use crate::error::{Error, Result};
use crate::eviction::{EvictionStrategy, FifoStrategy, LfuStrategy, LruStrategy, StrategyKind};
use crate::hooks::{EvictReason, HookPipeline};
use crate::keygen::KeyArg;
use crate::metrics::{CacheOperation, MetricsExporter};
use crate::singleflight::Group;
use crate::stats::{Stats, StatsSnapshot};
use crate::store::{MemoryStore, Store};

/// The cache facade: a named, internally synchronized key-value store with
/// eviction, optional TTL sweeping, a hook pipeline, and singleflight-backed
/// computed lookups. Built via [`CacheBuilder`].
pub struct Cache<V> {
    name: String,
    store: Arc<dyn Store<V>>,
    hooks: Arc<HookPipeline<V>>,
    stats: Arc<Stats>,
    singleflight: Group<V>,
    default_ttl: Option<Duration>,
    metrics: Option<Arc<dyn MetricsExporter>>,
    metric_labels: Vec<(String, String)>,
    reporter: Mutex<Option<(JoinHandle<()>, Arc<(Mutex<bool>, Condvar)>)>>,
}

impl<V> Cache<V> {
    /// Reports `op`'s elapsed `duration` to the configured
    /// [`MetricsExporter`], tagged with `cache_name` plus any configured
    /// static labels. A reporting failure is logged and otherwise ignored —
    /// the metrics backend never affects cache correctness.
    fn report_operation(&self, op: CacheOperation, duration: Duration) {
        let Some(exporter) = self.metrics.as_ref() else {
            return;
        };
        let mut labels: Vec<(&str, &str)> = vec![("cache_name", self.name.as_str())];
        labels.extend(self.metric_labels.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Err(err) = exporter.record_cache_operation(op, duration, &labels) {
            tracing::warn!(cache = %self.name, %err, "metrics exporter failed to record operation");
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Cache<V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_with_context(&HookContext::new(), key, &[])
    }

    pub fn get_with_context(&self, ctx: &HookContext, key: &str, args: &[KeyArg]) -> Option<V> {
        let start = Instant::now();
        let found = self.store.get(key);
        let op = match &found {
            Some(value) => {
                self.stats.record_hit();
                self.hooks.fire_hit(ctx, key, value, args);
                CacheOperation::Hit
            }
            None => {
                self.stats.record_miss();
                self.hooks.fire_miss(ctx, key, args);
                CacheOperation::Miss
            }
        };
        self.report_operation(op, start.elapsed());
        found
    }

    /// Non-mutating existence check: unlike `Get`, never updates recency or
    /// frequency ordering and never fires hit/miss hooks.
    pub fn has(&self, key: &str) -> bool {
        self.store.peek(key).is_some()
    }

    pub fn set(&self, key: &str, value: V) -> Result<()> {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        let start = Instant::now();
        let result = self.store.set(key, value, ttl);
        self.report_operation(CacheOperation::Set, start.elapsed());
        result
    }

    /// Fires `OnInvalidate` regardless of whether `key` was present, per
    /// the facade's invalidation contract; the return value tells the
    /// caller whether anything was actually removed.
    pub fn delete(&self, key: &str) -> bool {
        let start = Instant::now();
        let existed = self.store.delete(key);
        self.stats.record_invalidation();
        self.hooks.fire_invalidate(&HookContext::new(), key);
        self.report_operation(CacheOperation::Delete, start.elapsed());
        existed
    }

    /// `None`: absent or expired. `Some(None)`: present, immortal. `Some(Some(d))`:
    /// present with `d` remaining.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        self.store.ttl(key)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.store.len() as u64)
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry, firing exactly one `OnInvalidate` per key
    /// removed.
    pub fn clear(&self) {
        for key in self.store.clear() {
            self.stats.record_invalidation();
            self.hooks.fire_invalidate(&HookContext::new(), &key);
        }
    }

    /// Runs one TTL sweep pass immediately, outside the background
    /// scheduler.
    pub fn cleanup(&self) -> usize {
        self.store.cleanup()
    }

    pub fn close(&self) {
        self.store.close();
        if let Some((handle, stop_pair)) = self.reporter.lock().take() {
            *stop_pair.0.lock() = true;
            stop_pair.1.notify_all();
            let _ = handle.join();
        }
    }

    /// Spawns the periodic `memocache-metrics-<name>` background thread that
    /// calls [`MetricsExporter::export_stats`] every `interval`, mirroring
    /// [`crate::store::MemoryStore`]'s TTL sweeper thread.
    fn start_reporter(&self, exporter: Arc<dyn MetricsExporter>, interval: Duration) {
        let stop_pair = Arc::new((Mutex::new(false), Condvar::new()));
        let sp = stop_pair.clone();
        let stats = self.stats.clone();
        let store = self.store.clone();
        let name = self.name.clone();
        let labels = self.metric_labels.clone();
        let handle = thread::Builder::new()
            .name(format!("memocache-metrics-{name}"))
            .spawn(move || loop {
                let mut stop = sp.0.lock();
                let wait_result = sp.1.wait_for(&mut stop, interval);
                let should_stop = *stop;
                drop(stop);
                if should_stop {
                    break;
                }
                if wait_result.timed_out() {
                    let snapshot = stats.snapshot(store.len() as u64);
                    let mut label_refs: Vec<(&str, &str)> = vec![("cache_name", name.as_str())];
                    label_refs.extend(labels.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                    if let Err(err) = exporter.export_stats(&snapshot, &label_refs) {
                        tracing::warn!(cache = %name, %err, "metrics exporter failed to export stats");
                    }
                }
            })
            .expect("failed to spawn memocache metrics reporter thread");
        *self.reporter.lock() = Some((handle, stop_pair));
    }

    pub fn hooks(&self) -> &Arc<HookPipeline<V>> {
        &self.hooks
    }

    /// Looks up `key`; on miss, runs `compute` through the singleflight
    /// group (coalescing concurrent misses for the same key) and caches a
    /// successful result under `default_ttl`. This is the operation the
    /// `#[cached]` wrapper macro drives.
    pub fn get_or_compute(
        &self,
        key: &str,
        args: &[KeyArg],
        compute: impl FnOnce() -> Result<V>,
    ) -> Result<V> {
        self.get_or_compute_with_ttl(key, args, self.default_ttl, compute)
    }

    pub fn get_or_compute_with_ttl(
        &self,
        key: &str,
        args: &[KeyArg],
        ttl: Option<Duration>,
        compute: impl FnOnce() -> Result<V>,
    ) -> Result<V> {
        self.get_or_compute_filtered(key, args, compute, |_| true, |_| ttl)
    }

    /// Like [`Cache::get_or_compute`], but lets the caller decide, from the
    /// freshly computed value, whether to cache it at all and under which
    /// TTL. The `#[cached]` wrapper uses this to implement `cache_errors`/
    /// `error_ttl`, where the "value" is itself a `Result<T, E>` and only
    /// `Ok`s are cached unless error-caching is opted into.
    ///
    /// A cache-store failure while writing back the computed value is
    /// logged and otherwise ignored: the caller still receives the value it
    /// just computed, per §7's `StoreUnavailable` semantics for `Set`.
    pub fn get_or_compute_filtered(
        &self,
        key: &str,
        args: &[KeyArg],
        compute: impl FnOnce() -> Result<V>,
        should_cache: impl FnOnce(&V) -> bool,
        ttl_for: impl FnOnce(&V) -> Option<Duration>,
    ) -> Result<V> {
        self.get_or_compute_filtered_with_context(
            &HookContext::new(),
            key,
            args,
            compute,
            should_cache,
            ttl_for,
        )
    }

    /// Context-aware form of [`Cache::get_or_compute_filtered`]: the
    /// `#[cached]` wrapper extracts `ctx` from a function's ambient context
    /// parameter (if any) and threads it through so context-aware and
    /// conditional hooks see it on hit and miss alike.
    pub fn get_or_compute_filtered_with_context(
        &self,
        ctx: &HookContext,
        key: &str,
        args: &[KeyArg],
        compute: impl FnOnce() -> Result<V>,
        should_cache: impl FnOnce(&V) -> bool,
        ttl_for: impl FnOnce(&V) -> Option<Duration>,
    ) -> Result<V> {
        let start = Instant::now();
        if let Some(value) = self.store.get(key) {
            self.stats.record_hit();
            self.hooks.fire_hit(ctx, key, &value, args);
            self.report_operation(CacheOperation::Hit, start.elapsed());
            return Ok(value);
        }
        self.stats.record_miss();
        self.hooks.fire_miss(ctx, key, args);
        self.report_operation(CacheOperation::Miss, start.elapsed());

        self.stats.in_flight_enter();
        let (result, shared) = self.singleflight.do_call(key, compute);
        self.stats.in_flight_exit();

        // Only the singleflight leader writes back: a follower re-Set would
        // double-count an LFU touch and push out a TTL a second time for a
        // value that's already in the store.
        if !shared {
            if let Ok(ref value) = result {
                if should_cache(value) {
                    let ttl = ttl_for(value);
                    if let Err(err) = self.set_with_ttl(key, value.clone(), ttl) {
                        tracing::warn!(%key, %err, "failed to cache computed value");
                    }
                }
            }
        }
        result
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }
}

/// Fluent builder for [`Cache`], mirroring the spec's `MaxEntries`/
/// `DefaultTTL`/`CleanupInterval`/`EvictionType`/`Hooks` configuration
/// surface.
pub struct CacheBuilder<V> {
    name: String,
    max_entries: usize,
    default_ttl: Option<Duration>,
    cleanup_interval: Duration,
    eviction: StrategyKind,
    legacy_lru_eviction_reason: bool,
    hooks: Arc<HookPipeline<V>>,
    metrics: Option<Arc<dyn MetricsExporter>>,
    metric_labels: Vec<(String, String)>,
    metrics_reporting_interval: Duration,
}

impl<V: Clone + Send + Sync + 'static> CacheBuilder<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_entries: 1000,
            default_ttl: None,
            cleanup_interval: Duration::from_secs(60),
            eviction: StrategyKind::Lru,
            legacy_lru_eviction_reason: false,
            hooks: Arc::new(HookPipeline::new()),
            metrics: None,
            metric_labels: Vec::new(),
            metrics_reporting_interval: Duration::ZERO,
        }
    }

    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Like [`CacheBuilder::default_ttl`], but takes the `Option` directly —
    /// the `#[cached]` wrapper's `ttl` attribute is itself optional.
    pub fn default_ttl_opt(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Zero disables the background sweeper; expired entries are then only
    /// reaped lazily, on `Get`/`Cleanup`.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn eviction(mut self, kind: StrategyKind) -> Self {
        self.eviction = kind;
        self
    }

    /// When `true` and the eviction strategy is LRU, capacity evictions
    /// report [`EvictReason::Lru`] instead of the canonical
    /// [`EvictReason::Capacity`].
    pub fn legacy_lru_eviction_reason(mut self, enabled: bool) -> Self {
        self.legacy_lru_eviction_reason = enabled;
        self
    }

    pub fn hooks(mut self, hooks: Arc<HookPipeline<V>>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Installs a [`MetricsExporter`]; once set, every public operation
    /// reports its elapsed duration via `record_cache_operation`, tagged
    /// with a `cache_name` label plus any configured via
    /// [`CacheBuilder::metric_labels`].
    pub fn metrics(mut self, exporter: Arc<dyn MetricsExporter>) -> Self {
        self.metrics = Some(exporter);
        self
    }

    pub fn metric_labels(mut self, labels: Vec<(String, String)>) -> Self {
        self.metric_labels = labels;
        self
    }

    /// Enables a `memocache-metrics-<name>` background thread that calls
    /// [`MetricsExporter::export_stats`] every `interval`, in addition to
    /// the per-operation reporting `CacheBuilder::metrics` already wires up.
    /// Zero (the default) disables it. Has no effect unless a `metrics`
    /// exporter is also configured.
    pub fn metrics_reporting_interval(mut self, interval: Duration) -> Self {
        self.metrics_reporting_interval = interval;
        self
    }

    pub fn build(self) -> Result<Cache<V>> {
        if self.max_entries == 0 {
            return Err(Error::ConfigInvalid(
                "max_entries must be positive".to_string(),
            ));
        }

        let strategy: Box<dyn EvictionStrategy<V>> = match self.eviction {
            StrategyKind::Lru => Box::new(LruStrategy::new(self.max_entries)?),
            StrategyKind::Lfu => Box::new(LfuStrategy::new(self.max_entries)?),
            StrategyKind::Fifo => Box::new(FifoStrategy::new(self.max_entries)?),
        };

        let stats = Arc::new(Stats::new());
        let hooks = self.hooks;

        let evict_stats = stats.clone();
        let evict_hooks = hooks.clone();
        let evict_metrics = self.metrics.clone();
        let evict_name = self.name.clone();
        let evict_labels = self.metric_labels.clone();
        let on_evict: Arc<dyn Fn(&str, &V, EvictReason) + Send + Sync> =
            Arc::new(move |key, value, reason| {
                evict_stats.record_eviction();
                evict_hooks.fire_evict(&HookContext::new(), key, value, reason);
                if let Some(exporter) = evict_metrics.as_ref() {
                    let mut labels: Vec<(&str, &str)> = vec![("cache_name", evict_name.as_str())];
                    labels.extend(evict_labels.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                    if let Err(err) =
                        exporter.record_cache_operation(CacheOperation::Eviction, Duration::ZERO, &labels)
                    {
                        tracing::warn!(cache = %evict_name, %err, "metrics exporter failed to record eviction");
                    }
                }
            });

        let store = MemoryStore::new(
            strategy,
            self.legacy_lru_eviction_reason,
            on_evict,
            self.cleanup_interval,
            self.name.clone(),
        );

        let cache = Cache {
            name: self.name,
            store,
            hooks,
            stats,
            singleflight: Group::new(),
            default_ttl: self.default_ttl,
            metrics: self.metrics.clone(),
            metric_labels: self.metric_labels,
            reporter: Mutex::new(None),
        };
        if !self.metrics_reporting_interval.is_zero() {
            if let Some(exporter) = self.metrics {
                cache.start_reporter(exporter, self.metrics_reporting_interval);
            }
        }
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread as std_thread;

    struct CountingExporter {
        sets: AtomicU64,
        exports: AtomicU64,
    }

    impl MetricsExporter for CountingExporter {
        fn export_stats(&self, _snapshot: &StatsSnapshot, _labels: &[(&str, &str)]) -> Result<()> {
            self.exports.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn record_cache_operation(
            &self,
            op: CacheOperation,
            _duration: Duration,
            _labels: &[(&str, &str)],
        ) -> Result<()> {
            if op == CacheOperation::Set {
                self.sets.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
        fn increment_counter(&self, _name: &str, _labels: &[(&str, &str)]) -> Result<()> {
            Ok(())
        }
        fn record_histogram(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) -> Result<()> {
            Ok(())
        }
        fn set_gauge(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) -> Result<()> {
            Ok(())
        }
        fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn concurrent_get_or_compute_followers_do_not_rewrite_the_store() {
        let exporter = Arc::new(CountingExporter {
            sets: AtomicU64::new(0),
            exports: AtomicU64::new(0),
        });
        let cache: Arc<Cache<i32>> = Arc::new(
            CacheBuilder::new("c")
                .max_entries(10)
                .metrics(exporter.clone())
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let cache = cache.clone();
                std_thread::spawn(move || {
                    cache
                        .get_or_compute("k", &[], || {
                            std_thread::sleep(Duration::from_millis(20));
                            Ok(42)
                        })
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 42);
        }

        // Only the singleflight leader should have written the computed
        // value back; 9 followers re-Setting would corrupt LFU touch counts
        // and repeatedly push out TTLs.
        assert_eq!(exporter.sets.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn metrics_reporter_thread_exports_stats_periodically_and_stops_on_close() {
        let exporter = Arc::new(CountingExporter {
            sets: AtomicU64::new(0),
            exports: AtomicU64::new(0),
        });
        let cache = CacheBuilder::<i32>::new("c")
            .max_entries(10)
            .metrics(exporter.clone())
            .metrics_reporting_interval(Duration::from_millis(10))
            .build()
            .unwrap();

        std_thread::sleep(Duration::from_millis(60));
        assert!(exporter.exports.load(Ordering::SeqCst) >= 1);
        cache.close();

        let seen_at_close = exporter.exports.load(Ordering::SeqCst);
        std_thread::sleep(Duration::from_millis(40));
        assert_eq!(exporter.exports.load(Ordering::SeqCst), seen_at_close);
    }

    #[test]
    fn zero_max_entries_is_config_invalid() {
        let result = CacheBuilder::<i32>::new("c").max_entries(0).build();
        assert!(matches!(result, Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn get_miss_then_set_then_hit() {
        let cache = CacheBuilder::<i32>::new("c").max_entries(10).build().unwrap();
        assert_eq!(cache.get("a"), None);
        cache.set("a", 1).unwrap();
        assert_eq!(cache.get("a"), Some(1));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn has_does_not_mutate_lru_order() {
        let cache = CacheBuilder::<i32>::new("c")
            .max_entries(2)
            .eviction(StrategyKind::Lru)
            .build()
            .unwrap();
        cache.set("a", 1).unwrap();
        cache.set("b", 2).unwrap();
        assert!(cache.has("a"));
        cache.set("c", 3).unwrap();
        // "a" should have been evicted: has() must not have promoted it.
        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
    }

    #[test]
    fn clear_fires_one_invalidate_per_key() {
        let cache = CacheBuilder::<i32>::new("c").max_entries(10).build().unwrap();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = count.clone();
        cache
            .hooks()
            .on_invalidate_legacy(move |_| {
                c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            });
        cache.set("a", 1).unwrap();
        cache.set("b", 2).unwrap();
        cache.clear();
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn get_or_compute_caches_result() {
        let cache = CacheBuilder::<i32>::new("c").max_entries(10).build().unwrap();
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        for _ in 0..3 {
            let c = calls.clone();
            let v = cache
                .get_or_compute("k", &[], move || {
                    c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(v, 7);
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn immortal_entry_ttl_is_some_none() {
        let cache = CacheBuilder::<i32>::new("c").max_entries(10).build().unwrap();
        cache.set("a", 1).unwrap();
        assert_eq!(cache.ttl("a"), Some(None));
    }

    #[test]
    fn delete_fires_invalidate_regardless_of_prior_presence() {
        let cache = CacheBuilder::<i32>::new("c").max_entries(10).build().unwrap();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = count.clone();
        cache
            .hooks()
            .on_invalidate_legacy(move |_| {
                c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            });
        assert!(!cache.delete("missing"));
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
        cache.set("a", 1).unwrap();
        assert!(cache.delete("a"));
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
