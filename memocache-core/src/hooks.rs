use std::cmp::Reverse;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::HookContext;
use crate::keygen::KeyArg;

/// Why an entry was evicted. `Lru` is a legacy alias for `Capacity`,
/// preserved only for back-compat when the backing strategy is LRU; it is
/// never emitted for FIFO or LFU (`Capacity` is the canonical reason there).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictReason {
    Capacity,
    Lru,
    Ttl,
}

/// Registration phase; also the dispatch-order key. Legacy and
/// context-aware callbacks run first (in registration order), then
/// priority-ordered callbacks (highest first), then conditional callbacks —
/// matching §4.5's "legacy → context-aware → priority → conditional".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Legacy,
    ContextAware,
    Priority(i64),
    Conditional,
}

impl Phase {
    fn rank(&self) -> u8 {
        match self {
            Phase::Legacy => 0,
            Phase::ContextAware => 1,
            Phase::Priority(_) => 2,
            Phase::Conditional => 3,
        }
    }

    fn priority_value(&self) -> i64 {
        match self {
            Phase::Priority(p) => *p,
            _ => 0,
        }
    }
}

pub type Predicate = Arc<dyn Fn(&HookContext, &str, &[KeyArg]) -> bool + Send + Sync>;

struct Record<F> {
    phase: Phase,
    registration_index: u64,
    predicate: Option<Predicate>,
    callback: F,
}

fn sort_records<F>(records: &mut [Record<F>]) {
    records.sort_by_key(|r| {
        (
            r.phase.rank(),
            Reverse(r.phase.priority_value()),
            r.registration_index,
        )
    });
}

type HitCallback<V> = Arc<dyn Fn(&HookContext, &str, &V, &[KeyArg]) + Send + Sync>;
type MissCallback = Arc<dyn Fn(&HookContext, &str, &[KeyArg]) + Send + Sync>;
type EvictCallback<V> = Arc<dyn Fn(&HookContext, &str, &V, EvictReason) + Send + Sync>;
type InvalidateCallback = Arc<dyn Fn(&HookContext, &str) + Send + Sync>;

/// Ordered, prioritized, conditional event callbacks fired on hit/miss/
/// evict/invalidate. The spec's four registration channels (legacy,
/// context-aware, prioritized, conditional) collapse into one record list
/// per event kind, sorted by `(phase, -priority, registration_index)` —
/// dispatching that list in order reproduces the spec's dispatch order
/// exactly without keeping four parallel lists.
pub struct HookPipeline<V> {
    next_index: AtomicU64,
    on_hit: Mutex<Vec<Record<HitCallback<V>>>>,
    on_miss: Mutex<Vec<Record<MissCallback>>>,
    on_evict: Mutex<Vec<Record<EvictCallback<V>>>>,
    on_invalidate: Mutex<Vec<Record<InvalidateCallback>>>,
}

impl<V> Default for HookPipeline<V> {
    fn default() -> Self {
        Self {
            next_index: AtomicU64::new(0),
            on_hit: Mutex::new(Vec::new()),
            on_miss: Mutex::new(Vec::new()),
            on_evict: Mutex::new(Vec::new()),
            on_invalidate: Mutex::new(Vec::new()),
        }
    }
}

impl<V> HookPipeline<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_index(&self) -> u64 {
        self.next_index.fetch_add(1, Ordering::Relaxed)
    }

    pub fn on_hit_legacy(&self, f: impl Fn(&str, &V) + Send + Sync + 'static) {
        self.push_hit(Phase::Legacy, None, move |_ctx, k, v, _args| f(k, v));
    }

    pub fn on_hit_context(
        &self,
        f: impl Fn(&HookContext, &str, &V, &[KeyArg]) + Send + Sync + 'static,
    ) {
        self.push_hit(Phase::ContextAware, None, f);
    }

    pub fn on_hit_priority(
        &self,
        priority: i64,
        f: impl Fn(&HookContext, &str, &V, &[KeyArg]) + Send + Sync + 'static,
    ) {
        self.push_hit(Phase::Priority(priority), None, f);
    }

    pub fn on_hit_conditional(
        &self,
        predicate: Predicate,
        f: impl Fn(&HookContext, &str, &V, &[KeyArg]) + Send + Sync + 'static,
    ) {
        self.push_hit(Phase::Conditional, Some(predicate), f);
    }

    fn push_hit(
        &self,
        phase: Phase,
        predicate: Option<Predicate>,
        f: impl Fn(&HookContext, &str, &V, &[KeyArg]) + Send + Sync + 'static,
    ) {
        let mut records = self.on_hit.lock();
        records.push(Record {
            phase,
            registration_index: self.next_index(),
            predicate,
            callback: Arc::new(f),
        });
        sort_records(&mut records);
    }

    pub fn on_miss_legacy(&self, f: impl Fn(&str) + Send + Sync + 'static) {
        self.push_miss(Phase::Legacy, None, move |_ctx, k, _args| f(k));
    }

    pub fn on_miss_context(
        &self,
        f: impl Fn(&HookContext, &str, &[KeyArg]) + Send + Sync + 'static,
    ) {
        self.push_miss(Phase::ContextAware, None, f);
    }

    pub fn on_miss_priority(
        &self,
        priority: i64,
        f: impl Fn(&HookContext, &str, &[KeyArg]) + Send + Sync + 'static,
    ) {
        self.push_miss(Phase::Priority(priority), None, f);
    }

    pub fn on_miss_conditional(
        &self,
        predicate: Predicate,
        f: impl Fn(&HookContext, &str, &[KeyArg]) + Send + Sync + 'static,
    ) {
        self.push_miss(Phase::Conditional, Some(predicate), f);
    }

    fn push_miss(
        &self,
        phase: Phase,
        predicate: Option<Predicate>,
        f: impl Fn(&HookContext, &str, &[KeyArg]) + Send + Sync + 'static,
    ) {
        let mut records = self.on_miss.lock();
        records.push(Record {
            phase,
            registration_index: self.next_index(),
            predicate,
            callback: Arc::new(f),
        });
        sort_records(&mut records);
    }

    pub fn on_evict_legacy(&self, f: impl Fn(&str, &V, EvictReason) + Send + Sync + 'static) {
        self.push_evict(Phase::Legacy, None, move |_ctx, k, v, r| f(k, v, r));
    }

    pub fn on_evict_context(
        &self,
        f: impl Fn(&HookContext, &str, &V, EvictReason) + Send + Sync + 'static,
    ) {
        self.push_evict(Phase::ContextAware, None, f);
    }

    pub fn on_evict_priority(
        &self,
        priority: i64,
        f: impl Fn(&HookContext, &str, &V, EvictReason) + Send + Sync + 'static,
    ) {
        self.push_evict(Phase::Priority(priority), None, f);
    }

    pub fn on_evict_conditional(
        &self,
        predicate: Predicate,
        f: impl Fn(&HookContext, &str, &V, EvictReason) + Send + Sync + 'static,
    ) {
        self.push_evict(Phase::Conditional, Some(predicate), f);
    }

    fn push_evict(
        &self,
        phase: Phase,
        predicate: Option<Predicate>,
        f: impl Fn(&HookContext, &str, &V, EvictReason) + Send + Sync + 'static,
    ) {
        let mut records = self.on_evict.lock();
        records.push(Record {
            phase,
            registration_index: self.next_index(),
            predicate,
            callback: Arc::new(f),
        });
        sort_records(&mut records);
    }

    pub fn on_invalidate_legacy(&self, f: impl Fn(&str) + Send + Sync + 'static) {
        self.push_invalidate(Phase::Legacy, None, move |_ctx, k| f(k));
    }

    pub fn on_invalidate_context(&self, f: impl Fn(&HookContext, &str) + Send + Sync + 'static) {
        self.push_invalidate(Phase::ContextAware, None, f);
    }

    pub fn on_invalidate_priority(
        &self,
        priority: i64,
        f: impl Fn(&HookContext, &str) + Send + Sync + 'static,
    ) {
        self.push_invalidate(Phase::Priority(priority), None, f);
    }

    pub fn on_invalidate_conditional(
        &self,
        predicate: Predicate,
        f: impl Fn(&HookContext, &str) + Send + Sync + 'static,
    ) {
        self.push_invalidate(Phase::Conditional, Some(predicate), f);
    }

    fn push_invalidate(
        &self,
        phase: Phase,
        predicate: Option<Predicate>,
        f: impl Fn(&HookContext, &str) + Send + Sync + 'static,
    ) {
        let mut records = self.on_invalidate.lock();
        records.push(Record {
            phase,
            registration_index: self.next_index(),
            predicate,
            callback: Arc::new(f),
        });
        sort_records(&mut records);
    }

    pub fn fire_hit(&self, ctx: &HookContext, key: &str, value: &V, args: &[KeyArg]) {
        let records = self.on_hit.lock();
        for r in records.iter() {
            if r.predicate.as_ref().is_some_and(|p| !p(ctx, key, args)) {
                continue;
            }
            invoke(|| (r.callback)(ctx, key, value, args));
        }
    }

    pub fn fire_miss(&self, ctx: &HookContext, key: &str, args: &[KeyArg]) {
        let records = self.on_miss.lock();
        for r in records.iter() {
            if r.predicate.as_ref().is_some_and(|p| !p(ctx, key, args)) {
                continue;
            }
            invoke(|| (r.callback)(ctx, key, args));
        }
    }

    pub fn fire_evict(&self, ctx: &HookContext, key: &str, value: &V, reason: EvictReason) {
        let records = self.on_evict.lock();
        for r in records.iter() {
            if r.predicate.as_ref().is_some_and(|p| !p(ctx, key, &[])) {
                continue;
            }
            invoke(|| (r.callback)(ctx, key, value, reason));
        }
    }

    pub fn fire_invalidate(&self, ctx: &HookContext, key: &str) {
        let records = self.on_invalidate.lock();
        for r in records.iter() {
            if r.predicate.as_ref().is_some_and(|p| !p(ctx, key, &[])) {
                continue;
            }
            invoke(|| (r.callback)(ctx, key));
        }
    }
}

/// Runs a single callback, isolating a panic so one misbehaving hook never
/// prevents the rest of the event's callbacks from running.
fn invoke(f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!("hook callback panicked; continuing with remaining hooks");
    }
}

/// Predicate helper: true when `key` starts with `prefix`.
pub fn key_prefix(prefix: impl Into<String>) -> Predicate {
    let prefix = prefix.into();
    Arc::new(move |_ctx, key, _args| key.starts_with(&prefix))
}

/// Predicate helper: true when the context value for `name` equals `value`.
pub fn context_value_equals(name: impl Into<String>, value: impl Into<String>) -> Predicate {
    let name = name.into();
    let value = value.into();
    Arc::new(move |ctx, _key, _args| ctx.get(&name) == Some(value.as_str()))
}

/// Predicate helper: conjunction of predicates.
pub fn and(predicates: Vec<Predicate>) -> Predicate {
    Arc::new(move |ctx, key, args| predicates.iter().all(|p| p(ctx, key, args)))
}

/// Predicate helper: disjunction of predicates.
pub fn or(predicates: Vec<Predicate>) -> Predicate {
    Arc::new(move |ctx, key, args| predicates.iter().any(|p| p(ctx, key, args)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn dispatch_order_is_legacy_then_context_then_priority_then_conditional() {
        let pipeline: HookPipeline<i32> = HookPipeline::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        pipeline.on_hit_conditional(key_prefix(""), move |_, _, _, _| o.lock().push("cond"));
        let o = order.clone();
        pipeline.on_hit_priority(1, move |_, _, _, _| o.lock().push("prio-low"));
        let o = order.clone();
        pipeline.on_hit_priority(10, move |_, _, _, _| o.lock().push("prio-high"));
        let o = order.clone();
        pipeline.on_hit_context(move |_, _, _, _| o.lock().push("ctx"));
        let o = order.clone();
        pipeline.on_hit_legacy(move |_, _| o.lock().push("legacy"));

        pipeline.fire_hit(&HookContext::new(), "k", &1, &[]);

        assert_eq!(
            *order.lock(),
            vec!["legacy", "ctx", "prio-high", "prio-low", "cond"]
        );
    }

    #[test]
    fn conditional_hook_only_fires_when_predicate_true() {
        let pipeline: HookPipeline<i32> = HookPipeline::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        pipeline.on_hit_conditional(key_prefix("user:"), move |_, _, _, _| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        pipeline.fire_hit(&HookContext::new(), "other:1", &1, &[]);
        assert_eq!(count.load(Ordering::Relaxed), 0);

        pipeline.fire_hit(&HookContext::new(), "user:1", &1, &[]);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn panicking_hook_does_not_stop_later_hooks() {
        let pipeline: HookPipeline<i32> = HookPipeline::new();
        let count = Arc::new(AtomicUsize::new(0));
        pipeline.on_hit_legacy(|_, _| panic!("boom"));
        let c = count.clone();
        pipeline.on_hit_context(move |_, _, _, _| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        pipeline.fire_hit(&HookContext::new(), "k", &1, &[]);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn and_or_predicate_combinators() {
        let a = key_prefix("user:");
        let b = context_value_equals("tenant", "acme");
        let both = and(vec![a.clone(), b.clone()]);
        let either = or(vec![a, b]);

        let ctx = HookContext::new().with_value("tenant", "acme");
        assert!(both(&ctx, "user:1", &[]));
        assert!(either(&ctx, "other:1", &[]));
        assert!(!both(&ctx, "other:1", &[]));
    }
}
