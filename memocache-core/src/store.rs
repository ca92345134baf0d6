use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::eviction::{EvictionStrategy, StrategyKind};
use crate::hooks::EvictReason;

/// Key→entry storage, with or without TTL sweeping. [`MemoryStore`] composes
/// an [`EvictionStrategy`]; an external store (Redis and similar) implements
/// this trait directly and is treated as a black box per the engine's
/// external-store contract (§6) — no adapter ships with this crate.
pub trait Store<V>: Send + Sync
where
    V: Clone,
{
    fn get(&self, key: &str) -> Option<V>;
    /// Read-only enumeration semantics: unlike a naive `Keys()` that calls
    /// `Get` on every key (mutating access order and costing O(N) round
    /// trips for an external store), this never mutates ordering.
    fn peek(&self, key: &str) -> Option<V>;
    fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()>;
    fn delete(&self, key: &str) -> bool;
    fn keys(&self) -> Vec<String>;
    fn len(&self) -> usize;
    /// Clears all entries and returns the keys that were present.
    fn clear(&self) -> Vec<String>;
    fn close(&self);
    /// Remaining TTL: `None` means absent/expired, `Some(None)` means
    /// immortal, `Some(Some(d))` means `d` remaining.
    fn ttl(&self, key: &str) -> Option<Option<Duration>>;
    /// Runs one expiry sweep pass, removing every expired entry. Returns
    /// the number removed. External stores that delegate TTL to their own
    /// native mechanism may always return 0.
    fn cleanup(&self) -> usize;
}

type EvictCallback<V> = Arc<dyn Fn(&str, &V, EvictReason) + Send + Sync>;

/// In-memory [`Store`] backed by a pluggable [`EvictionStrategy`]. Owns
/// exactly one background sweeper thread when constructed with a positive
/// cleanup interval; `close` stops and joins it.
pub struct MemoryStore<V> {
    strategy: Box<dyn EvictionStrategy<V>>,
    legacy_lru_alias: bool,
    on_evict: EvictCallback<V>,
    sweeper: Mutex<Option<(JoinHandle<()>, Arc<(Mutex<bool>, Condvar)>)>>,
    closed: AtomicBool,
}

impl<V: Clone + Send + Sync + 'static> MemoryStore<V> {
    pub fn new(
        strategy: Box<dyn EvictionStrategy<V>>,
        legacy_lru_alias: bool,
        on_evict: EvictCallback<V>,
        cleanup_interval: Duration,
        name: impl Into<String>,
    ) -> Arc<Self> {
        let store = Arc::new(Self {
            strategy,
            legacy_lru_alias,
            on_evict,
            sweeper: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        if !cleanup_interval.is_zero() {
            store.start_sweeper(cleanup_interval, name.into());
        }
        store
    }

    fn start_sweeper(self: &Arc<Self>, interval: Duration, name: String) {
        let stop_pair = Arc::new((Mutex::new(false), Condvar::new()));
        let sp = stop_pair.clone();
        let store = self.clone();
        let handle = thread::Builder::new()
            .name(format!("memocache-sweep-{name}"))
            .spawn(move || loop {
                let mut stop = sp.0.lock();
                let wait_result = sp.1.wait_for(&mut stop, interval);
                let should_stop = *stop;
                drop(stop);
                if should_stop {
                    break;
                }
                if wait_result.timed_out() {
                    let removed = store.cleanup();
                    if removed > 0 {
                        tracing::debug!(removed, "ttl sweep removed expired entries");
                    }
                }
            })
            .expect("failed to spawn memocache sweeper thread");
        *self.sweeper.lock() = Some((handle, stop_pair));
    }

    fn capacity_reason(&self) -> EvictReason {
        if self.legacy_lru_alias && self.strategy.kind() == StrategyKind::Lru {
            EvictReason::Lru
        } else {
            EvictReason::Capacity
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Store<V> for MemoryStore<V> {
    fn get(&self, key: &str) -> Option<V> {
        let peeked = self.strategy.peek(key)?;
        if peeked.is_expired() {
            if let Some(removed) = self.strategy.remove(key) {
                (self.on_evict)(key, &removed.value, EvictReason::Ttl);
            }
            return None;
        }
        self.strategy.get(key).map(|e| e.value)
    }

    fn peek(&self, key: &str) -> Option<V> {
        let entry = self.strategy.peek(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.value)
    }

    fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        if self.closed.load(AtomicOrdering::Acquire) {
            return Err(Error::StoreUnavailable("store is closed".to_string()));
        }
        let entry = crate::entry::Entry::new(value, ttl);
        if let Some((evicted_key, evicted_entry)) = self.strategy.add(key.to_string(), entry) {
            let reason = self.capacity_reason();
            (self.on_evict)(&evicted_key, &evicted_entry.value, reason);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> bool {
        self.strategy.remove(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.strategy.keys()
    }

    fn len(&self) -> usize {
        self.strategy.len()
    }

    fn clear(&self) -> Vec<String> {
        let keys = self.strategy.keys();
        self.strategy.clear();
        keys
    }

    fn close(&self) {
        self.closed.store(true, AtomicOrdering::Release);
        if let Some((handle, stop_pair)) = self.sweeper.lock().take() {
            *stop_pair.0.lock() = true;
            stop_pair.1.notify_all();
            let _ = handle.join();
        }
    }

    fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let entry = self.strategy.peek(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.ttl_remaining())
    }

    fn cleanup(&self) -> usize {
        let mut removed = 0;
        for key in self.strategy.keys() {
            if let Some(entry) = self.strategy.peek(&key) {
                if entry.is_expired() {
                    if let Some(removed_entry) = self.strategy.remove(&key) {
                        (self.on_evict)(&key, &removed_entry.value, EvictReason::Ttl);
                        removed += 1;
                    }
                }
            }
        }
        removed
    }
}
