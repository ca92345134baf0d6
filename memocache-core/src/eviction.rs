use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::entry::Entry;
use crate::error::{Error, Result};

/// Which closed-variant strategy backs a [`EvictionStrategy`] instance.
/// Used only to decide whether the legacy `Lru` eviction-reason alias may be
/// emitted (see [`crate::hooks::EvictReason`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    Lru,
    Lfu,
    Fifo,
}

/// Capacity-bounded key→entry tracking with a pluggable victim-selection
/// policy. Every method is internally synchronized (a `parking_lot::Mutex`
/// guards the implementation's state) so any thread may call any operation
/// without an external lock; callers needing cross-operation atomicity
/// (e.g. the [`crate::store::MemoryStore`]) still serialize through their own
/// lock, acquired *before* ever touching the strategy (cache → strategy,
/// never the reverse).
pub trait EvictionStrategy<V>: Send + Sync
where
    V: Clone,
{
    /// Inserts or updates `key`. Returns the evicted `(key, entry)` pair iff
    /// the insertion of a *new* key caused the strategy to exceed capacity.
    /// Updating an existing key never evicts.
    fn add(&self, key: String, entry: Entry<V>) -> Option<(String, Entry<V>)>;

    /// Looks up `key`, applying the policy's on-hit ordering/frequency update.
    fn get(&self, key: &str) -> Option<Entry<V>>;

    /// Looks up `key` without any side effect on ordering or frequency.
    fn peek(&self, key: &str) -> Option<Entry<V>>;

    /// Removes `key` if present, returning its entry.
    fn remove(&self, key: &str) -> Option<Entry<V>>;

    fn contains(&self, key: &str) -> bool;

    fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);

    fn capacity(&self) -> usize;

    fn kind(&self) -> StrategyKind;
}

struct Inner<V> {
    map: HashMap<String, Entry<V>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl<V> Inner<V> {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(Error::ConfigInvalid(
            "eviction strategy capacity must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Least Recently Used: a hash index plus a recency queue. `get` and `add`
/// both move the touched key to the most-recently-used end; the victim on
/// overflow is always the queue's front.
pub struct LruStrategy<V> {
    inner: Mutex<Inner<V>>,
}

impl<V> LruStrategy<V> {
    pub fn new(capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            inner: Mutex::new(Inner::new(capacity)),
        })
    }

    fn move_to_back(order: &mut VecDeque<String>, key: &str) {
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
        order.push_back(key.to_string());
    }
}

impl<V: Clone + Send + Sync> EvictionStrategy<V> for LruStrategy<V> {
    fn add(&self, key: String, entry: Entry<V>) -> Option<(String, Entry<V>)> {
        let mut inner = self.inner.lock();
        let is_new = !inner.map.contains_key(&key);
        inner.map.insert(key.clone(), entry);
        Self::move_to_back(&mut inner.order, &key);

        if is_new && inner.map.len() > inner.capacity {
            if let Some(victim) = inner.order.pop_front() {
                let evicted = inner.map.remove(&victim);
                return evicted.map(|e| (victim, e));
            }
        }
        None
    }

    fn get(&self, key: &str) -> Option<Entry<V>> {
        let mut inner = self.inner.lock();
        if !inner.map.contains_key(key) {
            return None;
        }
        Self::move_to_back(&mut inner.order, key);
        let entry = inner.map.get_mut(key).unwrap();
        entry.touch();
        Some(entry.clone())
    }

    fn peek(&self, key: &str) -> Option<Entry<V>> {
        self.inner.lock().map.get(key).cloned()
    }

    fn remove(&self, key: &str) -> Option<Entry<V>> {
        let mut inner = self.inner.lock();
        let removed = inner.map.remove(key);
        if removed.is_some() {
            if let Some(pos) = inner.order.iter().position(|k| k == key) {
                inner.order.remove(pos);
            }
        }
        removed
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.lock().map.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.lock().map.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.order.clear();
    }

    fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Lru
    }
}

/// First In, First Out: insertion order is fixed at `add` time and is never
/// disturbed by `get`.
pub struct FifoStrategy<V> {
    inner: Mutex<Inner<V>>,
}

impl<V> FifoStrategy<V> {
    pub fn new(capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            inner: Mutex::new(Inner::new(capacity)),
        })
    }
}

impl<V: Clone + Send + Sync> EvictionStrategy<V> for FifoStrategy<V> {
    fn add(&self, key: String, entry: Entry<V>) -> Option<(String, Entry<V>)> {
        let mut inner = self.inner.lock();
        let is_new = !inner.map.contains_key(&key);
        inner.map.insert(key.clone(), entry);
        if is_new {
            inner.order.push_back(key);
        }

        if is_new && inner.map.len() > inner.capacity {
            if let Some(victim) = inner.order.pop_front() {
                let evicted = inner.map.remove(&victim);
                return evicted.map(|e| (victim, e));
            }
        }
        None
    }

    fn get(&self, key: &str) -> Option<Entry<V>> {
        let mut inner = self.inner.lock();
        let entry = inner.map.get_mut(key)?;
        entry.touch();
        Some(entry.clone())
    }

    fn peek(&self, key: &str) -> Option<Entry<V>> {
        self.inner.lock().map.get(key).cloned()
    }

    fn remove(&self, key: &str) -> Option<Entry<V>> {
        let mut inner = self.inner.lock();
        let removed = inner.map.remove(key);
        if removed.is_some() {
            if let Some(pos) = inner.order.iter().position(|k| k == key) {
                inner.order.remove(pos);
            }
        }
        removed
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.lock().map.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.lock().map.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.order.clear();
    }

    fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Fifo
    }
}

/// Least Frequently Used: evicts the minimum-frequency key; ties are broken
/// deterministically by oldest insertion order. `get` and a repeat `add`
/// both increment the frequency counter; `get` never reorders the insertion
/// queue (it exists only to make tie-breaking deterministic).
pub struct LfuStrategy<V> {
    inner: Mutex<Inner<V>>,
}

impl<V> LfuStrategy<V> {
    pub fn new(capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            inner: Mutex::new(Inner::new(capacity)),
        })
    }

    /// Finds the minimum-frequency key, excluding `skip` — the key just
    /// inserted, which always starts at frequency 0 and must not be able to
    /// evict itself on its own insertion.
    fn find_min_frequency_key(inner: &Inner<V>, skip: &str) -> Option<String> {
        inner
            .order
            .iter()
            .filter(|k| k.as_str() != skip)
            .filter_map(|k| inner.map.get(k).map(|e| (k.clone(), e.frequency)))
            .min_by_key(|(_, freq)| *freq)
            .map(|(k, _)| k)
    }
}

impl<V: Clone + Send + Sync> EvictionStrategy<V> for LfuStrategy<V> {
    fn add(&self, key: String, entry: Entry<V>) -> Option<(String, Entry<V>)> {
        let mut inner = self.inner.lock();
        let is_new = !inner.map.contains_key(&key);
        if is_new {
            inner.map.insert(key.clone(), entry);
            inner.order.push_back(key.clone());
        } else {
            let existing_freq = inner.map.get(&key).map(|e| e.frequency).unwrap_or(0);
            let mut entry = entry;
            entry.frequency = existing_freq.saturating_add(1);
            inner.map.insert(key.clone(), entry);
        }

        if is_new && inner.map.len() > inner.capacity {
            if let Some(victim) = Self::find_min_frequency_key(&inner, &key) {
                let evicted = inner.map.remove(&victim);
                if let Some(pos) = inner.order.iter().position(|k| k == &victim) {
                    inner.order.remove(pos);
                }
                return evicted.map(|e| (victim, e));
            }
        }
        None
    }

    fn get(&self, key: &str) -> Option<Entry<V>> {
        let mut inner = self.inner.lock();
        let entry = inner.map.get_mut(key)?;
        entry.touch();
        entry.increment_frequency();
        Some(entry.clone())
    }

    fn peek(&self, key: &str) -> Option<Entry<V>> {
        self.inner.lock().map.get(key).cloned()
    }

    fn remove(&self, key: &str) -> Option<Entry<V>> {
        let mut inner = self.inner.lock();
        let removed = inner.map.remove(key);
        if removed.is_some() {
            if let Some(pos) = inner.order.iter().position(|k| k == key) {
                inner.order.remove(pos);
            }
        }
        removed
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.lock().map.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.lock().map.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.order.clear();
    }

    fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Lfu
    }
}
