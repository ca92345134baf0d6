use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::Error;

struct InFlightCall<V> {
    result: Mutex<Option<Result<V, Error>>>,
    done: Condvar,
}

/// Coalesces concurrent identical-key computations into one underlying
/// invocation. At most one call per key is ever in flight; every other
/// caller for that key becomes a follower that blocks for the leader's
/// result instead of recomputing it.
pub struct Group<V> {
    calls: Mutex<HashMap<String, Arc<InFlightCall<V>>>>,
}

impl<V> Default for Group<V> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> Group<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `compute` for `key`, coalescing concurrent callers. Returns
    /// `(value, shared)` where `shared` is `true` for every follower and
    /// `false` for the leader that actually ran `compute`.
    pub fn do_call(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<V, Error>,
    ) -> (Result<V, Error>, bool) {
        let (call, is_leader) = {
            let mut calls = self.calls.lock();
            if let Some(existing) = calls.get(key) {
                (existing.clone(), false)
            } else {
                let call = Arc::new(InFlightCall {
                    result: Mutex::new(None),
                    done: Condvar::new(),
                });
                calls.insert(key.to_string(), call.clone());
                (call, true)
            }
        };

        if is_leader {
            let outcome = catch_unwind(AssertUnwindSafe(compute)).unwrap_or_else(|payload| {
                Err(Error::ComputationAborted(panic_message(payload)))
            });

            // Evict the record before waking followers: a call that arrives
            // immediately after completion must start a fresh computation.
            self.calls.lock().remove(key);

            let mut result_slot = call.result.lock();
            *result_slot = Some(outcome.clone());
            call.done.notify_all();

            (outcome, false)
        } else {
            let mut result_slot = call.result.lock();
            while result_slot.is_none() {
                call.done.wait(&mut result_slot);
            }
            (result_slot.clone().unwrap(), true)
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.calls.lock().len()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn sequential_calls_each_compute() {
        let group: Group<i32> = Group::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let c = calls.clone();
            let (v, shared) = group.do_call("k", || {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            });
            assert_eq!(v.unwrap(), 1);
            assert!(!shared);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn concurrent_calls_coalesce_into_one_computation() {
        let group = Arc::new(Group::<i32>::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let shared_count = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let group = group.clone();
                let calls = calls.clone();
                let shared_count = shared_count.clone();
                thread::spawn(move || {
                    let (v, shared) = group.do_call("k", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Ok(42)
                    });
                    if shared {
                        shared_count.fetch_add(1, Ordering::SeqCst);
                    }
                    v.unwrap()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(shared_count.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn panic_in_compute_surfaces_as_computation_aborted() {
        let group: Group<i32> = Group::new();
        let (result, shared) = group.do_call("k", || -> Result<i32, Error> {
            panic!("boom");
        });
        assert!(matches!(result, Err(Error::ComputationAborted(_))));
        assert!(!shared);
    }

    #[test]
    fn call_record_is_evicted_after_completion() {
        let group: Group<i32> = Group::new();
        let _ = group.do_call("k", || Ok(1));
        assert_eq!(group.in_flight_count(), 0);
    }
}
