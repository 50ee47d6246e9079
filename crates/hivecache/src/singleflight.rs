//! Single-flight request coalescing.
//!
//! Collapses N concurrent calls for the same key into one execution of
//! the supplied closure; every caller gets a clone of the one result.
//! Results are never reused across calls: once the producing caller
//! finishes, the next arrival starts fresh.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// One in-flight call: a one-shot broadcast of the eventual result.
struct Call<T> {
    result: Mutex<Option<T>>,
    ready: Condvar,
}

/// De-duplicates concurrent invocations keyed by string.
///
/// The internal map mutex is held only across map manipulation, never
/// across the user closure, so calls with disjoint keys proceed fully
/// in parallel.
pub struct SingleFlight<T> {
    calls: Mutex<HashMap<String, Arc<Call<T>>>>,
}

impl<T: Clone> SingleFlight<T> {
    /// Create an empty coalescer.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` for `key`, or wait for the invocation already in flight.
    ///
    /// For any set of overlapping calls with the same key, `f` executes
    /// exactly once and every caller observes the same result. A waiter
    /// cannot cancel the producer; once `f` has started, all waiters see
    /// its outcome.
    pub fn run<F>(&self, key: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let call = {
            let mut calls = self.calls.lock();
            if let Some(existing) = calls.get(key) {
                let call = Arc::clone(existing);
                drop(calls);

                let mut result = call.result.lock();
                loop {
                    if let Some(value) = result.as_ref() {
                        return value.clone();
                    }
                    call.ready.wait(&mut result);
                }
            }

            let call = Arc::new(Call {
                result: Mutex::new(None),
                ready: Condvar::new(),
            });
            calls.insert(key.to_string(), Arc::clone(&call));
            call
        };

        let value = f();

        *call.result.lock() = Some(value.clone());
        call.ready.notify_all();

        self.calls.lock().remove(key);
        value
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
