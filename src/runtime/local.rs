use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::store::OptimisticStore;

use super::counter::{CounterStream, CounterSubscription};

/// The one mutual-exclusion domain over optimistic state and its counter.
///
/// Critical sections are pure set manipulation and are never held across an
/// `.await`.
#[derive(Debug)]
pub(crate) struct LocalState {
    inner: Mutex<Local>,
}

#[derive(Debug)]
struct Local {
    store: OptimisticStore,
    counter: CounterStream,
}

impl LocalState {
    pub(crate) fn new(store: OptimisticStore, counter_capacity: usize) -> Self {
        let counter = CounterStream::new(store.counter_value(), counter_capacity);
        Self {
            inner: Mutex::new(Local { store, counter }),
        }
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&OptimisticStore) -> R) -> R {
        f(&self.lock().store)
    }

    /// Mutates, then publishes the recomputed counter inside the same section.
    pub(crate) fn update_and_publish<R>(&self, f: impl FnOnce(&mut OptimisticStore) -> R) -> R {
        let mut local = self.lock();
        let out = f(&mut local.store);
        let value = local.store.counter_value();
        local.counter.publish(value);
        out
    }

    /// Mutates, then publishes only if the count moved away from the last
    /// published value.
    pub(crate) fn update_and_sync<R>(&self, f: impl FnOnce(&mut OptimisticStore) -> R) -> R {
        let mut local = self.lock();
        let out = f(&mut local.store);
        let value = local.store.counter_value();
        if value != local.counter.latest() {
            local.counter.publish(value);
        }
        out
    }

    pub(crate) fn subscribe_counter(&self) -> CounterSubscription {
        self.lock().counter.subscribe()
    }

    pub(crate) fn latest_counter(&self) -> usize {
        self.lock().counter.latest()
    }

    fn lock(&self) -> MutexGuard<'_, Local> {
        // Every section is a total function over the sets, so a poisoned guard
        // still holds consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
