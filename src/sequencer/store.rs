// Store - Latest committed sequencer state
// Readers clone an immutable snapshot; writers swap in the next one

use super::reducer::{Action, transition};
use super::state::PolyrhythmState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to the committed state
///
/// Cloning the store shares the same state. Transitions are computed outside
/// the lock on a snapshot; the write lock only covers the pointer swap. A
/// dispatch whose snapshot went stale in the meantime is recomputed on the
/// newer state, so concurrent dispatches never lose an edit and a reader only
/// ever sees a state produced by a complete transition.
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    state: RwLock<Arc<PolyrhythmState>>,
    revision: AtomicU64,
}

impl Store {
    pub fn new(state: PolyrhythmState) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(Arc::new(state)),
                revision: AtomicU64::new(0),
            }),
        }
    }

    /// Latest committed state
    pub fn snapshot(&self) -> Arc<PolyrhythmState> {
        let guard = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Applies an action and returns the committed result
    pub fn dispatch(&self, action: Action) -> Arc<PolyrhythmState> {
        self.update(|state| transition(state, action.clone()))
    }

    /// Commits `next_state(current)`, recomputing until no other commit
    /// lands in between. Returns the snapshot unchanged for a no-op
    pub(crate) fn update<F>(&self, mut next_state: F) -> Arc<PolyrhythmState>
    where
        F: FnMut(&PolyrhythmState) -> PolyrhythmState,
    {
        loop {
            let current = self.snapshot();
            let next = next_state(&current);
            if next.same_as(&current) {
                return current;
            }
            let next = Arc::new(next);

            let mut guard = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            // `current` is still alive, so its allocation cannot have been reused
            if !Arc::ptr_eq(&guard, &current) {
                continue;
            }
            *guard = Arc::clone(&next);
            self.inner.revision.fetch_add(1, Ordering::Release);
            return next;
        }
    }

    /// Replaces the whole state without going through the reducer
    pub fn replace(&self, state: PolyrhythmState) -> Arc<PolyrhythmState> {
        let mut guard = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(state);
        self.inner.revision.fetch_add(1, Ordering::Release);
        Arc::clone(&guard)
    }

    /// Number of committed changes so far
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(PolyrhythmState::default())
    }
}
