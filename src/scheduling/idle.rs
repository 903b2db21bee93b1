use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

use parking_lot::{Condvar, Mutex};

use super::TiredWorker;

/// A worker waiting in the idle heap, keyed by its fatigue when it was inserted.
///
/// The key isn't refreshed while the worker waits, the ordering reflects each
/// worker's history up to its last task.
struct IdleEntry {
    fatigue: f64,
    worker: Arc<TiredWorker>,
}

impl PartialEq for IdleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IdleEntry {}

impl PartialOrd for IdleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdleEntry {
    // Reversed so the max-heap pops the least fatigued worker, lowest id first on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fatigue
            .total_cmp(&self.fatigue)
            .then_with(|| other.worker.id().cmp(&self.worker.id()))
    }
}

struct IdleState {
    heap: BinaryHeap<IdleEntry>,
    closed: bool,
}

/// Blocking min-heap of idle workers ordered by fatigue.
pub(super) struct IdleHeap {
    state: Mutex<IdleState>,
    available: Condvar,
}

impl IdleHeap {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(IdleState {
                heap: BinaryHeap::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Inserts `worker` under its current fatigue and wakes one waiting caller.
    pub fn push(&self, worker: Arc<TiredWorker>) {
        let fatigue = worker.fatigue();
        self.state.lock().heap.push(IdleEntry { fatigue, worker });
        self.available.notify_one();
    }

    /// Removes the least fatigued worker, blocking until one is available.
    ///
    /// # Returns
    /// `None` once the heap was closed.
    pub fn take(&self) -> Option<Arc<TiredWorker>> {
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return None;
            }

            if let Some(entry) = state.heap.pop() {
                return Some(entry.worker);
            }

            self.available.wait(&mut state);
        }
    }

    /// Makes every current and future `take` return `None`.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }
}
