use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct LatchState {
    total: usize,
    pending: usize,
    failures: Vec<String>,
}

/// Counts the outstanding tasks of one batch and wakes its submitter once they all finished.
#[derive(Default)]
pub(super) struct BatchLatch {
    state: Mutex<LatchState>,
    finished: Condvar,
}

/// What `BatchLatch::wait` observed once the batch drained.
#[derive(Debug)]
pub(super) struct BatchOutcome {
    pub total: usize,
    pub failures: Vec<String>,
}

impl BatchLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more task as part of the batch.
    pub fn register(&self) {
        let mut state = self.state.lock();
        state.total += 1;
        state.pending += 1;
    }

    /// Marks one registered task as finished.
    pub fn count_down(&self, outcome: Result<(), String>) {
        let mut state = self.state.lock();
        state.pending = state.pending.saturating_sub(1);

        if let Err(msg) = outcome {
            state.failures.push(msg);
        }

        if state.pending == 0 {
            self.finished.notify_all();
        }
    }

    /// Blocks until every registered task has counted down.
    pub fn wait(&self) -> BatchOutcome {
        let mut state = self.state.lock();

        while state.pending > 0 {
            self.finished.wait(&mut state);
        }

        BatchOutcome {
            total: state.total,
            failures: std::mem::take(&mut state.failures),
        }
    }
}
