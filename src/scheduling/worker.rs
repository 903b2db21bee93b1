use std::{
    any::Any,
    fmt::{self, Display},
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc::{self, Receiver, SyncSender, TrySendError},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::error::{LaeErr, Result};

/// A unit of work run by a single worker.
pub type Task = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

/// Called by the worker once a task finished, with the failure message if it failed.
pub(super) type Completion = Box<dyn FnOnce(std::result::Result<(), String>) + Send + 'static>;

/// What travels through a worker's single slot.
pub(super) enum Handoff {
    Run(Assignment),
    Stop,
}

/// A task paired with its completion.
///
/// Dropping an assignment that was never run completes it with an
/// `ExecutorShutDown` failure, so its batch never waits on it forever.
pub(super) struct Assignment {
    task: Option<Task>,
    done: Option<Completion>,
}

impl Assignment {
    fn new(task: Task, done: Completion) -> Self {
        Self {
            task: Some(task),
            done: Some(done),
        }
    }

    /// Takes the task and its completion out, leaving nothing for `drop` to complete.
    fn take(&mut self) -> Option<(Task, Completion)> {
        self.task.take().zip(self.done.take())
    }
}

impl Drop for Assignment {
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            done(Err(LaeErr::ExecutorShutDown.to_string()));
        }
    }
}

/// A long lived worker thread whose fatigue grows with the work it does.
///
/// Fatigue is `fatigue_factor * time_used`, where `time_used` is the cumulative
/// time spent running tasks in nanoseconds.
pub struct TiredWorker {
    id: usize,
    fatigue_factor: f64,
    alive: AtomicBool,
    busy: AtomicBool,
    time_used: AtomicU64,
    time_idle: AtomicU64,
    tasks: AtomicU64,
    idle_since: Mutex<Instant>,
    handoff: SyncSender<Handoff>,
}

impl TiredWorker {
    /// Creates a new `TiredWorker` and starts its thread.
    ///
    /// # Arguments
    /// * `id` - The worker's index inside its executor.
    /// * `fatigue_factor` - The multiplier applied to the busy time.
    ///
    /// # Returns
    /// The shared worker and the handle of its thread, or an io error if the
    /// thread couldn't be spawned.
    pub(super) fn spawn(id: usize, fatigue_factor: f64) -> io::Result<(Arc<Self>, JoinHandle<()>)> {
        let (tx, rx) = mpsc::sync_channel(1);

        let worker = Arc::new(Self {
            id,
            fatigue_factor,
            alive: AtomicBool::new(true),
            busy: AtomicBool::new(false),
            time_used: AtomicU64::new(0),
            time_idle: AtomicU64::new(0),
            tasks: AtomicU64::new(0),
            idle_since: Mutex::new(Instant::now()),
            handoff: tx,
        });

        let handle = thread::Builder::new()
            .name(format!("FF={fatigue_factor:.2}"))
            .spawn({
                let worker = Arc::clone(&worker);
                move || worker.run(rx)
            })?;

        Ok((worker, handle))
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn fatigue_factor(&self) -> f64 {
        self.fatigue_factor
    }

    /// Returns the current fatigue score.
    pub fn fatigue(&self) -> f64 {
        self.fatigue_factor * self.time_used.load(Ordering::Acquire) as f64
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Returns a snapshot of this worker's counters.
    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            id: self.id,
            fatigue_factor: self.fatigue_factor,
            time_used: Duration::from_nanos(self.time_used.load(Ordering::Acquire)),
            time_idle: Duration::from_nanos(self.time_idle.load(Ordering::Acquire)),
            fatigue: self.fatigue(),
            tasks: self.tasks.load(Ordering::Acquire),
        }
    }

    /// Places a task in the worker's slot without blocking.
    ///
    /// # Returns
    /// A `HandoffOccupied` error if the slot is taken, or `ExecutorShutDown` if the
    /// worker thread already exited. The task is dropped in both cases, without
    /// calling `done`.
    pub(super) fn new_task(&self, task: Task, done: Completion) -> Result<()> {
        let (handoff, err) = match self.handoff.try_send(Handoff::Run(Assignment::new(task, done))) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(handoff)) => (handoff, LaeErr::HandoffOccupied { worker: self.id }),
            Err(TrySendError::Disconnected(handoff)) => (handoff, LaeErr::ExecutorShutDown),
        };

        // The caller reports the failure itself.
        if let Handoff::Run(mut assignment) = handoff {
            drop(assignment.take());
        }

        Err(err)
    }

    /// Asks the worker to stop once its current task, if any, finishes.
    ///
    /// Blocks while the slot is taken.
    pub(super) fn shutdown(&self) {
        self.alive.store(false, Ordering::Release);

        // The thread may already be gone.
        let _ = self.handoff.send(Handoff::Stop);
    }

    fn run(&self, rx: Receiver<Handoff>) {
        debug!(worker_id = self.id; "worker started, fatigue factor {:.2}", self.fatigue_factor);

        while self.is_alive() {
            let Ok(handoff) = rx.recv() else {
                break;
            };

            let Handoff::Run(mut assignment) = handoff else {
                self.alive.store(false, Ordering::Release);
                break;
            };

            let Some((task, done)) = assignment.take() else {
                continue;
            };

            let started = Instant::now();
            let idle = started.saturating_duration_since(*self.idle_since.lock());
            self.time_idle.fetch_add(nanos(idle), Ordering::AcqRel);
            self.busy.store(true, Ordering::Release);

            let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(payload) => Err(panic_message(payload.as_ref())),
            };

            if let Err(msg) = &outcome {
                warn!(worker_id = self.id; "task failed: {msg}");
            }

            self.time_used.fetch_add(nanos(started.elapsed()), Ordering::AcqRel);
            self.tasks.fetch_add(1, Ordering::AcqRel);
            self.busy.store(false, Ordering::Release);
            *self.idle_since.lock() = Instant::now();

            done(outcome);
        }

        // Assignments still in the slot, or sent before `rx` goes away, fail on drop.
        drop(rx);

        debug!(worker_id = self.id; "worker stopped");
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("task panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("task panicked: {msg}")
    } else {
        "task panicked".to_string()
    }
}

/// A read only snapshot of a worker's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStats {
    pub id: usize,
    pub fatigue_factor: f64,
    pub time_used: Duration,
    pub time_idle: Duration,
    pub fatigue: f64,
    pub tasks: u64,
}

impl Display for WorkerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "worker {} (FF={:.2}): tasks={} used={:?} idle={:?} fatigue={:.0}",
            self.id, self.fatigue_factor, self.tasks, self.time_used, self.time_idle, self.fatigue
        )
    }
}
