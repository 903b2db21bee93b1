use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread::JoinHandle,
};

use log::{debug, warn};
use parking_lot::Mutex;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::{
    Task, TiredWorker, WorkerStats,
    idle::IdleHeap,
    latch::BatchLatch,
    worker::Completion,
};
use crate::error::{LaeErr, Result};

/// The range fatigue factors are sampled from by default.
pub const DEFAULT_FATIGUE_RANGE: (f64, f64) = (0.5, 1.5);

/// A fixed pool of `TiredWorker`s that always hands the next task to the least tired idle worker.
///
/// There is no shared task queue, every worker has a single slot. `submit` blocks
/// while every worker is busy.
pub struct TiredExecutor {
    workers: Vec<Arc<TiredWorker>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    idle: Arc<IdleHeap>,
    in_flight: Arc<AtomicUsize>,
}

impl TiredExecutor {
    /// Creates a new `TiredExecutor` with randomly sampled fatigue factors.
    ///
    /// # Arguments
    /// * `threads` - The amount of workers, must be positive.
    ///
    /// # Returns
    /// An `InvalidConfiguration` error if `threads` is zero.
    pub fn new(threads: usize) -> Result<Self> {
        Self::with_rng(threads, DEFAULT_FATIGUE_RANGE, &mut rand::rng())
    }

    /// Creates a new `TiredExecutor` sampling each fatigue factor uniformly from `range`.
    ///
    /// # Arguments
    /// * `threads` - The amount of workers, must be positive.
    /// * `range` - The inclusive lower and exclusive upper bound of the fatigue factors.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// An `InvalidConfiguration` error if `threads` is zero or the range is invalid.
    pub fn with_rng<R: Rng + ?Sized>(threads: usize, range: (f64, f64), rng: &mut R) -> Result<Self> {
        if threads == 0 {
            return Err(LaeErr::InvalidConfiguration(
                "the pool needs at least one worker".to_string(),
            ));
        }

        let (low, high) = range;
        if !(low > 0.) {
            return Err(LaeErr::InvalidConfiguration(format!(
                "fatigue factors must be positive, got a lower bound of {low}"
            )));
        }

        let distribution = Uniform::new(low, high)?;
        let factors = (0..threads).map(|_| distribution.sample(rng)).collect();
        Self::with_fatigue_factors(factors)
    }

    /// Creates a new `TiredExecutor` with one worker per given fatigue factor.
    ///
    /// # Arguments
    /// * `factors` - The fatigue factor of each worker, all positive and finite.
    ///
    /// # Returns
    /// An `InvalidConfiguration` error if `factors` is empty or holds an unusable value,
    /// an `Io` error if a thread couldn't be spawned.
    pub fn with_fatigue_factors(factors: Vec<f64>) -> Result<Self> {
        if factors.is_empty() {
            return Err(LaeErr::InvalidConfiguration(
                "the pool needs at least one worker".to_string(),
            ));
        }

        if let Some(bad) = factors.iter().find(|f| !(f.is_finite() && **f > 0.)) {
            return Err(LaeErr::InvalidConfiguration(format!(
                "fatigue factors must be positive and finite, got {bad}"
            )));
        }

        let mut executor = Self {
            workers: Vec::with_capacity(factors.len()),
            handles: Mutex::new(Vec::with_capacity(factors.len())),
            idle: Arc::new(IdleHeap::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
        };

        // On a spawn failure the executor is dropped, stopping the workers started so far.
        for (id, factor) in factors.into_iter().enumerate() {
            let (worker, handle) = TiredWorker::spawn(id, factor)?;
            executor.handles.get_mut().push(handle);
            executor.idle.push(Arc::clone(&worker));
            executor.workers.push(worker);
        }

        debug!(threads = executor.workers.len(); "executor started");
        Ok(executor)
    }

    /// Hands `task` to the least fatigued idle worker, blocking until one is idle.
    ///
    /// The task's failure, if any, is only logged.
    pub fn submit(&self, task: Task) -> Result<()> {
        self.dispatch(task, None)
    }

    /// Submits every task in order and blocks until all of them finished.
    ///
    /// Only the tasks of this call are waited on, and each of them has already
    /// returned its worker to the idle heap when this returns.
    ///
    /// # Returns
    /// A `TaskFailures` error if any task failed or panicked, or the submission error
    /// that stopped the batch early.
    pub fn submit_all<I>(&self, tasks: I) -> Result<()>
    where
        I: IntoIterator<Item = Task>,
    {
        let latch = Arc::new(BatchLatch::new());
        let mut submitted = Ok(());

        for task in tasks {
            if let Err(e) = self.dispatch(task, Some(&latch)) {
                submitted = Err(e);
                break;
            }
        }

        let outcome = latch.wait();
        submitted?;

        match outcome.failures.first() {
            None => Ok(()),
            Some(first) => Err(LaeErr::TaskFailures {
                failed: outcome.failures.len(),
                total: outcome.total,
                first: first.clone(),
            }),
        }
    }

    fn dispatch(&self, task: Task, latch: Option<&Arc<BatchLatch>>) -> Result<()> {
        let worker = self.idle.take().ok_or(LaeErr::ExecutorShutDown)?;

        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if let Some(latch) = latch {
            latch.register();
        }

        let done: Completion = {
            let idle = Arc::clone(&self.idle);
            let in_flight = Arc::clone(&self.in_flight);
            let worker = Arc::clone(&worker);
            let latch = latch.cloned();

            Box::new(move |outcome| {
                in_flight.fetch_sub(1, Ordering::AcqRel);
                idle.push(worker);

                if let Some(latch) = latch {
                    latch.count_down(outcome);
                }
            })
        };

        if let Err(e) = worker.new_task(task, done) {
            warn!(worker_id = worker.id(); "failed to assign task: {e}");
            self.in_flight.fetch_sub(1, Ordering::AcqRel);

            if let Some(latch) = latch {
                latch.count_down(Err(e.to_string()));
            }

            return Err(e);
        }

        Ok(())
    }

    /// Stops every worker and waits for their threads to exit.
    ///
    /// Workers stop between tasks, so this waits for running tasks to finish.
    /// Calling it more than once is a no-op.
    pub fn shutdown(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        if handles.is_empty() {
            return;
        }

        self.idle.close();
        self.workers.iter().for_each(|worker| worker.shutdown());

        for handle in handles {
            if handle.join().is_err() {
                warn!("a worker thread panicked while shutting down");
            }
        }

        debug!("executor shut down");
    }

    /// Returns a snapshot of every worker's counters.
    pub fn worker_report(&self) -> Vec<WorkerStats> {
        self.workers.iter().map(|worker| worker.stats()).collect()
    }

    /// Returns the amount of submitted tasks that haven't finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Returns the amount of workers currently waiting for a task.
    pub fn idle_workers(&self) -> usize {
        self.idle.len()
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for TiredExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Barrier, atomic::AtomicUsize},
        thread,
        time::Duration,
    };

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn sleeping_task(ms: u64) -> Task {
        Box::new(move || {
            thread::sleep(Duration::from_millis(ms));
            Ok(())
        })
    }

    #[test]
    fn zero_threads_is_rejected() {
        let err = TiredExecutor::new(0).err().unwrap();
        assert!(matches!(err, LaeErr::InvalidConfiguration(_)));

        let err = TiredExecutor::with_fatigue_factors(vec![]).err().unwrap();
        assert!(matches!(err, LaeErr::InvalidConfiguration(_)));
    }

    #[test]
    fn invalid_fatigue_ranges_are_rejected() {
        let mut rng = StdRng::seed_from_u64(42);

        for range in [(0., 1.), (-1., 1.), (1.5, 0.5), (f64::NAN, 1.)] {
            let err = TiredExecutor::with_rng(2, range, &mut rng).err().unwrap();
            assert!(matches!(err, LaeErr::InvalidConfiguration(_)), "{range:?}");
        }
    }

    #[test]
    fn sampled_factors_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let executor = TiredExecutor::with_rng(8, DEFAULT_FATIGUE_RANGE, &mut rng).unwrap();

        assert_eq!(executor.threads(), 8);
        for stats in executor.worker_report() {
            assert!((0.5..1.5).contains(&stats.fatigue_factor));
        }
    }

    #[test]
    fn submit_all_is_a_barrier() {
        const TASKS: usize = 64;

        let executor = TiredExecutor::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut rng = StdRng::seed_from_u64(7);

        let tasks: Vec<Task> = (0..TASKS)
            .map(|_| {
                let counter = Arc::clone(&counter);
                let ms = rng.random_range(0..4);
                Box::new(move || {
                    thread::sleep(Duration::from_millis(ms));
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }) as Task
            })
            .collect();

        executor.submit_all(tasks).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), TASKS);
        assert_eq!(executor.in_flight(), 0);
        assert_eq!(executor.idle_workers(), 4);
    }

    #[test]
    fn tasks_run_concurrently() {
        const THREADS: usize = 4;

        let executor = TiredExecutor::new(THREADS).unwrap();
        let barrier = Arc::new(Barrier::new(THREADS));

        // Every task waits for the others, so the batch only drains if all of them overlap.
        let tasks = (0..THREADS).map(|_| {
            let barrier = Arc::clone(&barrier);
            Box::new(move || {
                barrier.wait();
                Ok(())
            }) as Task
        });

        executor.submit_all(tasks).unwrap();

        let report = executor.worker_report();
        assert!(report.iter().all(|stats| stats.tasks == 1), "{report:?}");
    }

    #[test]
    fn failures_are_reported_after_the_whole_batch() {
        let executor = TiredExecutor::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let tasks = (0..10).map(|i| {
            let counter = Arc::clone(&counter);
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                match i {
                    3 => Err(LaeErr::MalformedTree("row 3".into())),
                    7 => panic!("row 7"),
                    _ => Ok(()),
                }
            }) as Task
        });

        let err = executor.submit_all(tasks).unwrap_err();
        let LaeErr::TaskFailures { failed, total, .. } = err else {
            panic!("expected TaskFailures, got {err:?}");
        };

        assert_eq!((failed, total), (2, 10));
        assert_eq!(counter.load(Ordering::SeqCst), 10);

        // Both workers survived.
        executor.submit_all((0..4).map(|_| sleeping_task(1))).unwrap();
        assert_eq!(executor.idle_workers(), 2);
    }

    #[test]
    fn least_fatigued_worker_gets_more_work() {
        let executor = TiredExecutor::with_fatigue_factors(vec![0.5, 1.0, 2.0]).unwrap();

        for _ in 0..150 {
            executor.submit_all([sleeping_task(1)]).unwrap();
        }

        let tasks: Vec<_> = executor.worker_report().iter().map(|s| s.tasks).collect();
        assert_eq!(tasks.iter().sum::<u64>(), 150);
        assert!(tasks[0] > tasks[1], "{tasks:?}");
        assert!(tasks[1] > tasks[2], "{tasks:?}");
    }

    #[test]
    fn fatigue_key_is_taken_at_insertion() {
        let executor = TiredExecutor::with_fatigue_factors(vec![1.0, 1.0]).unwrap();

        // Worker 0 takes the first task, worker 1 stays untouched at fatigue zero.
        executor.submit_all([sleeping_task(5)]).unwrap();
        let report = executor.worker_report();
        assert_eq!(report[0].tasks, 1);
        assert!(report[0].fatigue > report[1].fatigue);

        executor.submit_all([sleeping_task(1)]).unwrap();
        assert_eq!(executor.worker_report()[1].tasks, 1);
    }

    #[test]
    fn single_submit_runs_in_background() {
        let executor = TiredExecutor::new(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        executor
            .submit(Box::new({
                let counter = Arc::clone(&counter);
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .unwrap();

        // The only worker becomes available again once the first task is done.
        executor.submit_all([sleeping_task(0)]).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn submit_after_shutdown_fails() {
        let executor = TiredExecutor::new(2).unwrap();
        executor.shutdown();
        executor.shutdown();

        let err = executor.submit(sleeping_task(0)).unwrap_err();
        assert!(matches!(err, LaeErr::ExecutorShutDown));
        assert!(executor.worker_report().iter().all(|s| s.tasks == 0));
    }

    #[test]
    fn report_tracks_busy_and_idle_time() {
        let executor = TiredExecutor::new(1).unwrap();
        thread::sleep(Duration::from_millis(5));

        executor.submit_all([sleeping_task(5)]).unwrap();

        let stats = &executor.worker_report()[0];
        assert_eq!(stats.tasks, 1);
        assert!(stats.time_used >= Duration::from_millis(5));
        assert!(stats.time_idle >= Duration::from_millis(5));
        assert!(stats.to_string().starts_with("worker 0"));
    }
}
