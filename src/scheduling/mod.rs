mod executor;
mod idle;
mod latch;
mod worker;

pub use executor::{DEFAULT_FATIGUE_RANGE, TiredExecutor};
pub use worker::{Task, TiredWorker, WorkerStats};
