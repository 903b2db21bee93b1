use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use rand_distr::uniform::Error as UniformError;

/// The result type used across the whole engine.
pub type Result<T> = std::result::Result<T, LaeErr>;

/// The engine's error type.
#[derive(Debug)]
pub enum LaeErr {
    /// Two operands disagree on a length (vector length, row count or column count).
    DimensionMismatch {
        op: &'static str,
        got: usize,
        expected: usize,
    },
    /// An operand's orientation violates the operator's precondition.
    OrientationMismatch {
        op: &'static str,
        detail: &'static str,
    },
    /// The engine or its worker pool was configured with unusable values.
    InvalidConfiguration(String),
    /// The expression tree can't be resolved any further but isn't a single matrix.
    MalformedTree(String),
    /// The input document doesn't describe a valid expression.
    InvalidInput(String),
    /// Some tasks of a row batch failed, the batch result was discarded.
    TaskFailures {
        failed: usize,
        total: usize,
        first: String,
    },
    /// A task was handed to a worker whose single slot is still taken.
    HandoffOccupied { worker: usize },
    /// The worker pool was already shut down.
    ExecutorShutDown,
    Io(io::Error),
    Json(serde_json::Error),
}

impl Display for LaeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaeErr::DimensionMismatch { op, got, expected } => write!(
                f,
                "Illegal operation: dimensions mismatch in {op}, got {got} and expected {expected}"
            ),
            LaeErr::OrientationMismatch { op, detail } => {
                write!(f, "Illegal operation: {op}: {detail}")
            }
            LaeErr::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            LaeErr::MalformedTree(msg) => write!(f, "malformed expression tree: {msg}"),
            LaeErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            LaeErr::TaskFailures {
                failed,
                total,
                first,
            } => write!(f, "{failed} of {total} row tasks failed, first failure: {first}"),
            LaeErr::HandoffOccupied { worker } => {
                write!(f, "worker {worker} was assigned a task while still holding one")
            }
            LaeErr::ExecutorShutDown => f.write_str("the worker pool has been shut down"),
            LaeErr::Io(e) => write!(f, "io error: {e}"),
            LaeErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for LaeErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LaeErr::Io(e) => Some(e),
            LaeErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LaeErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for LaeErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<UniformError> for LaeErr {
    fn from(value: UniformError) -> Self {
        Self::InvalidConfiguration(value.to_string())
    }
}
