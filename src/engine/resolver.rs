use log::debug;
use rand::{SeedableRng, rngs::StdRng};

use super::tasks;
use crate::{
    config::{EngineConfig, NestingConfig},
    error::{LaeErr, Result},
    expression::{BalancedNesting, ComputationNode, LeftNesting, Nesting, Operator},
    scheduling::{TiredExecutor, WorkerStats},
    storage::SharedMatrix,
};

/// Resolves expression trees one operation at a time, splitting each operation into
/// row tasks that run on a `TiredExecutor`.
///
/// The working matrices of an operation live only for that operation, so an engine
/// can be shared between threads evaluating different trees.
pub struct LinearAlgebraEngine {
    executor: TiredExecutor,
    nesting: Box<dyn Nesting + Send + Sync>,
}

impl LinearAlgebraEngine {
    /// Creates a new `LinearAlgebraEngine` with the default configuration.
    ///
    /// # Arguments
    /// * `threads` - The amount of workers in the pool.
    ///
    /// # Returns
    /// An `InvalidConfiguration` error if `threads` is zero.
    pub fn new(threads: usize) -> Result<Self> {
        Self::from_config(&EngineConfig::new(threads))
    }

    /// Creates a new `LinearAlgebraEngine` from a full configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let (threads, range) = (config.threads(), config.fatigue_range());

        let executor = match config.seed() {
            Some(seed) => TiredExecutor::with_rng(threads, range, &mut StdRng::seed_from_u64(seed))?,
            None => TiredExecutor::with_rng(threads, range, &mut rand::rng())?,
        };

        let nesting: Box<dyn Nesting + Send + Sync> = match config.nesting() {
            NestingConfig::LeftLeaning => Box::new(LeftNesting),
            NestingConfig::Balanced => Box::new(BalancedNesting),
        };

        Ok(Self::with_executor(executor, nesting))
    }

    /// Creates a new `LinearAlgebraEngine` around an existing executor.
    ///
    /// # Arguments
    /// * `executor` - The pool the row tasks run on.
    /// * `nesting` - How n-ary associative operations are split.
    pub fn with_executor(executor: TiredExecutor, nesting: Box<dyn Nesting + Send + Sync>) -> Self {
        Self { executor, nesting }
    }

    /// Resolves `root` until it's a single matrix.
    ///
    /// # Returns
    /// The resolved root, a `MalformedTree` error if it can't be reduced to one
    /// matrix, or the first error raised by an operation. No partial result is
    /// kept on error.
    pub fn run(&self, mut root: ComputationNode) -> Result<ComputationNode> {
        if root.is_matrix() {
            return Ok(root);
        }

        while let Some(node) = root.find_resolvable() {
            if node.needs_nesting() {
                node.associative_nesting(self.nesting.as_ref())?;
                continue;
            }

            self.load_and_compute(node)?;
        }

        if !root.is_matrix() {
            return Err(LaeErr::MalformedTree(
                "no resolvable operation left but the tree isn't a single matrix".to_string(),
            ));
        }

        Ok(root)
    }

    /// Evaluates a resolvable binary or unary operation and replaces it with its result.
    ///
    /// # Arguments
    /// * `node` - An operation whose children are all matrices.
    pub fn load_and_compute(&self, node: &mut ComputationNode) -> Result<()> {
        let ComputationNode::Operation { operator, children } = node else {
            return Err(LaeErr::MalformedTree("expected an operation, got a matrix".to_string()));
        };

        let operator = *operator;
        debug!("computing {operator} over {} operands", children.len());

        let result = match (operator, children.as_slice()) {
            (Operator::Add, [a, b]) => self.add(operand(a)?, operand(b)?)?,
            (Operator::Multiply, [a, b]) => self.multiply(operand(a)?, operand(b)?)?,
            (Operator::Negate, [a]) => self.negate(operand(a)?)?,
            (Operator::Transpose, [a]) => self.transpose(operand(a)?)?,
            (operator, children) => {
                return Err(LaeErr::MalformedTree(format!(
                    "{operator} can't be computed with {} operands",
                    children.len()
                )));
            }
        };

        node.resolve(result);
        Ok(())
    }

    fn add(&self, a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let (a_rows, a_cols) = shape(a);
        let (b_rows, b_cols) = shape(b);

        if a_rows != b_rows {
            return Err(LaeErr::DimensionMismatch {
                op: "add",
                got: b_rows,
                expected: a_rows,
            });
        }

        if a_cols != b_cols {
            return Err(LaeErr::DimensionMismatch {
                op: "add",
                got: b_cols,
                expected: a_cols,
            });
        }

        let left = SharedMatrix::from_row_major(a)?;
        let right = SharedMatrix::from_row_major(b)?;

        self.executor.submit_all(tasks::add_rows(&left, &right))?;
        Ok(left.read_row_major())
    }

    fn multiply(&self, a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let (_, a_cols) = shape(a);
        let (b_rows, _) = shape(b);

        if a_cols != b_rows {
            return Err(LaeErr::DimensionMismatch {
                op: "multiply",
                got: b_rows,
                expected: a_cols,
            });
        }

        let left = SharedMatrix::from_row_major(a)?;
        let mut right = SharedMatrix::new();
        right.load_column_major(b)?;

        self.executor.submit_all(tasks::multiply_rows(&left, &right))?;
        Ok(left.read_row_major())
    }

    fn negate(&self, a: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let left = SharedMatrix::from_row_major(a)?;

        self.executor.submit_all(tasks::negate_rows(&left))?;
        Ok(left.read_row_major())
    }

    fn transpose(&self, a: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let mut left = SharedMatrix::from_row_major(a)?;

        self.executor.submit_all(tasks::transpose_rows(&left))?;

        // The vectors were flipped one by one, the matrix still has to follow.
        left.set_orientation(left.orientation().flipped());
        Ok(left.read_row_major())
    }

    /// Returns a snapshot of every worker's counters.
    pub fn worker_report(&self) -> Vec<WorkerStats> {
        self.executor.worker_report()
    }

    pub fn executor(&self) -> &TiredExecutor {
        &self.executor
    }

    /// Stops the worker pool, waiting for running tasks to finish.
    pub fn shutdown(&self) {
        self.executor.shutdown();
    }
}

fn operand(node: &ComputationNode) -> Result<&[Vec<f64>]> {
    node.as_matrix()
        .ok_or_else(|| LaeErr::MalformedTree("operand is not a resolved matrix".to_string()))
}

fn shape(matrix: &[Vec<f64>]) -> (usize, usize) {
    (matrix.len(), matrix.first().map_or(0, Vec::len))
}
