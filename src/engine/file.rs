//! File to file evaluation, as driven by the `lae` binary.

use std::path::Path;

use log::{info, warn};

use super::LinearAlgebraEngine;
use crate::{
    config::EngineConfig,
    error::{LaeErr, Result},
    expression::{parser, writer},
};

/// Parses a worker count given as text.
///
/// # Returns
/// An `InvalidConfiguration` error if `threads` isn't an integer or isn't positive.
pub fn parse_threads(threads: &str) -> Result<usize> {
    let parsed: i64 = threads.trim().parse().map_err(|e| {
        LaeErr::InvalidConfiguration(format!("invalid number of threads {threads:?}: {e}"))
    })?;

    match usize::try_from(parsed) {
        Ok(threads) if threads > 0 => Ok(threads),
        _ => Err(LaeErr::InvalidConfiguration(format!(
            "the number of threads must be positive, got {parsed}"
        ))),
    }
}

/// Evaluates the expression tree stored at `input` on a fresh engine.
///
/// The engine is configured from the environment, see `EngineConfig::from_env`.
///
/// # Arguments
/// * `threads` - The worker count, as given on the command line.
/// * `input` - The path of a JSON expression tree.
///
/// # Returns
/// The resolved matrix in row major form, or the first error met on the way.
pub fn evaluate_file<P: AsRef<Path>>(threads: &str, input: P) -> Result<Vec<Vec<f64>>> {
    let threads = parse_threads(threads)?;
    let input = input.as_ref();

    let root = parser::parse_file(input)?;
    let config = EngineConfig::from_env(threads)?;
    let engine = LinearAlgebraEngine::from_config(&config)?;
    info!("evaluating {} with {threads} workers", input.display());

    let result = engine.run(root)?;

    for stats in engine.worker_report() {
        info!("{stats}");
    }

    result
        .into_matrix()
        .ok_or_else(|| LaeErr::MalformedTree("the resolved root isn't a matrix".to_string()))
}

/// Evaluates `input` and writes either the result or the error message to `output`.
///
/// # Returns
/// Only the errors raised while writing `output`, evaluation errors end up in the file.
pub fn evaluate_to_file<P, Q>(threads: &str, input: P, output: Q) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    match evaluate_file(threads, input) {
        Ok(matrix) => writer::write_result(output, &matrix),
        Err(e) => {
            warn!("evaluation failed: {e}");
            writer::write_error(output, &e.to_string())
        }
    }
}
