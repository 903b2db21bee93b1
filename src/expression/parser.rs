//! Reads expression trees from JSON documents.
//!
//! A leaf is a 2-D array of numbers, an operation is an object:
//!
//! ```json
//! {"operator": "+", "operands": [[[1, 2], [3, 4]], {"operator": "T", "operands": [[[5, 6], [7, 8]]]}]}
//! ```

use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;

use super::{ComputationNode, Operator};
use crate::error::{LaeErr, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNode {
    Matrix(Vec<Vec<f64>>),
    Operation {
        operator: String,
        operands: Vec<RawNode>,
    },
}

impl TryFrom<RawNode> for ComputationNode {
    type Error = LaeErr;

    fn try_from(raw: RawNode) -> Result<Self> {
        match raw {
            RawNode::Matrix(data) => {
                let cols = data.first().map_or(0, Vec::len);
                if let Some(row) = data.iter().position(|row| row.len() != cols) {
                    return Err(LaeErr::InvalidInput(format!(
                        "row {row} has {} columns, expected {cols}",
                        data[row].len()
                    )));
                }

                Ok(ComputationNode::matrix(data))
            }
            RawNode::Operation { operator, operands } => {
                let operator: Operator = operator.parse()?;
                let children = operands
                    .into_iter()
                    .map(ComputationNode::try_from)
                    .collect::<Result<Vec<_>>>()?;

                Ok(ComputationNode::operation(operator, children))
            }
        }
    }
}

/// Parses an expression tree from a JSON string.
///
/// # Returns
/// A `Json` error for malformed documents, an `InvalidInput` error for unknown
/// operators, wrong operand counts or ragged matrices.
pub fn parse_str(input: &str) -> Result<ComputationNode> {
    let raw: RawNode = serde_json::from_str(input)?;
    let node = ComputationNode::try_from(raw)?;
    node.validate()?;
    Ok(node)
}

/// Parses an expression tree from the JSON file at `path`.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ComputationNode> {
    let reader = BufReader::new(File::open(path)?);
    let raw: RawNode = serde_json::from_reader(reader)?;
    let node = ComputationNode::try_from(raw)?;
    node.validate()?;
    Ok(node)
}
