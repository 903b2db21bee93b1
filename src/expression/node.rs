use std::{
    fmt::{self, Display},
    mem,
    str::FromStr,
};

use super::Nesting;
use crate::error::{LaeErr, Result};

/// The operators an expression tree can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Multiply,
    Negate,
    Transpose,
}

impl Operator {
    /// Whether the operator takes any amount of operands, two or more.
    pub fn is_associative(self) -> bool {
        matches!(self, Operator::Add | Operator::Multiply)
    }

    /// Returns whether `operands` is an acceptable operand count for this operator.
    pub fn accepts(self, operands: usize) -> bool {
        if self.is_associative() {
            operands >= 2
        } else {
            operands == 1
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Add => "add",
            Operator::Multiply => "multiply",
            Operator::Negate => "negate",
            Operator::Transpose => "transpose",
        };

        f.write_str(s)
    }
}

impl FromStr for Operator {
    type Err = LaeErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" | "add" => Ok(Operator::Add),
            "*" | "multiply" => Ok(Operator::Multiply),
            "-" | "negate" => Ok(Operator::Negate),
            "T" | "transpose" => Ok(Operator::Transpose),
            other => Err(LaeErr::InvalidInput(format!("unknown operator {other:?}"))),
        }
    }
}

/// A node of an expression tree, either a resolved matrix or a pending operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputationNode {
    Matrix(Vec<Vec<f64>>),
    Operation {
        operator: Operator,
        children: Vec<ComputationNode>,
    },
}

impl ComputationNode {
    pub fn matrix(data: Vec<Vec<f64>>) -> Self {
        Self::Matrix(data)
    }

    pub fn operation(operator: Operator, children: Vec<ComputationNode>) -> Self {
        Self::Operation { operator, children }
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::Matrix(_))
    }

    /// Returns the matrix of a leaf node.
    pub fn as_matrix(&self) -> Option<&[Vec<f64>]> {
        match self {
            Self::Matrix(data) => Some(data),
            Self::Operation { .. } => None,
        }
    }

    pub fn into_matrix(self) -> Option<Vec<Vec<f64>>> {
        match self {
            Self::Matrix(data) => Some(data),
            Self::Operation { .. } => None,
        }
    }

    pub fn operator(&self) -> Option<Operator> {
        match self {
            Self::Matrix(_) => None,
            Self::Operation { operator, .. } => Some(*operator),
        }
    }

    pub fn children(&self) -> &[ComputationNode] {
        match self {
            Self::Matrix(_) => &[],
            Self::Operation { children, .. } => children,
        }
    }

    /// Whether this is an operation whose children are all matrices.
    pub fn is_resolvable(&self) -> bool {
        match self {
            Self::Matrix(_) => false,
            Self::Operation { children, .. } => children.iter().all(Self::is_matrix),
        }
    }

    /// Whether this is an associative operation that must be nested before evaluation.
    pub fn needs_nesting(&self) -> bool {
        match self {
            Self::Operation { operator, children } => {
                operator.is_associative() && children.len() > 2
            }
            Self::Matrix(_) => false,
        }
    }

    /// Finds the first operation, depth first, whose children are all matrices.
    ///
    /// # Returns
    /// `None` if the tree has no such node, which includes a tree that's already a
    /// single matrix.
    pub fn find_resolvable(&mut self) -> Option<&mut ComputationNode> {
        if self.is_resolvable() {
            return Some(self);
        }

        match self {
            Self::Matrix(_) => None,
            Self::Operation { children, .. } => {
                children.iter_mut().find_map(ComputationNode::find_resolvable)
            }
        }
    }

    /// Replaces this node in place with a matrix leaf, dropping its children.
    pub fn resolve(&mut self, data: Vec<Vec<f64>>) {
        *self = Self::Matrix(data);
    }

    /// Restructures an n-ary associative operation into nested binary operations.
    ///
    /// # Arguments
    /// * `nesting` - The strategy deciding the shape of the nesting.
    ///
    /// # Returns
    /// A `MalformedTree` error if this isn't an associative operation.
    pub fn associative_nesting(&mut self, nesting: &dyn Nesting) -> Result<()> {
        let Self::Operation { operator, children } = self else {
            return Err(LaeErr::MalformedTree(
                "a matrix can't be nested".to_string(),
            ));
        };

        if !operator.is_associative() {
            return Err(LaeErr::MalformedTree(format!(
                "{operator} is not associative but has {} operands",
                children.len()
            )));
        }

        let operator = *operator;
        let children = mem::take(children);
        *self = nesting.nest(operator, children);
        Ok(())
    }

    /// Checks the operand count of every operation in the tree.
    pub fn validate(&self) -> Result<()> {
        if let Self::Operation { operator, children } = self {
            if !operator.accepts(children.len()) {
                return Err(LaeErr::InvalidInput(format!(
                    "{operator} can't take {} operands",
                    children.len()
                )));
            }

            children.iter().try_for_each(Self::validate)?;
        }

        Ok(())
    }
}
