use super::{ComputationNode, Operator};

/// A `Nesting` turns the operands of an n-ary associative operation into nested binary operations.
pub trait Nesting {
    /// Should combine `operands` under `operator` into a tree where every operation
    /// has exactly two children, keeping the operands' order.
    ///
    /// # Arguments
    /// * `operator` - An associative operator.
    /// * `operands` - At least two operands, in evaluation order.
    fn nest(&self, operator: Operator, operands: Vec<ComputationNode>) -> ComputationNode;
}

/// Nests to the left: `((a ∘ b) ∘ c) ∘ d`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeftNesting;

impl Nesting for LeftNesting {
    fn nest(&self, operator: Operator, operands: Vec<ComputationNode>) -> ComputationNode {
        let mut operands = operands.into_iter();

        let Some(first) = operands.next() else {
            return ComputationNode::operation(operator, Vec::new());
        };

        operands.fold(first, |acc, next| {
            ComputationNode::operation(operator, vec![acc, next])
        })
    }
}

/// Nests by halves: `(a ∘ b) ∘ (c ∘ d)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedNesting;

impl Nesting for BalancedNesting {
    fn nest(&self, operator: Operator, mut operands: Vec<ComputationNode>) -> ComputationNode {
        if operands.len() < 2 {
            return match operands.pop() {
                Some(single) => single,
                None => ComputationNode::operation(operator, operands),
            };
        }

        let right = operands.split_off(operands.len() / 2);
        ComputationNode::operation(
            operator,
            vec![self.nest(operator, operands), self.nest(operator, right)],
        )
    }
}
