mod nesting;
mod node;
pub mod parser;
pub mod writer;

pub use nesting::{BalancedNesting, LeftNesting, Nesting};
pub use node::{ComputationNode, Operator};
