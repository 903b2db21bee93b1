pub mod config;
pub mod engine;
pub mod error;
pub mod expression;
pub mod scheduling;
pub mod storage;
mod test;

pub use config::{EngineConfig, NestingConfig};
pub use engine::LinearAlgebraEngine;
pub use error::{LaeErr, Result};
pub use expression::{ComputationNode, Operator};
