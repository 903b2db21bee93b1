mod file;
mod resolver;
mod tasks;

pub use file::{evaluate_file, evaluate_to_file, parse_threads};
pub use resolver::LinearAlgebraEngine;
