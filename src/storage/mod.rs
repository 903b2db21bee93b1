mod matrix;
mod orientation;
mod vector;

pub use matrix::{MatrixReadGuard, SharedMatrix};
pub use orientation::Orientation;
pub use vector::{SharedVector, VectorData};
