use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{MatrixReadGuard, Orientation};
use crate::error::{LaeErr, Result};

/// A vector of doubles guarded by its own reader/writer lock.
///
/// The elements are only reachable through the guards returned by `read` and `write`,
/// so every access is made while holding the right lock.
#[derive(Debug)]
pub struct SharedVector {
    data: RwLock<VectorData>,
}

impl SharedVector {
    /// Creates a new `SharedVector`.
    ///
    /// # Arguments
    /// * `values` - The elements of the vector.
    /// * `orientation` - Whether the vector is a row or a column of its matrix.
    pub fn new(values: Vec<f64>, orientation: Orientation) -> Self {
        Self {
            data: RwLock::new(VectorData {
                values: values.into_boxed_slice(),
                orientation,
            }),
        }
    }

    /// Acquires the reader lock, blocking until no writer holds it.
    pub fn read(&self) -> RwLockReadGuard<'_, VectorData> {
        self.data.read()
    }

    /// Acquires the writer lock, blocking until every other guard is released.
    pub fn write(&self) -> RwLockWriteGuard<'_, VectorData> {
        self.data.write()
    }
}

/// The lock protected contents of a `SharedVector`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorData {
    values: Box<[f64]>,
    orientation: Orientation,
}

impl VectorData {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Adds `other` into this vector element by element.
    ///
    /// # Arguments
    /// * `other` - A vector with the same length and orientation.
    ///
    /// # Returns
    /// A `DimensionMismatch` if the lengths differ or an `OrientationMismatch` if the
    /// orientations differ.
    pub fn add(&mut self, other: &VectorData) -> Result<()> {
        if self.len() != other.len() {
            return Err(LaeErr::DimensionMismatch {
                op: "add",
                got: other.len(),
                expected: self.len(),
            });
        }

        if self.orientation != other.orientation {
            return Err(LaeErr::OrientationMismatch {
                op: "add",
                detail: "operands must share the same orientation",
            });
        }

        self.values
            .iter_mut()
            .zip(other.values.iter())
            .for_each(|(a, b)| *a += b);

        Ok(())
    }

    /// Flips the sign of every element.
    pub fn negate(&mut self) {
        self.values.iter_mut().for_each(|x| *x = -*x);
    }

    /// Flips the orientation tag, the elements don't move.
    pub fn transpose(&mut self) {
        self.orientation = self.orientation.flipped();
    }

    /// Computes the dot product between this row vector and a column vector.
    ///
    /// # Arguments
    /// * `other` - A column vector of the same length.
    ///
    /// # Returns
    /// The sum of the elementwise products, or an error if the lengths differ or the
    /// operands aren't a row and a column, in that order.
    pub fn dot(&self, other: &VectorData) -> Result<f64> {
        if self.len() != other.len() {
            return Err(LaeErr::DimensionMismatch {
                op: "dot",
                got: other.len(),
                expected: self.len(),
            });
        }

        if self.orientation == Orientation::Column {
            return Err(LaeErr::OrientationMismatch {
                op: "dot",
                detail: "left vector is a column vector",
            });
        }

        if other.orientation == Orientation::Row {
            return Err(LaeErr::OrientationMismatch {
                op: "dot",
                detail: "right vector is a row vector",
            });
        }

        Ok(self.values.iter().zip(other.values.iter()).map(|(a, b)| a * b).sum())
    }

    /// Replaces this row vector with its product against a column major matrix.
    ///
    /// The new buffer has one element per column of `matrix`, the orientation stays `Row`.
    ///
    /// # Arguments
    /// * `matrix` - The read locked right operand, it must be column major.
    ///
    /// # Returns
    /// An error if this isn't a row vector, `matrix` isn't column major or the
    /// inner dimensions differ.
    pub fn vec_mat_mul(&mut self, matrix: &MatrixReadGuard<'_>) -> Result<()> {
        if self.orientation != Orientation::Row {
            return Err(LaeErr::OrientationMismatch {
                op: "row times matrix",
                detail: "left vector is a column vector",
            });
        }

        if matrix.orientation() != Orientation::Column {
            return Err(LaeErr::OrientationMismatch {
                op: "row times matrix",
                detail: "right matrix is not column major",
            });
        }

        if self.len() != matrix.row_length() {
            return Err(LaeErr::DimensionMismatch {
                op: "row times matrix",
                got: matrix.row_length(),
                expected: self.len(),
            });
        }

        let product = matrix
            .vectors()
            .map(|column| self.dot(column))
            .collect::<Result<Vec<_>>>()?;

        self.values = product.into_boxed_slice();
        Ok(())
    }
}
