use std::sync::Arc;

use parking_lot::RwLockReadGuard;

use super::{Orientation, SharedVector, VectorData};
use crate::error::{LaeErr, Result};

/// A dense matrix stored as independently lockable row or column vectors.
///
/// Cloning is cheap, every clone shares the same vectors until one of them
/// is reloaded, which swaps in a whole new vector sequence.
#[derive(Debug, Clone)]
pub struct SharedMatrix {
    vectors: Arc<[SharedVector]>,
    vector_len: usize,
    orientation: Orientation,
}

impl Default for SharedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMatrix {
    /// Creates a new empty `SharedMatrix`.
    pub fn new() -> Self {
        Self {
            vectors: Arc::from(Vec::new()),
            vector_len: 0,
            orientation: Orientation::Row,
        }
    }

    /// Creates a new `SharedMatrix` holding `data` as row vectors.
    ///
    /// # Arguments
    /// * `data` - A rectangular row major matrix.
    pub fn from_row_major(data: &[Vec<f64>]) -> Result<Self> {
        let mut matrix = Self::new();
        matrix.load_row_major(data)?;
        Ok(matrix)
    }

    /// Replaces the contents with `data`, one row vector per row.
    ///
    /// No lock is taken, the previous vectors are simply released. Must not be
    /// called while a batch is running against this matrix.
    ///
    /// # Arguments
    /// * `data` - A rectangular row major matrix.
    ///
    /// # Returns
    /// A `DimensionMismatch` if the rows have different lengths.
    pub fn load_row_major(&mut self, data: &[Vec<f64>]) -> Result<()> {
        let cols = check_rectangular(data)?;

        self.vectors = data
            .iter()
            .map(|row| SharedVector::new(row.clone(), Orientation::Row))
            .collect();

        self.vector_len = cols;
        self.orientation = Orientation::Row;
        Ok(())
    }

    /// Replaces the contents with `data`, one column vector per column.
    ///
    /// # Arguments
    /// * `data` - A rectangular row major matrix.
    ///
    /// # Returns
    /// A `DimensionMismatch` if the rows have different lengths.
    pub fn load_column_major(&mut self, data: &[Vec<f64>]) -> Result<()> {
        let cols = check_rectangular(data)?;

        self.vectors = (0..cols)
            .map(|j| {
                let column = data.iter().map(|row| row[j]).collect();
                SharedVector::new(column, Orientation::Column)
            })
            .collect();

        // Kept apart from the vectors, a matrix without columns still has rows.
        self.vector_len = data.len();
        self.orientation = Orientation::Column;
        Ok(())
    }

    /// Copies the matrix out in logical row major form.
    ///
    /// Every vector is read locked in ascending order for the duration of the copy.
    pub fn read_row_major(&self) -> Vec<Vec<f64>> {
        self.read_all().to_row_major()
    }

    /// Read locks every vector, in ascending index order.
    ///
    /// The locks are released when the returned guard is dropped.
    pub fn read_all(&self) -> MatrixReadGuard<'_> {
        MatrixReadGuard {
            orientation: self.orientation,
            vector_len: self.vector_len,
            guards: self.vectors.iter().map(SharedVector::read).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&SharedVector> {
        self.vectors.get(index)
    }

    /// Returns the amount of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Overrides the matrix level orientation without touching the vectors.
    ///
    /// Used after every vector was transposed in place.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }
}

/// Reader locks over every vector of a `SharedMatrix`.
pub struct MatrixReadGuard<'a> {
    orientation: Orientation,
    vector_len: usize,
    guards: Vec<RwLockReadGuard<'a, VectorData>>,
}

impl MatrixReadGuard<'_> {
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Returns the length of the stored vectors.
    ///
    /// With no vectors stored this is the length given at load time, so a column
    /// major matrix without columns still reports its row count.
    pub fn row_length(&self) -> usize {
        self.guards.first().map_or(self.vector_len, |v| v.len())
    }

    pub fn vectors(&self) -> impl Iterator<Item = &VectorData> {
        self.guards.iter().map(|guard| &**guard)
    }

    /// Copies the locked vectors into a row major buffer, transposing column major storage.
    pub fn to_row_major(&self) -> Vec<Vec<f64>> {
        match self.orientation {
            Orientation::Row => self.vectors().map(|v| v.values().to_vec()).collect(),
            Orientation::Column => (0..self.row_length())
                .map(|i| self.vectors().map(|v| v.values()[i]).collect())
                .collect(),
        }
    }
}

/// Returns the column count of `data` after checking every row has it.
fn check_rectangular(data: &[Vec<f64>]) -> Result<usize> {
    let Some(first) = data.first() else {
        return Ok(0);
    };

    let cols = first.len();
    match data.iter().find(|row| row.len() != cols) {
        Some(row) => Err(LaeErr::DimensionMismatch {
            op: "load",
            got: row.len(),
            expected: cols,
        }),
        None => Ok(cols),
    }
}
