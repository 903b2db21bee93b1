//! Per-row tasks over a pair of working matrices.
//!
//! Every task of a batch write locks exactly one row of the left matrix, and only
//! ever read locks the right matrix, so tasks never contend across rows.

use crate::{
    error::{LaeErr, Result},
    scheduling::Task,
    storage::{SharedMatrix, SharedVector, VectorData},
};

fn row<'a>(matrix: &'a SharedMatrix, index: usize, op: &'static str) -> Result<&'a SharedVector> {
    matrix.get(index).ok_or(LaeErr::DimensionMismatch {
        op,
        got: matrix.len(),
        expected: index + 1,
    })
}

/// One task per row adding the matching row of `right` into `left`.
pub(super) fn add_rows(left: &SharedMatrix, right: &SharedMatrix) -> Vec<Task> {
    (0..left.len())
        .map(|i| {
            let left = left.clone();
            let right = right.clone();

            Box::new(move || {
                let mut target = row(&left, i, "add")?.write();
                target.add(&row(&right, i, "add")?.read())
            }) as Task
        })
        .collect()
}

/// One task per row replacing each row of `left` with its product against the column major `right`.
pub(super) fn multiply_rows(left: &SharedMatrix, right: &SharedMatrix) -> Vec<Task> {
    (0..left.len())
        .map(|i| {
            let left = left.clone();
            let right = right.clone();

            Box::new(move || {
                let mut target = row(&left, i, "multiply")?.write();
                target.vec_mat_mul(&right.read_all())
            }) as Task
        })
        .collect()
}

pub(super) fn negate_rows(left: &SharedMatrix) -> Vec<Task> {
    in_place(left, "negate", VectorData::negate)
}

pub(super) fn transpose_rows(left: &SharedMatrix) -> Vec<Task> {
    in_place(left, "transpose", VectorData::transpose)
}

fn in_place(left: &SharedMatrix, op: &'static str, f: fn(&mut VectorData)) -> Vec<Task> {
    (0..left.len())
        .map(|i| {
            let left = left.clone();

            Box::new(move || {
                f(&mut row(&left, i, op)?.write());
                Ok(())
            }) as Task
        })
        .collect()
}
