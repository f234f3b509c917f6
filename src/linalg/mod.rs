//! Matrix factorizations.
//!
//! Each factorization comes in two layers:
//! - a free in-place kernel working on any [`MatrixMut`] (owned
//!   [`DenseMatrix`](crate::DenseMatrix) or a borrowed
//!   [`DenseViewMut`](crate::DenseViewMut))
//! - an owning wrapper (`Lu`, `Cholesky`, `Qr`, `GramSchmidt`, `Svd`, `Evd`)
//!   that copies the input once, factors it eagerly, and then answers
//!   `solve`, `determinant` and accessor calls from the cached factors.

pub(crate) mod cholesky;
pub(crate) mod evd;
pub(crate) mod gram_schmidt;
pub(crate) mod hessenberg;
pub(crate) mod lu;
pub(crate) mod qr;
pub(crate) mod schur;
pub(crate) mod svd;
pub(crate) mod symmetric_eigen;

pub use cholesky::{cholesky_in_place, cholesky_solve_in_place, Cholesky};
pub use evd::{Evd, Symmetricity};
pub use gram_schmidt::{gram_schmidt_in_place, GramSchmidt};
pub use hessenberg::hessenberg;
pub use lu::{lu_in_place, lu_solve_in_place, Lu};
pub use qr::{householder_q, householder_qr_in_place, Qr, QrMethod};
pub use schur::hqr2;
pub use svd::{svd_in_place, Svd};
pub use symmetric_eigen::{tridiagonal_ql, tridiagonalize};

use crate::error::{LinalgError, Result};
use crate::matrix::Matrix;
use crate::storage::DenseMatrix;
use crate::traits::{FloatScalar, MatrixMut, MatrixRef, Scalar};
use crate::vector::{DenseVector, Vector};

/// Mutable slices of two distinct columns of a column-major buffer.
///
/// Each slice starts at `row_start`. Requires `col_a != col_b`.
#[inline]
pub(crate) fn two_columns_mut<T>(
    data: &mut [T],
    nrows: usize,
    col_a: usize,
    col_b: usize,
    row_start: usize,
) -> (&mut [T], &mut [T]) {
    debug_assert_ne!(col_a, col_b);
    let (lo, hi, swapped) = if col_a < col_b {
        (col_a, col_b, false)
    } else {
        (col_b, col_a, true)
    };
    let (left, right) = data.split_at_mut(hi * nrows);
    let lo_slice = &mut left[lo * nrows + row_start..(lo + 1) * nrows];
    let hi_slice = &mut right[row_start..nrows];
    if swapped {
        (hi_slice, lo_slice)
    } else {
        (lo_slice, hi_slice)
    }
}

/// Solve `R X = B` in place, where `R` is the leading `k x k` upper triangle
/// of `r` and `k = x.nrows()`.
///
/// Fails with [`LinalgError::Singular`] on an exactly zero diagonal entry.
pub fn solve_upper_triangular<T: FloatScalar>(
    r: &impl MatrixRef<T>,
    x: &mut impl MatrixMut<T>,
) -> Result<()> {
    let k = x.nrows();
    assert!(r.nrows() >= k && r.ncols() >= k, "triangular factor too small");
    if (0..k).any(|i| *r.get(i, i) == T::zero()) {
        return Err(LinalgError::Singular);
    }
    for c in 0..x.ncols() {
        let col = x.col_as_mut_slice(c, 0);
        for i in (0..k).rev() {
            let mut sum = col[i];
            for j in (i + 1)..k {
                sum = sum - *r.get(i, j) * col[j];
            }
            col[i] = sum / *r.get(i, i);
        }
    }
    Ok(())
}

/// `n` as a float, saturating to the largest finite value.
#[inline]
pub(crate) fn to_float<T: FloatScalar>(n: usize) -> T {
    num_traits::cast(n).unwrap_or_else(T::max_value)
}

pub(crate) fn require_square<T: Scalar>(a: &Matrix<T>) -> Result<usize> {
    if a.nrows() != a.ncols() {
        return Err(LinalgError::NotSquare {
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    Ok(a.nrows())
}

/// Dense copy of a right-hand side, checked to have `rows` rows.
pub(crate) fn dense_rhs<T: Scalar>(b: &Matrix<T>, rows: usize) -> Result<DenseMatrix<T>> {
    if b.nrows() != rows {
        return Err(LinalgError::mismatch((rows, b.ncols()), b.shape()));
    }
    Ok(b.to_dense())
}

/// Dense copy of a right-hand-side vector as an `n x 1` matrix.
pub(crate) fn dense_rhs_vector<T: Scalar>(b: &Vector<T>, rows: usize) -> Result<DenseMatrix<T>> {
    if b.len() != rows {
        return Err(LinalgError::mismatch((rows, 1), (b.len(), 1)));
    }
    Ok(DenseMatrix::from_vec(rows, 1, b.to_dense().into_vec()))
}

pub(crate) fn column_to_vector<T: Scalar>(x: DenseMatrix<T>) -> DenseVector<T> {
    DenseVector::from_vec(x.into_vec())
}
