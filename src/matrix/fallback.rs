//! Element-wise reference algorithms for every storage combination.
//!
//! These routines read operands only through their element accessors and
//! write the result through [`assign`], so they are correct for any mix of
//! storage kinds. The fast paths in [`Matrix::add_into`](super::Matrix::add_into) and
//! friends must produce the same values; the tests in `tests/scenarios.rs`
//! compare the two.
//!
//! Every routine evaluates into a dense scratch buffer first and only then
//! writes the result, so a result kind that cannot hold the values (an
//! off-diagonal entry in diagonal storage, an asymmetric value pair in
//! symmetric storage) leaves the result untouched.

use crate::error::{LinalgError, Result};
use crate::storage::{mirrored_equal, DenseMatrix, DiagonalStorage, SparseCompressedRow, StorageKind};
use crate::traits::Scalar;
use crate::vector::Vector;

use super::Matrix;

fn require_shape<T: Scalar>(expected: (usize, usize), m: &Matrix<T>) -> Result<()> {
    if m.shape() != expected {
        return Err(LinalgError::mismatch(expected, m.shape()));
    }
    Ok(())
}

fn zip<T: Scalar>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    result: &mut Matrix<T>,
    f: impl Fn(T, T) -> T,
) -> Result<()> {
    require_shape(a.shape(), b)?;
    require_shape(a.shape(), result)?;
    let scratch = DenseMatrix::from_fn(a.nrows(), a.ncols(), |i, j| f(a.value(i, j), b.value(i, j)));
    assign(result, &scratch)
}

/// `result = a + b`, cell by cell.
pub fn add<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>, result: &mut Matrix<T>) -> Result<()> {
    zip(a, b, result, |x, y| x + y)
}

/// `result = a - b`, cell by cell.
pub fn sub<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>, result: &mut Matrix<T>) -> Result<()> {
    zip(a, b, result, |x, y| x - y)
}

/// `result[i, j] = a[i, j] * b[i, j]`
pub fn pointwise_mul<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>, result: &mut Matrix<T>) -> Result<()> {
    zip(a, b, result, |x, y| x * y)
}

/// `result[i, j] = a[i, j] / b[i, j]`
pub fn pointwise_div<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>, result: &mut Matrix<T>) -> Result<()> {
    zip(a, b, result, |x, y| x / y)
}

/// `result = a * b` by the textbook triple loop.
pub fn matmul<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>, result: &mut Matrix<T>) -> Result<()> {
    if a.ncols() != b.nrows() {
        return Err(LinalgError::mismatch((a.ncols(), b.ncols()), b.shape()));
    }
    require_shape((a.nrows(), b.ncols()), result)?;
    let scratch = DenseMatrix::from_fn(a.nrows(), b.ncols(), |i, j| {
        (0..a.ncols()).fold(T::zero(), |acc, k| acc + a.value(i, k) * b.value(k, j))
    });
    assign(result, &scratch)
}

/// `y = a * x` through the element accessors of both operands.
pub fn mul_vector<T: Scalar>(a: &Matrix<T>, x: &Vector<T>, y: &mut [T]) -> Result<()> {
    if x.len() != a.ncols() {
        return Err(LinalgError::mismatch((a.ncols(), 1), (x.len(), 1)));
    }
    if y.len() != a.nrows() {
        return Err(LinalgError::mismatch((a.nrows(), 1), (y.len(), 1)));
    }
    for (i, yi) in y.iter_mut().enumerate() {
        *yi = (0..a.ncols()).fold(T::zero(), |acc, k| acc + a.value(i, k) * x.value(k));
    }
    Ok(())
}

/// Copy `values` into `result`, keeping `result`'s storage kind.
///
/// Checks first that the kind can represent every value and returns
/// [`LinalgError::Unsupported`] without writing anything if it cannot.
pub fn assign<T: Scalar>(result: &mut Matrix<T>, values: &DenseMatrix<T>) -> Result<()> {
    let shape = (values.nrows(), values.ncols());
    require_shape(shape, result)?;
    let (nrows, ncols) = shape;

    match result {
        Matrix::Dense(r) => r.as_mut_slice().copy_from_slice(values.as_slice()),
        Matrix::Sparse(r) => *r = SparseCompressedRow::from_dense(values),
        Matrix::Diagonal(r) => {
            let fits = (0..ncols).all(|j| {
                (0..nrows).all(|i| i == j || DiagonalStorage::is_storable_off_diagonal(values[(i, j)]))
            });
            if !fits {
                return Err(LinalgError::unsupported(StorageKind::Diagonal, "assign off-diagonal value"));
            }
            for (i, d) in r.diagonal_mut().iter_mut().enumerate() {
                *d = values[(i, i)];
            }
        }
        Matrix::Symmetric(r) => {
            let fits = (0..ncols).all(|j| (0..j).all(|i| mirrored_equal(values[(i, j)], values[(j, i)])));
            if !fits {
                return Err(LinalgError::unsupported(StorageKind::Symmetric, "assign asymmetric values"));
            }
            for j in 0..ncols {
                for i in 0..=j {
                    r.set(i, j, values[(i, j)]);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_kinds_add() {
        let a = Matrix::sparse_from_rows(2, 2, &[1.0_f64, 0.0, 0.0, 2.0]);
        let b = Matrix::diagonal_from_slice(2, 2, &[3.0, 4.0]);
        let mut r = Matrix::dense_zeros(2, 2);
        add(&a, &b, &mut r).unwrap();
        assert_eq!(r.to_dense().as_slice(), &[4.0, 0.0, 0.0, 6.0]);
    }

    #[test]
    fn assign_is_all_or_nothing() {
        let mut d = Matrix::diagonal_from_slice(2, 2, &[7.0_f64, 8.0]);
        let values = DenseMatrix::from_rows(2, 2, &[1.0, 5.0, 0.0, 2.0]);
        let err = assign(&mut d, &values).unwrap_err();
        assert!(matches!(err, LinalgError::Unsupported { kind: StorageKind::Diagonal, .. }));
        assert_eq!(d.to_dense().as_slice(), &[7.0, 0.0, 0.0, 8.0]);

        let mut s = Matrix::symmetric_zeros(2);
        let err = assign(&mut s, &values).unwrap_err();
        assert!(matches!(err, LinalgError::Unsupported { kind: StorageKind::Symmetric, .. }));
        assert_eq!(s.to_dense().as_slice(), &[0.0; 4]);
    }

    #[test]
    fn shape_checked_before_writing() {
        let a = Matrix::dense_from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
        let b = Matrix::dense_zeros(2, 3);
        let mut r = Matrix::dense_from_rows(2, 2, &[9.0, 9.0, 9.0, 9.0]);
        assert!(matches!(sub(&a, &b, &mut r), Err(LinalgError::DimensionMismatch { .. })));
        assert_eq!(r.to_dense().as_slice(), &[9.0; 4]);
    }

    #[test]
    fn matvec_through_accessors() {
        let a = Matrix::symmetric_from_fn(2, |i, j| (i + j + 1) as f64);
        let x = Vector::sparse_from_slice(&[0.0, 2.0]);
        let mut y = [0.0; 2];
        mul_vector(&a, &x, &mut y).unwrap();
        assert_eq!(y, [4.0, 6.0]);
    }
}
