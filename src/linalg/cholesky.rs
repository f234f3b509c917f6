use crate::error::{LinalgError, Result};
use crate::kernel::{provider, FactorizationProvider};
use crate::linalg::{column_to_vector, dense_rhs, dense_rhs_vector, require_square};
use crate::matrix::Matrix;
use crate::parallel::{split_columns, Parallelism, PARALLEL_COLUMN_THRESHOLD};
use crate::storage::DenseMatrix;
use crate::traits::{FloatScalar, MatrixMut, MatrixRef};
use crate::vector::{DenseVector, Vector};

/// Cholesky decomposition in place: `A = L L^T`.
///
/// Only the lower triangle of `a` is read. On return `a` holds L with its
/// strict upper triangle zeroed.
///
/// Right-looking: after the square root of pivot `(j, j)` is taken and the
/// column below it is scaled, the rank-1 update of the trailing submatrix
/// is split across threads by column range once it is wider than
/// [`PARALLEL_COLUMN_THRESHOLD`].
///
/// Returns [`LinalgError::NotPositiveDefinite`] at the first pivot that is
/// not strictly positive.
pub fn cholesky_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    parallelism: Parallelism,
) -> Result<()> {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "Cholesky decomposition requires a square matrix");

    for j in 0..n {
        let d = *a.get(j, j);
        // also rejects NaN
        if !(d > T::zero()) {
            return Err(LinalgError::NotPositiveDefinite);
        }
        let pivot = d.sqrt();
        *a.get_mut(j, j) = pivot;
        for x in a.col_as_mut_slice(j, j + 1) {
            *x = *x / pivot;
        }

        let data = a.as_mut_slice();
        let (left, trailing) = data.split_at_mut((j + 1) * n);
        let l_col = &left[j * n..];
        split_columns(
            trailing,
            n,
            j + 1,
            PARALLEL_COLUMN_THRESHOLD,
            parallelism,
            &|first, block: &mut [T]| {
                for (kk, col) in block.chunks_mut(n).enumerate() {
                    let k = first + kk;
                    let l_kj = l_col[k];
                    for i in k..n {
                        col[i] = col[i] - l_col[i] * l_kj;
                    }
                }
            },
        );
    }

    for j in 1..n {
        for x in &mut a.col_as_mut_slice(j, 0)[..j] {
            *x = T::zero();
        }
    }

    Ok(())
}

/// Solve `L L^T X = B` in place given the lower factor from [`cholesky_in_place`].
pub fn cholesky_solve_in_place<T: FloatScalar>(l: &impl MatrixRef<T>, b: &mut impl MatrixMut<T>) {
    let n = l.nrows();
    assert_eq!(b.nrows(), n, "rhs row count mismatch");

    for c in 0..b.ncols() {
        let x = b.col_as_mut_slice(c, 0);

        // Forward: L y = b
        for i in 0..n {
            let mut sum = x[i];
            for k in 0..i {
                sum = sum - *l.get(i, k) * x[k];
            }
            x[i] = sum / *l.get(i, i);
        }

        // Back: L^T x = y
        for i in (0..n).rev() {
            let mut sum = x[i];
            for k in (i + 1)..n {
                sum = sum - *l.get(k, i) * x[k];
            }
            x[i] = sum / *l.get(i, i);
        }
    }
}

// ── Cholesky ────────────────────────────────────────────────────────

/// Cholesky decomposition of a symmetric positive-definite matrix.
///
/// Stores the lower triangular factor L where `A = L L^T`.
///
/// # Example
///
/// ```
/// use polymat::{Matrix, Vector};
///
/// let a = Matrix::dense_from_rows(2, 2, &[4.0_f64, 2.0, 2.0, 3.0]);
/// let chol = a.cholesky().unwrap();
///
/// let x = chol.solve_vector(&Vector::dense_from_slice(&[8.0, 7.0])).unwrap();
/// assert!((x[0] - 1.25).abs() < 1e-12);
/// assert!((chol.determinant() - 8.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Cholesky<T> {
    factor: DenseMatrix<T>,
}

impl<T: FloatScalar> Cholesky<T> {
    /// Factor a symmetric positive-definite matrix using the global parallelism.
    pub fn new(a: &Matrix<T>) -> Result<Self> {
        let n = require_square(a)?;
        let mut factor = a.to_dense();
        provider().cholesky_factor(factor.as_mut_slice(), n)?;
        Ok(Self { factor })
    }

    /// Factor with an explicit parallelism setting.
    pub fn with_parallelism(a: &Matrix<T>, parallelism: Parallelism) -> Result<Self> {
        require_square(a)?;
        let mut factor = a.to_dense();
        cholesky_in_place(&mut factor, parallelism)?;
        Ok(Self { factor })
    }

    /// Lower-triangular factor L.
    pub fn factor(&self) -> &DenseMatrix<T> {
        &self.factor
    }

    /// `det(A) = prod(L[i,i])^2`.
    pub fn determinant(&self) -> T {
        let n = self.factor.nrows();
        let mut d = T::one();
        for i in 0..n {
            d = d * self.factor[(i, i)];
        }
        d * d
    }

    /// `ln det(A) = 2 * sum(ln L[i,i])`, safe where the determinant itself would overflow.
    pub fn determinant_ln(&self) -> T {
        let n = self.factor.nrows();
        let mut s = T::zero();
        for i in 0..n {
            s = s + self.factor[(i, i)].ln();
        }
        s + s
    }

    /// Solve `A X = B` for every column of `B`.
    pub fn solve(&self, b: &Matrix<T>) -> Result<DenseMatrix<T>> {
        let n = self.factor.nrows();
        let mut x = dense_rhs(b, n)?;
        let cols = x.ncols();
        provider().cholesky_solve_factored(self.factor.as_slice(), n, x.as_mut_slice(), cols);
        Ok(x)
    }

    /// Solve `A x = b`.
    pub fn solve_vector(&self, b: &Vector<T>) -> Result<DenseVector<T>> {
        let n = self.factor.nrows();
        let mut x = dense_rhs_vector(b, n)?;
        provider().cholesky_solve_factored(self.factor.as_slice(), n, x.as_mut_slice(), 1);
        Ok(column_to_vector(x))
    }

    /// Inverse, by solving against the identity.
    pub fn inverse(&self) -> DenseMatrix<T> {
        let n = self.factor.nrows();
        let mut inv = DenseMatrix::eye(n);
        provider().cholesky_solve_factored(self.factor.as_slice(), n, inv.as_mut_slice(), n);
        inv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::test_util::{assert_matrix_near, assert_near};

    const TOL: f64 = 1e-10;

    #[test]
    fn classic_3x3() {
        let a = Matrix::dense_from_rows(
            3,
            3,
            &[4.0_f64, 12.0, -16.0, 12.0, 37.0, -43.0, -16.0, -43.0, 98.0],
        );
        let chol = a.cholesky().unwrap();
        let expected = DenseMatrix::from_rows(3, 3, &[2.0, 0.0, 0.0, 6.0, 1.0, 0.0, -8.0, 5.0, 3.0]);
        assert_matrix_near(chol.factor(), &expected, TOL, "L");
        assert_near(chol.determinant(), 36.0, TOL, "det");
        assert_near(chol.determinant_ln(), 36.0_f64.ln(), TOL, "ln det");
    }

    #[test]
    fn not_positive_definite() {
        let a = Matrix::dense_from_rows(2, 2, &[1.0_f64, 5.0, 5.0, 1.0]);
        assert_eq!(Cholesky::new(&a).unwrap_err(), LinalgError::NotPositiveDefinite);
        let zero = Matrix::<f64>::dense_zeros(2, 2);
        assert_eq!(Cholesky::new(&zero).unwrap_err(), LinalgError::NotPositiveDefinite);
    }

    #[test]
    fn parallel_matches_sequential() {
        let n = 2 * PARALLEL_COLUMN_THRESHOLD + 37;
        let b = DenseMatrix::from_fn(n, n, |i, j| (((i * 7 + j * 3) % 11) as f64) - 5.0);
        let mut spd = &b.transpose() * &b;
        for i in 0..n {
            spd[(i, i)] = spd[(i, i)] + n as f64;
        }
        let m = Matrix::Dense(spd.clone());

        let seq = Cholesky::with_parallelism(&m, Parallelism::None).unwrap();
        #[cfg(feature = "rayon")]
        let par = Cholesky::with_parallelism(&m, Parallelism::Rayon(4)).unwrap();
        #[cfg(not(feature = "rayon"))]
        let par = Cholesky::with_parallelism(&m, Parallelism::None).unwrap();
        assert_eq!(seq.factor(), par.factor());

        let l = seq.factor();
        let llt = l * &l.transpose();
        assert_matrix_near(&llt, &spd, 1e-8 * n as f64, "L L^T");
    }

    #[test]
    fn solve_and_inverse() {
        let a = DenseMatrix::from_rows(3, 3, &[4.0, 2.0, 0.6, 2.0, 5.0, 1.0, 0.6, 1.0, 3.0]);
        let chol = Cholesky::new(&Matrix::Dense(a.clone())).unwrap();
        let b = Vector::dense_from_slice(&[1.0, -2.0, 3.0]);
        let x = chol.solve_vector(&b).unwrap();
        let ax = a.mul_slice(x.as_slice());
        for i in 0..3 {
            assert_near(ax[i], b.at(i).unwrap(), TOL, "A x = b");
        }
        assert_matrix_near(&(&a * &chol.inverse()), &DenseMatrix::eye(3), TOL, "A A^-1");
    }
}
