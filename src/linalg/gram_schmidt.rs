use crate::error::{LinalgError, Result};
use crate::linalg::qr::{is_full_rank, qr_solve};
use crate::linalg::{column_to_vector, dense_rhs, dense_rhs_vector, to_float, two_columns_mut};
use crate::matrix::Matrix;
use crate::storage::DenseMatrix;
use crate::traits::{FloatScalar, MatrixMut, MatrixRef};
use crate::vector::{DenseVector, Vector};

/// Modified Gram-Schmidt orthogonalization in place.
///
/// On entry `q` holds the `m x n` input; on return it holds the thin Q.
/// `r` (`n x n`) receives the upper-triangular coefficients.
///
/// Column `k` is normalized (its norm becomes `R[k,k]`) and its projection
/// is removed from every later column before those are visited.
///
/// Fails with [`LinalgError::RankDeficient`] when a column has collapsed to
/// a norm at or below `eps * m` times its original norm.
pub fn gram_schmidt_in_place<T: FloatScalar>(
    q: &mut impl MatrixMut<T>,
    r: &mut impl MatrixMut<T>,
) -> Result<()> {
    let m = q.nrows();
    let n = q.ncols();
    assert_eq!((r.nrows(), r.ncols()), (n, n), "R must be n x n");

    let original: Vec<T> = (0..n).map(|j| column_norm(q.col_as_slice(j, 0))).collect();
    let cutoff = T::epsilon() * to_float::<T>(m);

    for k in 0..n {
        let norm = column_norm(q.col_as_slice(k, 0));
        if norm <= cutoff * original[k] {
            return Err(LinalgError::RankDeficient);
        }
        *r.get_mut(k, k) = norm;
        for x in q.col_as_mut_slice(k, 0) {
            *x = *x / norm;
        }

        for j in (k + 1)..n {
            let (qk, qj) = two_columns_mut(q.as_mut_slice(), m, k, j, 0);
            let dot = qk.iter().zip(qj.iter()).fold(T::zero(), |acc, (&a, &b)| acc + a * b);
            for (x, &y) in qj.iter_mut().zip(qk.iter()) {
                *x = *x - dot * y;
            }
            *r.get_mut(k, j) = dot;
        }
    }
    Ok(())
}

fn column_norm<T: FloatScalar>(col: &[T]) -> T {
    col.iter().fold(T::zero(), |acc, &v| acc + v * v).sqrt()
}

// ── GramSchmidt ─────────────────────────────────────────────────────

/// Thin QR decomposition by modified Gram-Schmidt.
///
/// Same contract as a thin [`Qr`](crate::linalg::Qr): Q is `m x n` with
/// orthonormal columns, R is `n x n` upper triangular.
///
/// ```
/// use polymat::Matrix;
///
/// let a = Matrix::dense_from_rows(3, 2, &[3.0_f64, 0.0, 4.0, 1.0, 0.0, 2.0]);
/// let gs = a.gram_schmidt().unwrap();
/// assert!((gs.r()[(0, 0)] - 5.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct GramSchmidt<T> {
    q: DenseMatrix<T>,
    r: DenseMatrix<T>,
}

impl<T: FloatScalar> GramSchmidt<T> {
    /// Orthogonalize the columns of `a` (`rows >= cols`).
    pub fn new(a: &Matrix<T>) -> Result<Self> {
        let (m, n) = a.shape();
        if m < n {
            return Err(LinalgError::InvalidArgument(
                "Gram-Schmidt requires rows >= columns",
            ));
        }
        let mut q = a.to_dense();
        let mut r = DenseMatrix::zeros(n, n);
        gram_schmidt_in_place(&mut q, &mut r)?;
        Ok(Self { q, r })
    }

    /// Orthonormal factor Q (`m x n`).
    pub fn q(&self) -> &DenseMatrix<T> {
        &self.q
    }

    /// Upper-triangular factor R (`n x n`).
    pub fn r(&self) -> &DenseMatrix<T> {
        &self.r
    }

    /// `|det(A)|` for square input.
    pub fn determinant(&self) -> Result<T> {
        let (m, n) = (self.q.nrows(), self.q.ncols());
        if m != n {
            return Err(LinalgError::NotSquare { rows: m, cols: n });
        }
        Ok((0..n).fold(T::one(), |acc, i| acc * self.r[(i, i)]).abs())
    }

    /// No diagonal entry of R is negligible relative to the largest one.
    pub fn is_full_rank(&self) -> bool {
        is_full_rank(&self.r, self.q.nrows())
    }

    /// Least-squares solve for every column of `B`.
    pub fn solve(&self, b: &Matrix<T>) -> Result<DenseMatrix<T>> {
        let b = dense_rhs(b, self.q.nrows())?;
        qr_solve(&self.q, &self.r, &b)
    }

    /// Least-squares solve for a single right-hand side.
    pub fn solve_vector(&self, b: &Vector<T>) -> Result<DenseVector<T>> {
        let b = dense_rhs_vector(b, self.q.nrows())?;
        qr_solve(&self.q, &self.r, &b).map(column_to_vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::test_util::{assert_matrix_near, assert_near};

    const TOL: f64 = 1e-10;

    #[test]
    fn orthonormal_and_reconstructs() {
        let a = DenseMatrix::from_rows(4, 3, &[
            1.0, 2.0, 0.0, //
            0.0, 1.0, 1.0, //
            1.0, 0.0, 1.0, //
            2.0, 1.0, 3.0,
        ]);
        let gs = GramSchmidt::new(&Matrix::Dense(a.clone())).unwrap();
        let q = gs.q();
        assert_matrix_near(&(&q.transpose() * q), &DenseMatrix::eye(3), TOL, "Q^T Q");
        assert_matrix_near(&(q * gs.r()), &a, TOL, "Q R");
        assert_eq!(gs.r()[(2, 0)], 0.0);
        assert!(gs.is_full_rank());
    }

    #[test]
    fn dependent_columns_rejected() {
        let a = Matrix::dense_from_rows(3, 2, &[1.0_f64, 2.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(GramSchmidt::new(&a).unwrap_err(), LinalgError::RankDeficient);

        let zero_col = Matrix::dense_from_rows(2, 2, &[1.0_f64, 0.0, 1.0, 0.0]);
        assert_eq!(GramSchmidt::new(&zero_col).unwrap_err(), LinalgError::RankDeficient);
    }

    #[test]
    fn agrees_with_lu_solve() {
        let a = Matrix::dense_from_rows(3, 3, &[2.0_f64, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 2.0]);
        let b = Vector::dense_from_slice(&[1.0, 0.0, 1.0]);
        let x_gs = a.gram_schmidt().unwrap().solve_vector(&b).unwrap();
        let x_lu = a.lu().unwrap().solve_vector(&b).unwrap();
        for i in 0..3 {
            assert_near(x_gs[i], x_lu[i], TOL, "x");
        }
        assert_near(a.gram_schmidt().unwrap().determinant().unwrap(), 4.0, TOL, "|det|");
    }
}
