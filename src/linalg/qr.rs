use crate::error::{LinalgError, Result};
use crate::kernel::{provider, FactorizationProvider};
use crate::linalg::{column_to_vector, dense_rhs, dense_rhs_vector, to_float};
use crate::matrix::Matrix;
use crate::parallel::{get_global_parallelism, split_columns, Parallelism, PARALLEL_COLUMN_THRESHOLD};
use crate::storage::DenseMatrix;
use crate::traits::{FloatScalar, MatrixMut, MatrixRef};
use crate::vector::{DenseVector, Vector};

/// QR decomposition in place using Householder reflections.
///
/// On return, `a` contains the packed QR factorization:
/// - Upper triangle (including diagonal): R
/// - Lower triangle (excluding diagonal): Householder vectors, scaled so the
///   implicit leading entry is 1
///
/// `tau` is filled with the reflector factors (length `min(m, n)`); a zero
/// column yields `tau = 0` (identity reflector) and a zero on R's diagonal.
///
/// Each reflector is applied to the trailing columns in parallel column
/// blocks once more than [`PARALLEL_COLUMN_THRESHOLD`] columns remain.
pub fn householder_qr_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    tau: &mut [T],
    parallelism: Parallelism,
) {
    let m = a.nrows();
    let n = a.ncols();
    let k = m.min(n);
    assert_eq!(tau.len(), k, "tau length must equal min(M, N)");

    for col in 0..k {
        let norm = a
            .col_as_slice(col, col)
            .iter()
            .fold(T::zero(), |acc, &v| acc + v * v)
            .sqrt();

        if norm == T::zero() {
            tau[col] = T::zero();
            continue;
        }

        // sigma carries the sign of the diagonal so v0 = x0 + sigma avoids cancellation
        let x0 = *a.get(col, col);
        let sigma = if x0 >= T::zero() { norm } else { -norm };
        let v0 = x0 + sigma;
        let tau_val = v0 / sigma;
        tau[col] = tau_val;

        for x in a.col_as_mut_slice(col, col + 1) {
            *x = *x / v0;
        }

        // A[col:m, j] -= tau * v * (v^T A[col:m, j]) for every trailing column j
        let data = a.as_mut_slice();
        let (left, trailing) = data.split_at_mut((col + 1) * m);
        let v = &left[col * m..];
        split_columns(
            trailing,
            m,
            col + 1,
            PARALLEL_COLUMN_THRESHOLD,
            parallelism,
            &|_, block: &mut [T]| {
                for c in block.chunks_mut(m) {
                    let mut dot = c[col];
                    for i in (col + 1)..m {
                        dot = dot + v[i] * c[i];
                    }
                    dot = dot * tau_val;
                    c[col] = c[col] - dot;
                    for i in (col + 1)..m {
                        c[i] = c[i] - dot * v[i];
                    }
                }
            },
        );

        *a.get_mut(col, col) = -sigma;
    }
}

/// Form the first `q_cols` columns of Q from packed Householder factors.
///
/// Reflectors are applied in reverse column order to the leading columns
/// of the `m x m` identity. `q_cols = m` gives the full Q, `q_cols = n` the thin one.
pub fn householder_q<T: FloatScalar>(
    packed: &impl MatrixRef<T>,
    tau: &[T],
    q_cols: usize,
) -> DenseMatrix<T> {
    let m = packed.nrows();
    let mut q = DenseMatrix::from_fn(m, q_cols, |i, j| if i == j { T::one() } else { T::zero() });

    for col in (0..tau.len()).rev() {
        let tau_val = tau[col];
        if tau_val == T::zero() {
            continue;
        }
        let v = packed.col_as_slice(col, 0);
        for j in col..q_cols {
            let c = q.col_as_mut_slice(j, 0);
            let mut dot = c[col];
            for i in (col + 1)..m {
                dot = dot + v[i] * c[i];
            }
            dot = dot * tau_val;
            c[col] = c[col] - dot;
            for i in (col + 1)..m {
                c[i] = c[i] - dot * v[i];
            }
        }
    }
    q
}

// ── Qr ──────────────────────────────────────────────────────────────

/// Shape of the factors produced by [`Qr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrMethod {
    /// Q is `m x m`, R is `m x n`.
    Full,
    /// Q is `m x n`, R is `n x n`.
    Thin,
}

/// Householder QR decomposition of an `m x n` matrix with `m >= n`.
///
/// # Example
///
/// ```
/// use polymat::{Matrix, Vector, QrMethod};
///
/// // Least-squares fit: y = c0 + c1*x to points (0,1), (1,2), (2,4)
/// let a = Matrix::dense_from_rows(3, 2, &[1.0_f64, 0.0, 1.0, 1.0, 1.0, 2.0]);
/// let b = Vector::dense_from_slice(&[1.0, 2.0, 4.0]);
/// let x = a.qr(QrMethod::Thin).unwrap().solve_vector(&b).unwrap();
/// assert!((x[0] - 5.0 / 6.0).abs() < 1e-10);
/// assert!((x[1] - 3.0 / 2.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct Qr<T> {
    q: DenseMatrix<T>,
    r: DenseMatrix<T>,
    method: QrMethod,
}

impl<T: FloatScalar> Qr<T> {
    /// Factor `a` using the global parallelism setting.
    pub fn new(a: &Matrix<T>, method: QrMethod) -> Result<Self> {
        Self::with_parallelism(a, method, get_global_parallelism())
    }

    /// Factor `a` with an explicit parallelism setting.
    pub fn with_parallelism(a: &Matrix<T>, method: QrMethod, parallelism: Parallelism) -> Result<Self> {
        let (m, n) = a.shape();
        if m < n {
            return Err(LinalgError::InvalidArgument(
                "QR decomposition requires rows >= columns",
            ));
        }
        let mut packed = a.to_dense();
        let mut tau = vec![T::zero(); n];
        householder_qr_in_place(&mut packed, &mut tau, parallelism);

        let (q_cols, r_rows) = match method {
            QrMethod::Full => (m, m),
            QrMethod::Thin => (n, n),
        };
        let q = householder_q(&packed, &tau, q_cols);
        let r = DenseMatrix::from_fn(r_rows, n, |i, j| if i <= j { packed[(i, j)] } else { T::zero() });
        Ok(Self { q, r, method })
    }

    /// Orthogonal factor Q.
    pub fn q(&self) -> &DenseMatrix<T> {
        &self.q
    }

    /// Upper-triangular factor R.
    pub fn r(&self) -> &DenseMatrix<T> {
        &self.r
    }

    /// Whether the factors are full or thin.
    pub fn method(&self) -> QrMethod {
        self.method
    }

    /// `|det(A)| = |prod(R[i,i])|` for square input.
    pub fn determinant(&self) -> Result<T> {
        let (m, n) = (self.q.nrows(), self.r.ncols());
        if m != n {
            return Err(LinalgError::NotSquare { rows: m, cols: n });
        }
        Ok((0..n).fold(T::one(), |acc, i| acc * self.r[(i, i)]).abs())
    }

    /// No diagonal entry of R is negligible relative to the largest one.
    pub fn is_full_rank(&self) -> bool {
        is_full_rank(&self.r, self.q.nrows())
    }

    /// Least-squares solve `min ||A X - B||` for every column of `B`.
    pub fn solve(&self, b: &Matrix<T>) -> Result<DenseMatrix<T>> {
        let m = self.q.nrows();
        let b = dense_rhs(b, m)?;
        qr_solve(&self.q, &self.r, &b)
    }

    /// Least-squares solve `min ||A x - b||`.
    pub fn solve_vector(&self, b: &Vector<T>) -> Result<DenseVector<T>> {
        let m = self.q.nrows();
        let b = dense_rhs_vector(b, m)?;
        qr_solve(&self.q, &self.r, &b).map(column_to_vector)
    }
}

pub(crate) fn is_full_rank<T: FloatScalar>(r: &DenseMatrix<T>, m: usize) -> bool {
    let n = r.ncols();
    let max = (0..n).fold(T::zero(), |acc, i| acc.max(r[(i, i)].abs()));
    let tol = T::epsilon() * to_float::<T>(m.max(n)) * max;
    max > T::zero() && (0..n).all(|i| r[(i, i)].abs() > tol)
}

pub(crate) fn qr_solve<T: FloatScalar>(
    q: &DenseMatrix<T>,
    r: &DenseMatrix<T>,
    b: &DenseMatrix<T>,
) -> Result<DenseMatrix<T>> {
    let (m, q_cols) = (q.nrows(), q.ncols());
    let n = r.ncols();
    let b_cols = b.ncols();
    let mut x = DenseMatrix::zeros(n, b_cols);
    provider().qr_solve_factored(
        q.as_slice(),
        r.as_slice(),
        m,
        n,
        q_cols,
        b.as_slice(),
        b_cols,
        x.as_mut_slice(),
    )?;
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::test_util::{assert_matrix_near, assert_near};

    const TOL: f64 = 1e-10;

    fn sample() -> DenseMatrix<f64> {
        DenseMatrix::from_rows(
            4,
            3,
            &[
                12.0, -51.0, 4.0, //
                6.0, 167.0, -68.0, //
                -4.0, 24.0, -41.0, //
                1.0, 2.0, 3.0,
            ],
        )
    }

    #[test]
    fn full_and_thin_reconstruct() {
        let a = sample();
        for method in [QrMethod::Full, QrMethod::Thin] {
            let qr = Qr::new(&Matrix::Dense(a.clone()), method).unwrap();
            let (q, r) = (qr.q(), qr.r());
            match method {
                QrMethod::Full => {
                    assert_eq!((q.nrows(), q.ncols()), (4, 4));
                    assert_eq!((r.nrows(), r.ncols()), (4, 3));
                }
                QrMethod::Thin => {
                    assert_eq!((q.nrows(), q.ncols()), (4, 3));
                    assert_eq!((r.nrows(), r.ncols()), (3, 3));
                }
            }
            let qtq = &q.transpose() * q;
            assert_matrix_near(&qtq, &DenseMatrix::eye(q.ncols()), TOL, "Q^T Q");
            assert_matrix_near(&(q * r), &a, 1e-9, "Q R");
            for j in 0..r.ncols() {
                for i in (j + 1)..r.nrows() {
                    assert_eq!(r[(i, j)], 0.0);
                }
            }
            assert!(qr.is_full_rank());
        }
    }

    #[test]
    fn determinant_square_only() {
        let a = Matrix::dense_from_rows(2, 2, &[3.0_f64, 1.0, 4.0, 2.0]);
        let qr = a.qr(QrMethod::Full).unwrap();
        assert_near(qr.determinant().unwrap(), 2.0, TOL, "|det|");

        let tall = Qr::new(&Matrix::Dense(sample()), QrMethod::Thin).unwrap();
        assert!(matches!(tall.determinant(), Err(LinalgError::NotSquare { .. })));
    }

    #[test]
    fn wide_rejected() {
        let a = Matrix::<f64>::dense_zeros(2, 3);
        assert!(matches!(
            Qr::new(&a, QrMethod::Thin),
            Err(LinalgError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rank_deficient_detected() {
        // Third column = first + second
        let a = Matrix::dense_from_rows(3, 3, &[1.0_f64, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        let qr = a.qr(QrMethod::Full).unwrap();
        assert!(!qr.is_full_rank());
    }

    #[test]
    fn zero_column_gives_identity_reflector() {
        let a = Matrix::dense_from_rows(3, 2, &[0.0_f64, 1.0, 0.0, 2.0, 0.0, 3.0]);
        let qr = a.qr(QrMethod::Thin).unwrap();
        assert!(!qr.is_full_rank());
        assert_matrix_near(&(qr.q() * qr.r()), &a.to_dense(), TOL, "Q R");
    }

    #[test]
    fn parallel_matches_sequential() {
        let m = PARALLEL_COLUMN_THRESHOLD * 2 + 11;
        let n = PARALLEL_COLUMN_THRESHOLD * 2 + 3;
        let a = Matrix::Dense(DenseMatrix::from_fn(m, n, |i, j| {
            ((i * 13 + j * 7) % 17) as f64 - 8.0 + if i == j { 20.0 } else { 0.0 }
        }));
        let seq = Qr::with_parallelism(&a, QrMethod::Thin, Parallelism::None).unwrap();
        #[cfg(feature = "rayon")]
        let par = Qr::with_parallelism(&a, QrMethod::Thin, Parallelism::Rayon(4)).unwrap();
        #[cfg(not(feature = "rayon"))]
        let par = Qr::with_parallelism(&a, QrMethod::Thin, Parallelism::None).unwrap();
        assert_eq!(seq.r(), par.r());
        assert_eq!(seq.q(), par.q());
    }

    #[test]
    fn solve_square_system() {
        let a = DenseMatrix::from_rows(3, 3, &[2.0, 1.0, 1.0, 1.0, 3.0, 2.0, 1.0, 0.0, 0.0]);
        let qr = Qr::new(&Matrix::Dense(a.clone()), QrMethod::Full).unwrap();
        let b = Matrix::dense_from_rows(3, 1, &[4.0, 5.0, 6.0]);
        let x = qr.solve(&b).unwrap();
        assert_matrix_near(&(&a * &x), &b.to_dense(), TOL, "A x = b");
    }
}
