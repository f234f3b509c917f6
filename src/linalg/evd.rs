use num_complex::Complex;

use crate::error::{LinalgError, Result};
use crate::kernel::{provider, FactorizationProvider, LinearAlgebraProvider};
use crate::linalg::{column_to_vector, dense_rhs, dense_rhs_vector, require_square, to_float};
use crate::matrix::Matrix;
use crate::storage::DenseMatrix;
use crate::traits::FloatScalar;
use crate::vector::{DenseVector, Vector};

/// Whether the caller already knows the input is symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Symmetricity {
    /// Test `A[i,j] == A[j,i]` exactly before choosing a path.
    #[default]
    Unknown,
    /// Skip the test and take the symmetric path.
    Symmetric,
    /// Skip the test and take the general path.
    Asymmetric,
}

// ── Evd ─────────────────────────────────────────────────────────────

/// Eigenvalue decomposition of a square matrix.
///
/// Symmetric input goes through Householder tridiagonalization and implicit
/// QL: eigenvalues are real, sorted ascending, and the eigenvector matrix is
/// orthogonal, so `A = V D V^T`.
///
/// General input goes through Hessenberg reduction and the double-shift QR
/// algorithm. A complex-conjugate pair `λ ± iμ` shows up as a 2x2 block
/// `[[λ, μ], [-μ, λ]]` in [`block_diagonal`](Self::block_diagonal), and
/// `A V = V D` holds with that real block-diagonal D.
///
/// # Example
///
/// ```
/// use polymat::Matrix;
///
/// let a = Matrix::dense_from_rows(2, 2, &[2.0_f64, 1.0, 1.0, 2.0]);
/// let evd = a.evd().unwrap();
/// let vals = evd.real_eigenvalues();
/// assert!((vals[0] - 1.0).abs() < 1e-12);
/// assert!((vals[1] - 3.0).abs() < 1e-12);
/// assert!((evd.determinant() - 3.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Evd<T> {
    eigenvalues: Vec<Complex<T>>,
    eigenvectors: DenseMatrix<T>,
    block_diagonal: DenseMatrix<T>,
    symmetric: bool,
}

impl<T: FloatScalar> Evd<T> {
    /// Decompose `a`, testing it for exact symmetry first.
    pub fn new(a: &Matrix<T>) -> Result<Self> {
        Self::with_symmetry(a, Symmetricity::Unknown)
    }

    /// Decompose `a` with a caller-supplied symmetry hint.
    pub fn with_symmetry(a: &Matrix<T>, symmetricity: Symmetricity) -> Result<Self> {
        let n = require_square(a)?;
        let symmetric = match symmetricity {
            Symmetricity::Unknown => a.is_symmetric(),
            Symmetricity::Symmetric => true,
            Symmetricity::Asymmetric => false,
        };
        log::trace!("evd: order {}, symmetric path: {}", n, symmetric);

        let input = a.to_dense();
        let mut eigenvectors = DenseMatrix::zeros(n, n);
        let mut block_diagonal = DenseMatrix::zeros(n, n);
        let mut eigenvalues = vec![Complex::new(T::zero(), T::zero()); n];
        provider().eigen_decomp(
            symmetric,
            n,
            input.as_slice(),
            eigenvectors.as_mut_slice(),
            &mut eigenvalues,
            block_diagonal.as_mut_slice(),
        )?;

        Ok(Self {
            eigenvalues,
            eigenvectors,
            block_diagonal,
            symmetric,
        })
    }

    /// Eigenvalues as complex numbers; imaginary parts are zero on the symmetric path.
    pub fn eigenvalues(&self) -> &[Complex<T>] {
        &self.eigenvalues
    }

    /// Real parts of the eigenvalues.
    pub fn real_eigenvalues(&self) -> Vec<T> {
        self.eigenvalues.iter().map(|c| c.re).collect()
    }

    /// Eigenvectors, one per column.
    pub fn eigenvectors(&self) -> &DenseMatrix<T> {
        &self.eigenvectors
    }

    /// Real block-diagonal eigenvalue matrix D.
    pub fn block_diagonal(&self) -> &DenseMatrix<T> {
        &self.block_diagonal
    }

    /// Whether the symmetric path was taken.
    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// Product of the eigenvalues (the imaginary parts cancel in conjugate pairs).
    pub fn determinant(&self) -> T {
        self.eigenvalues
            .iter()
            .fold(Complex::new(T::one(), T::zero()), |acc, &l| acc * l)
            .re
    }

    /// Number of eigenvalues whose magnitude exceeds `eps * n * max|λ|`.
    pub fn rank(&self) -> usize {
        let tol = self.default_tolerance();
        self.eigenvalues.iter().filter(|l| l.norm() > tol).count()
    }

    /// `eps * n * max|λ|`, the magnitude at or below which an eigenvalue counts as zero.
    pub fn default_tolerance(&self) -> T {
        let n = self.eigenvalues.len();
        let max = self
            .eigenvalues
            .iter()
            .fold(T::zero(), |acc, l| acc.max(l.norm()));
        T::epsilon() * to_float::<T>(n) * max
    }

    /// Solve `A X = B` as `X = V diag(1/λ) V^T B`. Symmetric decompositions only.
    pub fn solve(&self, b: &Matrix<T>) -> Result<DenseMatrix<T>> {
        let b = dense_rhs(b, self.eigenvalues.len())?;
        self.solve_dense(&b)
    }

    /// Solve `A x = b`. Symmetric decompositions only.
    pub fn solve_vector(&self, b: &Vector<T>) -> Result<DenseVector<T>> {
        let b = dense_rhs_vector(b, self.eigenvalues.len())?;
        self.solve_dense(&b).map(column_to_vector)
    }

    /// `A^-1 = V diag(1/λ) V^T`. Symmetric decompositions only.
    pub fn inverse(&self) -> Result<DenseMatrix<T>> {
        self.solve_dense(&DenseMatrix::eye(self.eigenvalues.len()))
    }

    fn solve_dense(&self, b: &DenseMatrix<T>) -> Result<DenseMatrix<T>> {
        if !self.symmetric {
            return Err(LinalgError::NotSymmetric);
        }
        let tol = self.default_tolerance();
        if self.eigenvalues.iter().any(|l| l.re.abs() <= tol) {
            return Err(LinalgError::Singular);
        }
        let n = self.eigenvalues.len();
        let v = &self.eigenvectors;
        let mut x = DenseMatrix::zeros(n, b.ncols());
        let mut tmp = vec![T::zero(); n];
        for c in 0..b.ncols() {
            let b_col = b.col(c);
            for (j, t) in tmp.iter_mut().enumerate() {
                *t = provider().dot_product(v.col(j), b_col) / self.eigenvalues[j].re;
            }
            for i in 0..n {
                let mut sum = T::zero();
                for (j, &t) in tmp.iter().enumerate() {
                    sum = sum + v[(i, j)] * t;
                }
                x[(i, c)] = sum;
            }
        }
        Ok(x)
    }
}
