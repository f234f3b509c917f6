use crate::error::{LinalgError, Result};
use crate::kernel::{provider, FactorizationProvider};
use crate::linalg::{column_to_vector, dense_rhs, dense_rhs_vector, require_square};
use crate::matrix::Matrix;
use crate::storage::DenseMatrix;
use crate::traits::{FloatScalar, MatrixMut, MatrixRef};
use crate::vector::{DenseVector, Vector};

/// LU decomposition with partial pivoting, in place.
///
/// Left-looking (Crout/Doolittle) elimination: column `j` first receives the
/// multipliers of every earlier column, then the largest remaining entry in
/// rows `j..n` is swapped onto the diagonal, then the multipliers for column
/// `j` are formed.
///
/// On return, `a` contains both L and U packed together:
/// - Upper triangle (including diagonal): U
/// - Lower triangle (excluding diagonal): L (diagonal of L is implicitly 1)
///
/// `pivots[j]` is the row that was swapped with row `j` at step `j`
/// (`pivots[j] == j` when no swap happened). Returns the number of swaps.
///
/// Fails with [`LinalgError::Singular`] as soon as a pivot is exactly zero.
pub fn lu_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    pivots: &mut [usize],
) -> Result<usize> {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "LU decomposition requires a square matrix");
    assert_eq!(n, pivots.len(), "pivot slice length must match matrix size");

    let mut swaps = 0;
    let mut col_j = vec![T::zero(); n];

    for j in 0..n {
        col_j.copy_from_slice(a.col_as_slice(j, 0));

        // Apply previous transformations to column j
        for i in 0..n {
            let kmax = i.min(j);
            let mut s = T::zero();
            for k in 0..kmax {
                s = s + *a.get(i, k) * col_j[k];
            }
            col_j[i] = col_j[i] - s;
            *a.get_mut(i, j) = col_j[i];
        }

        // Partial pivoting: find row with largest magnitude in rows j..n
        let mut p = j;
        for i in (j + 1)..n {
            if col_j[i].abs() > col_j[p].abs() {
                p = i;
            }
        }
        pivots[j] = p;

        if p != j {
            for k in 0..n {
                let tmp = *a.get(p, k);
                *a.get_mut(p, k) = *a.get(j, k);
                *a.get_mut(j, k) = tmp;
            }
            swaps += 1;
        }

        let pivot = *a.get(j, j);
        if pivot == T::zero() {
            return Err(LinalgError::Singular);
        }

        for x in a.col_as_mut_slice(j, j + 1) {
            *x = *x / pivot;
        }
    }

    Ok(swaps)
}

/// Solve `A X = B` in place given the packed factors from [`lu_in_place`].
///
/// Each column of `b` has the recorded row swaps applied, then goes through
/// forward substitution with unit-lower L and back substitution with U.
pub fn lu_solve_in_place<T: FloatScalar>(
    lu: &impl MatrixRef<T>,
    pivots: &[usize],
    b: &mut impl MatrixMut<T>,
) {
    let n = lu.nrows();
    assert_eq!(b.nrows(), n, "rhs row count mismatch");

    for c in 0..b.ncols() {
        let x = b.col_as_mut_slice(c, 0);

        for (i, &p) in pivots.iter().enumerate() {
            if p != i {
                x.swap(i, p);
            }
        }

        // Forward substitution (solve Ly = Pb)
        for i in 0..n {
            let mut sum = x[i];
            for k in 0..i {
                sum = sum - *lu.get(i, k) * x[k];
            }
            x[i] = sum;
        }

        // Back substitution (solve Ux = y)
        for i in (0..n).rev() {
            let mut sum = x[i];
            for k in (i + 1)..n {
                sum = sum - *lu.get(i, k) * x[k];
            }
            x[i] = sum / *lu.get(i, i);
        }
    }
}

// ── Lu ──────────────────────────────────────────────────────────────

/// LU decomposition with partial pivoting of a square matrix.
///
/// Stores the packed L/U factors and the pivot sequence.
///
/// # Example
///
/// ```
/// use polymat::{Matrix, Vector};
///
/// let a = Matrix::dense_from_rows(2, 2, &[2.0_f64, 1.0, 5.0, 3.0]);
/// let lu = a.lu().unwrap();
///
/// let b = Vector::dense_from_slice(&[4.0, 11.0]);
/// let x = lu.solve_vector(&b).unwrap();
/// assert!((x[0] - 1.0).abs() < 1e-12);
/// assert!((x[1] - 2.0).abs() < 1e-12);
/// assert!((lu.determinant() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Lu<T> {
    factors: DenseMatrix<T>,
    pivots: Vec<usize>,
    swaps: usize,
}

impl<T: FloatScalar> Lu<T> {
    /// Factor a square matrix of any storage kind.
    ///
    /// Fails with [`LinalgError::NotSquare`] for rectangular input and
    /// [`LinalgError::Singular`] if a pivot is exactly zero.
    pub fn new(a: &Matrix<T>) -> Result<Self> {
        let n = require_square(a)?;
        let mut factors = a.to_dense();
        let mut pivots = vec![0usize; n];
        let swaps = provider().lu_factor(factors.as_mut_slice(), n, &mut pivots)?;
        Ok(Self {
            factors,
            pivots,
            swaps,
        })
    }

    /// Row swapped into position `j` at elimination step `j`.
    pub fn pivots(&self) -> &[usize] {
        &self.pivots
    }

    /// Row permutation: row `i` of `P A` is row `permutation()[i]` of `A`.
    pub fn permutation(&self) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..self.pivots.len()).collect();
        for (i, &p) in self.pivots.iter().enumerate() {
            perm.swap(i, p);
        }
        perm
    }

    /// Unit lower-triangular factor L.
    pub fn l(&self) -> DenseMatrix<T> {
        let n = self.factors.nrows();
        DenseMatrix::from_fn(n, n, |i, j| {
            if i == j {
                T::one()
            } else if i > j {
                self.factors[(i, j)]
            } else {
                T::zero()
            }
        })
    }

    /// Upper-triangular factor U.
    pub fn u(&self) -> DenseMatrix<T> {
        let n = self.factors.nrows();
        DenseMatrix::from_fn(n, n, |i, j| if i <= j { self.factors[(i, j)] } else { T::zero() })
    }

    /// Determinant: product of U's diagonal, sign-flipped once per swap.
    pub fn determinant(&self) -> T {
        let n = self.factors.nrows();
        let mut d = if self.swaps % 2 == 0 {
            T::one()
        } else {
            -T::one()
        };
        for i in 0..n {
            d = d * self.factors[(i, i)];
        }
        d
    }

    /// Solve `A X = B` for every column of `B`.
    pub fn solve(&self, b: &Matrix<T>) -> Result<DenseMatrix<T>> {
        let n = self.factors.nrows();
        let mut x = dense_rhs(b, n)?;
        let cols = x.ncols();
        provider().lu_solve_factored(self.factors.as_slice(), n, &self.pivots, x.as_mut_slice(), cols);
        Ok(x)
    }

    /// Solve `A x = b`.
    pub fn solve_vector(&self, b: &Vector<T>) -> Result<DenseVector<T>> {
        let n = self.factors.nrows();
        let mut x = dense_rhs_vector(b, n)?;
        provider().lu_solve_factored(self.factors.as_slice(), n, &self.pivots, x.as_mut_slice(), 1);
        Ok(column_to_vector(x))
    }

    /// Inverse, by solving against the identity.
    pub fn inverse(&self) -> DenseMatrix<T> {
        let n = self.factors.nrows();
        let mut inv = DenseMatrix::eye(n);
        provider().lu_solve_factored(self.factors.as_slice(), n, &self.pivots, inv.as_mut_slice(), n);
        inv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::test_util::{assert_matrix_near, assert_near};

    const TOL: f64 = 1e-10;

    #[test]
    fn antidiagonal_pivots() {
        let a = Matrix::dense_from_rows(2, 2, &[0.0_f64, 1.0, 1.0, 0.0]);
        let lu = Lu::new(&a).unwrap();
        assert_eq!(lu.pivots(), &[1, 1]);
        assert_eq!(lu.determinant(), -1.0);
        assert_eq!(lu.permutation(), vec![1, 0]);
    }

    #[test]
    fn reconstruct_permuted() {
        let a = DenseMatrix::from_rows(
            4,
            4,
            &[
                2.0, -1.0, 0.0, 3.0, //
                4.0, 1.0, -2.0, 1.0, //
                -6.0, 3.0, 5.0, 0.0, //
                1.0, 7.0, 2.0, -4.0,
            ],
        );
        let lu = Lu::new(&Matrix::Dense(a.clone())).unwrap();
        let product = &lu.l() * &lu.u();
        let perm = lu.permutation();
        let pa = DenseMatrix::from_fn(4, 4, |i, j| a[(perm[i], j)]);
        assert_matrix_near(&product, &pa, TOL, "PA = LU");
    }

    #[test]
    fn exactly_singular_fails_fast() {
        let a = Matrix::dense_from_rows(2, 2, &[1.0_f64, 2.0, 2.0, 4.0]);
        assert_eq!(Lu::new(&a).unwrap_err(), LinalgError::Singular);
    }

    #[test]
    fn rectangular_rejected() {
        let a = Matrix::<f64>::dense_zeros(2, 3);
        assert!(matches!(Lu::new(&a), Err(LinalgError::NotSquare { rows: 2, cols: 3 })));
    }

    #[test]
    fn solve_and_inverse() {
        let a = DenseMatrix::from_rows(3, 3, &[4.0, -2.0, 1.0, -2.0, 4.0, -2.0, 1.0, -2.0, 4.0]);
        let m = Matrix::Dense(a.clone());
        let lu = m.lu().unwrap();

        let b = Matrix::dense_from_rows(3, 2, &[11.0, 1.0, -16.0, 0.0, 17.0, 1.0]);
        let x = lu.solve(&b).unwrap();
        let ax = &a * &x;
        assert_matrix_near(&ax, &b.to_dense(), TOL, "A X = B");

        let inv = lu.inverse();
        assert_matrix_near(&(&a * &inv), &DenseMatrix::eye(3), TOL, "A A^-1 = I");

        assert_near(lu.determinant(), 36.0, TOL, "det");
    }

    #[test]
    fn solve_rhs_shape_checked() {
        let lu = Matrix::<f64>::dense_identity(3).lu().unwrap();
        let b = Vector::dense_from_slice(&[1.0, 2.0]);
        assert!(matches!(
            lu.solve_vector(&b),
            Err(LinalgError::DimensionMismatch { .. })
        ));
    }
}
