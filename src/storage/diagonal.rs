use crate::error::{LinalgError, Result};
use crate::storage::{DenseMatrix, StorageKind};
use crate::traits::{FloatScalar, Scalar};

/// Diagonal matrix storing only its `min(nrows, ncols)` diagonal entries.
///
/// Off-diagonal entries are implicitly zero. Writing a non-zero, non-NaN
/// value off the diagonal is rejected.
///
/// ```
/// use polymat::DiagonalStorage;
///
/// let d = DiagonalStorage::from_diagonal(3, 3, &[2.0_f64, 4.0, 5.0]);
/// let inv = d.inverse().unwrap();
/// assert_eq!(inv.diagonal(), &[0.5, 0.25, 0.2]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalStorage<T> {
    diag: Vec<T>,
    nrows: usize,
    ncols: usize,
}

impl<T: Scalar> DiagonalStorage<T> {
    /// All-zero `nrows x ncols` diagonal matrix.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        assert!(
            nrows >= 1 && ncols >= 1,
            "matrix dimensions must be at least 1x1, got {}x{}",
            nrows,
            ncols
        );
        Self {
            diag: vec![T::zero(); nrows.min(ncols)],
            nrows,
            ncols,
        }
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Self {
        let mut d = Self::new(n, n);
        d.diag.iter_mut().for_each(|x| *x = T::one());
        d
    }

    /// Build from the diagonal entries.
    ///
    /// Panics if `diag.len() != min(nrows, ncols)`.
    pub fn from_diagonal(nrows: usize, ncols: usize, diag: &[T]) -> Self {
        let mut d = Self::new(nrows, ncols);
        assert_eq!(
            diag.len(),
            d.diag.len(),
            "diagonal length {} does not match {}x{} matrix",
            diag.len(),
            nrows,
            ncols
        );
        d.diag.copy_from_slice(diag);
        d
    }

    /// Build by calling `f(i)` for each diagonal index.
    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize) -> T) -> Self {
        let mut d = Self::new(nrows, ncols);
        for (i, x) in d.diag.iter_mut().enumerate() {
            *x = f(i);
        }
        d
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// The stored diagonal.
    #[inline]
    pub fn diagonal(&self) -> &[T] {
        &self.diag
    }

    /// Mutable access to the stored diagonal.
    #[inline]
    pub fn diagonal_mut(&mut self) -> &mut [T] {
        &mut self.diag
    }

    /// Element at `(row, col)`.
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(row < self.nrows && col < self.ncols, "index out of bounds");
        if row == col {
            self.diag[row]
        } else {
            T::zero()
        }
    }

    /// Set element `(row, col)`.
    ///
    /// Off-diagonal writes of zero or NaN are accepted and dropped; anything
    /// else fails with [`LinalgError::Unsupported`].
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        assert!(row < self.nrows && col < self.ncols, "index out of bounds");
        if row == col {
            self.diag[row] = value;
            Ok(())
        } else if Self::is_storable_off_diagonal(value) {
            Ok(())
        } else {
            Err(LinalgError::unsupported(
                StorageKind::Diagonal,
                "set off-diagonal element",
            ))
        }
    }

    /// Whether `value` may be written off the diagonal.
    #[inline]
    pub(crate) fn is_storable_off_diagonal(value: T) -> bool {
        // NaN is the only value not equal to itself
        #[allow(clippy::eq_op)]
        let is_nan = value != value;
        value == T::zero() || is_nan
    }

    /// Expand into a dense matrix.
    pub fn to_dense(&self) -> DenseMatrix<T> {
        let mut out = DenseMatrix::zeros(self.nrows, self.ncols);
        for (i, &d) in self.diag.iter().enumerate() {
            out[(i, i)] = d;
        }
        out
    }

    /// Transposed copy (same diagonal, swapped shape).
    pub fn transpose(&self) -> Self {
        Self {
            diag: self.diag.clone(),
            nrows: self.ncols,
            ncols: self.nrows,
        }
    }

    /// `y = D * x`.
    pub fn mul_dense_vector(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols, "vector length mismatch");
        assert_eq!(y.len(), self.nrows, "result length mismatch");
        y.iter_mut().for_each(|v| *v = T::zero());
        for (i, &d) in self.diag.iter().enumerate() {
            y[i] = d * x[i];
        }
    }

    /// Apply `f` to each pair of diagonal entries.
    pub(crate) fn zip_with(&self, other: &Self, f: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!((self.nrows, self.ncols), (other.nrows, other.ncols));
        Self {
            diag: self
                .diag
                .iter()
                .zip(&other.diag)
                .map(|(&a, &b)| f(a, b))
                .collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }

    /// Product of two diagonal matrices (`self.ncols == other.nrows`).
    ///
    /// Entry `i` of the result is non-zero only while `i` is below the inner
    /// dimension; past it both factors are implicitly zero.
    pub fn matmul(&self, other: &Self) -> Self {
        assert_eq!(self.ncols, other.nrows, "dimension mismatch in diagonal matmul");
        let mut out = Self::new(self.nrows, other.ncols);
        let k = out.diag.len().min(self.diag.len()).min(other.diag.len());
        for i in 0..k {
            out.diag[i] = self.diag[i] * other.diag[i];
        }
        out
    }
}

impl<T: FloatScalar> DiagonalStorage<T> {
    /// Inverse of a square diagonal matrix.
    ///
    /// Fails with [`LinalgError::Singular`] if any diagonal entry is zero.
    pub fn inverse(&self) -> Result<Self> {
        if self.nrows != self.ncols {
            return Err(LinalgError::NotSquare {
                rows: self.nrows,
                cols: self.ncols,
            });
        }
        if self.diag.iter().any(|&d| d == T::zero()) {
            return Err(LinalgError::Singular);
        }
        Ok(Self {
            diag: self.diag.iter().map(|&d| T::one() / d).collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        })
    }

    /// Product of the diagonal entries (square matrices only).
    pub fn determinant(&self) -> Result<T> {
        if self.nrows != self.ncols {
            return Err(LinalgError::NotSquare {
                rows: self.nrows,
                cols: self.ncols,
            });
        }
        Ok(self.diag.iter().fold(T::one(), |acc, &d| acc * d))
    }
}
