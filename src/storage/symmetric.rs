use crate::error::{LinalgError, Result};
use crate::storage::DenseMatrix;
use crate::traits::Scalar;

/// Symmetric `n x n` matrix stored as its packed upper triangle.
///
/// Element `(i, j)` with `i <= j` lives at `j * (j + 1) / 2 + i`, so `(i, j)`
/// and `(j, i)` share one cell and a single write updates both.
///
/// ```
/// use polymat::SymmetricPacked;
///
/// let mut s = SymmetricPacked::<f64>::new(3);
/// s.set(0, 2, 7.0);
/// assert_eq!(s.get(2, 0), 7.0);
/// assert_eq!(s.packed().len(), 6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricPacked<T> {
    data: Vec<T>,
    n: usize,
}

#[inline]
fn packed_index(i: usize, j: usize) -> usize {
    let (r, c) = if i <= j { (i, j) } else { (j, i) };
    c * (c + 1) / 2 + r
}

impl<T: Scalar> SymmetricPacked<T> {
    /// All-zero `n x n` symmetric matrix.
    pub fn new(n: usize) -> Self {
        assert!(n >= 1, "matrix dimensions must be at least 1x1, got {}x{}", n, n);
        Self {
            data: vec![T::zero(); n * (n + 1) / 2],
            n,
        }
    }

    /// Build by calling `f(i, j)` for each `i <= j`.
    pub fn from_fn(n: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut s = Self::new(n);
        for j in 0..n {
            for i in 0..=j {
                s.data[packed_index(i, j)] = f(i, j);
            }
        }
        s
    }

    /// Pack a dense matrix, failing if it is not square and exactly symmetric.
    pub fn from_dense(dense: &DenseMatrix<T>) -> Result<Self> {
        if !dense.is_square() {
            return Err(LinalgError::NotSquare {
                rows: dense.nrows(),
                cols: dense.ncols(),
            });
        }
        let n = dense.nrows();
        for j in 0..n {
            for i in 0..j {
                if !mirrored_equal(dense[(i, j)], dense[(j, i)]) {
                    return Err(LinalgError::NotSymmetric);
                }
            }
        }
        Ok(Self::from_fn(n, |i, j| dense[(i, j)]))
    }

    /// Order of the matrix.
    #[inline]
    pub fn order(&self) -> usize {
        self.n
    }

    /// Packed upper-triangle storage.
    #[inline]
    pub fn packed(&self) -> &[T] {
        &self.data
    }

    /// Element at `(row, col)`.
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(row < self.n && col < self.n, "index out of bounds");
        self.data[packed_index(row, col)]
    }

    /// Set `(row, col)` and `(col, row)` together.
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(row < self.n && col < self.n, "index out of bounds");
        self.data[packed_index(row, col)] = value;
    }

    /// Expand into a dense matrix.
    pub fn to_dense(&self) -> DenseMatrix<T> {
        DenseMatrix::from_fn(self.n, self.n, |i, j| self.data[packed_index(i, j)])
    }

    /// Apply `f` cell by cell to two packed matrices of the same order.
    pub(crate) fn zip_with(&self, other: &Self, f: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!(self.n, other.n);
        Self {
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
            n: self.n,
        }
    }

    pub(crate) fn packed_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// `y = S * x`, reading each packed cell once.
    pub fn mul_dense_vector(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.n, "vector length mismatch");
        assert_eq!(y.len(), self.n, "result length mismatch");
        y.iter_mut().for_each(|v| *v = T::zero());
        for j in 0..self.n {
            let base = j * (j + 1) / 2;
            for i in 0..j {
                let a = self.data[base + i];
                y[i] = y[i] + a * x[j];
                y[j] = y[j] + a * x[i];
            }
            y[j] = y[j] + self.data[base + j] * x[j];
        }
    }
}

/// Whether two mirrored entries may share one packed cell: equal, or both NaN.
#[inline]
pub(crate) fn mirrored_equal<T: Scalar>(a: T, b: T) -> bool {
    // NaN is the only value not equal to itself
    #[allow(clippy::eq_op)]
    let both_nan = a != a && b != b;
    a == b || both_nan
}
