use core::ops::{Index, IndexMut};

use crate::traits::{MatrixMut, MatrixRef, Scalar};

/// Owned dense vector.
///
/// # Examples
///
/// ```
/// use polymat::DenseVector;
///
/// let v = DenseVector::from_slice(&[1.0_f64, 2.0, 3.0]);
/// assert_eq!(v[1], 2.0);
/// assert_eq!(v.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DenseVector<T> {
    data: Vec<T>,
}

impl<T: Scalar> DenseVector<T> {
    /// Zero vector of length `n`.
    pub fn zeros(n: usize) -> Self {
        Self::from_vec(vec![T::zero(); n])
    }

    /// Copy a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Build by calling `f(i)` for each index.
    pub fn from_fn(n: usize, f: impl Fn(usize) -> T) -> Self {
        Self::from_vec((0..n).map(f).collect())
    }
}

impl<T> DenseVector<T> {
    /// Take ownership of a `Vec`.
    ///
    /// Panics if `data` is empty.
    pub fn from_vec(data: Vec<T>) -> Self {
        assert!(!data.is_empty(), "vector length must be at least 1");
        Self { data }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the vector is empty (never true for a constructed vector).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// View the data as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// View the data as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume into the backing `Vec`.
    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

// ── Index ───────────────────────────────────────────────────────────

impl<T> Index<usize> for DenseVector<T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> IndexMut<usize> for DenseVector<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

// ── MatrixRef / MatrixMut ───────────────────────────────────────────

/// A dense vector reads as an `n x 1` column.
impl<T> MatrixRef<T> for DenseVector<T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn ncols(&self) -> usize {
        1
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> &T {
        debug_assert_eq!(col, 0);
        &self.data[row]
    }

    #[inline]
    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T] {
        debug_assert_eq!(col, 0);
        &self.data[row_start..]
    }
}

impl<T> MatrixMut<T> for DenseVector<T> {
    #[inline]
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        debug_assert_eq!(col, 0);
        &mut self.data[row]
    }

    #[inline]
    fn col_as_mut_slice(&mut self, col: usize, row_start: usize) -> &mut [T] {
        debug_assert_eq!(col, 0);
        &mut self.data[row_start..]
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
