use core::ops::{Add, Index, IndexMut, Mul, Neg, Sub};

use crate::kernel::{provider, LinearAlgebraProvider};
use crate::traits::{MatrixMut, MatrixRef, Scalar};

/// Dense heap-allocated matrix.
///
/// Column-major `Vec<T>` storage. Implements [`MatrixRef`] and [`MatrixMut`],
/// so all the in-place factorization kernels work with `DenseMatrix` directly.
///
/// # Examples
///
/// ```
/// use polymat::DenseMatrix;
///
/// let a = DenseMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
/// assert_eq!(a[(0, 1)], 2.0);
/// assert_eq!(a.nrows(), 2);
/// assert_eq!(a.ncols(), 2);
///
/// let b = DenseMatrix::<f64>::eye(3);
/// assert_eq!(b[(0, 0)], 1.0);
/// assert_eq!(b[(0, 1)], 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
}

#[inline]
fn check_shape(nrows: usize, ncols: usize) {
    assert!(
        nrows >= 1 && ncols >= 1,
        "matrix dimensions must be at least 1x1, got {}x{}",
        nrows,
        ncols
    );
}

// ── Constructors ────────────────────────────────────────────────────

impl<T: Scalar> DenseMatrix<T> {
    /// Create an `nrows x ncols` matrix of zeros.
    ///
    /// ```
    /// use polymat::DenseMatrix;
    /// let m = DenseMatrix::<f64>::zeros(2, 3);
    /// assert_eq!(m.nrows(), 2);
    /// assert_eq!(m.ncols(), 3);
    /// assert_eq!(m[(1, 2)], 0.0);
    /// ```
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::fill(nrows, ncols, T::zero())
    }

    /// Create a matrix filled with a given value.
    pub fn fill(nrows: usize, ncols: usize, value: T) -> Self {
        check_shape(nrows, ncols);
        Self {
            data: vec![value; nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Create an `n x n` identity matrix.
    pub fn eye(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = T::one();
        }
        m
    }

    /// Create a matrix from a flat slice in column-major order.
    ///
    /// Panics if `slice.len() != nrows * ncols`.
    ///
    /// ```
    /// use polymat::DenseMatrix;
    /// // Column-major: col0=[1,3], col1=[2,4]
    /// let m = DenseMatrix::from_slice(2, 2, &[1.0, 3.0, 2.0, 4.0]);
    /// assert_eq!(m[(1, 0)], 3.0);
    /// assert_eq!(m[(0, 1)], 2.0);
    /// ```
    pub fn from_slice(nrows: usize, ncols: usize, slice: &[T]) -> Self {
        Self::from_vec(nrows, ncols, slice.to_vec())
    }

    /// Create a matrix from a flat slice in row-major order.
    ///
    /// Transposes the data to column-major internal storage.
    ///
    /// ```
    /// use polymat::DenseMatrix;
    /// let m = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    /// assert_eq!(m[(0, 2)], 3.0);
    /// assert_eq!(m[(1, 0)], 4.0);
    /// ```
    pub fn from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Self {
        check_shape(nrows, ncols);
        assert_eq!(
            row_major.len(),
            nrows * ncols,
            "slice length {} does not match {}x{} matrix",
            row_major.len(),
            nrows,
            ncols,
        );
        let mut data = vec![T::zero(); nrows * ncols];
        for i in 0..nrows {
            for j in 0..ncols {
                data[j * nrows + i] = row_major[i * ncols + j];
            }
        }
        Self { data, nrows, ncols }
    }

    /// Create a matrix from an owned `Vec<T>` in column-major order.
    ///
    /// Panics if `data.len() != nrows * ncols`.
    pub fn from_vec(nrows: usize, ncols: usize, data: Vec<T>) -> Self {
        check_shape(nrows, ncols);
        assert_eq!(
            data.len(),
            nrows * ncols,
            "vec length {} does not match {}x{} matrix",
            data.len(),
            nrows,
            ncols,
        );
        Self { data, nrows, ncols }
    }

    /// Create a matrix by calling `f(row, col)` for each element.
    ///
    /// ```
    /// use polymat::DenseMatrix;
    /// let m = DenseMatrix::from_fn(3, 3, |i, j| if i == j { 1.0_f64 } else { 0.0 });
    /// assert_eq!(m[(0, 0)], 1.0);
    /// assert_eq!(m[(0, 1)], 0.0);
    /// ```
    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        check_shape(nrows, ncols);
        let mut data = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }

    /// Create a diagonal matrix from a slice of diagonal entries.
    pub fn from_diag(diag: &[T]) -> Self {
        let n = diag.len();
        let mut m = Self::zeros(n, n);
        for (i, &d) in diag.iter().enumerate() {
            m[(i, i)] = d;
        }
        m
    }
}

impl<T> DenseMatrix<T> {
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

    /// Whether the matrix is square.
    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Column-major backing storage.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable column-major backing storage.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the matrix, returning its column-major data.
    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Column `j` as a contiguous slice.
    #[inline]
    pub fn col(&self, j: usize) -> &[T] {
        &self.data[j * self.nrows..(j + 1) * self.nrows]
    }
}

impl<T: Scalar> DenseMatrix<T> {
    /// Row `i`, copied out.
    pub fn row(&self, i: usize) -> Vec<T> {
        (0..self.ncols).map(|j| self[(i, j)]).collect()
    }

    /// Transposed copy.
    pub fn transpose(&self) -> Self {
        Self::from_fn(self.ncols, self.nrows, |i, j| self[(j, i)])
    }

    /// Swap two rows in place.
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for j in 0..self.ncols {
            self.data.swap(j * self.nrows + a, j * self.nrows + b);
        }
    }

    /// Sum of the diagonal entries.
    pub fn trace(&self) -> T {
        let n = self.nrows.min(self.ncols);
        (0..n).fold(T::zero(), |acc, i| acc + self[(i, i)])
    }

    /// Matrix-vector product `A * x`.
    ///
    /// Panics if `x.len() != ncols`.
    pub fn mul_slice(&self, x: &[T]) -> Vec<T> {
        assert_eq!(x.len(), self.ncols, "vector length mismatch");
        let mut out = vec![T::zero(); self.nrows];
        provider().matrix_multiply(&self.data, self.nrows, self.ncols, x, 1, &mut out);
        out
    }

    /// Overwrite every element with zero.
    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|x| *x = T::zero());
    }
}

// ── MatrixRef / MatrixMut ───────────────────────────────────────────

impl<T> MatrixRef<T> for DenseMatrix<T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> &T {
        &self.data[col * self.nrows + row]
    }

    #[inline]
    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T] {
        let start = col * self.nrows + row_start;
        let end = col * self.nrows + self.nrows;
        &self.data[start..end]
    }
}

impl<T> MatrixMut<T> for DenseMatrix<T> {
    #[inline]
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        &mut self.data[col * self.nrows + row]
    }

    #[inline]
    fn col_as_mut_slice(&mut self, col: usize, row_start: usize) -> &mut [T] {
        let start = col * self.nrows + row_start;
        let end = col * self.nrows + self.nrows;
        &mut self.data[start..end]
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

// ── Index ───────────────────────────────────────────────────────────

impl<T> Index<(usize, usize)> for DenseMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.data[col * self.nrows + row]
    }
}

impl<T> IndexMut<(usize, usize)> for DenseMatrix<T> {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        &mut self.data[col * self.nrows + row]
    }
}

// ── Operators ───────────────────────────────────────────────────────
//
// These panic on shape mismatch. The fallible, storage-polymorphic
// versions live on `Matrix`.

impl<T: Scalar> Add<&DenseMatrix<T>> for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn add(self, rhs: &DenseMatrix<T>) -> DenseMatrix<T> {
        assert_eq!(
            (self.nrows, self.ncols),
            (rhs.nrows, rhs.ncols),
            "dimension mismatch in add"
        );
        let mut out = DenseMatrix::zeros(self.nrows, self.ncols);
        provider().add_arrays(&self.data, &rhs.data, &mut out.data);
        out
    }
}

impl<T: Scalar> Sub<&DenseMatrix<T>> for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn sub(self, rhs: &DenseMatrix<T>) -> DenseMatrix<T> {
        assert_eq!(
            (self.nrows, self.ncols),
            (rhs.nrows, rhs.ncols),
            "dimension mismatch in sub"
        );
        let mut out = DenseMatrix::zeros(self.nrows, self.ncols);
        provider().subtract_arrays(&self.data, &rhs.data, &mut out.data);
        out
    }
}

impl<T: Scalar> Mul<&DenseMatrix<T>> for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn mul(self, rhs: &DenseMatrix<T>) -> DenseMatrix<T> {
        assert_eq!(
            self.ncols, rhs.nrows,
            "dimension mismatch: {}x{} * {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        let mut out = DenseMatrix::zeros(self.nrows, rhs.ncols);
        provider().matrix_multiply(
            &self.data,
            self.nrows,
            self.ncols,
            &rhs.data,
            rhs.ncols,
            &mut out.data,
        );
        out
    }
}

impl<T: Scalar> Mul<T> for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn mul(self, rhs: T) -> DenseMatrix<T> {
        let mut out = DenseMatrix::zeros(self.nrows, self.ncols);
        provider().scale_array(rhs, &self.data, &mut out.data);
        out
    }
}

impl<T: Scalar> Neg for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn neg(self) -> DenseMatrix<T> {
        self * (T::zero() - T::one())
    }
}

// ── Borrowed views ──────────────────────────────────────────────────

/// Read-only column-major view over a caller-owned slice.
#[derive(Debug, Clone, Copy)]
pub struct DenseView<'a, T> {
    data: &'a [T],
    nrows: usize,
    ncols: usize,
}

impl<'a, T> DenseView<'a, T> {
    /// Wrap `data` (column-major) as an `nrows x ncols` matrix.
    ///
    /// Panics if `data.len() != nrows * ncols`.
    pub fn new(data: &'a [T], nrows: usize, ncols: usize) -> Self {
        assert_eq!(data.len(), nrows * ncols, "view length does not match shape");
        Self { data, nrows, ncols }
    }
}

impl<T> MatrixRef<T> for DenseView<'_, T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> &T {
        &self.data[col * self.nrows + row]
    }

    #[inline]
    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T] {
        &self.data[col * self.nrows + row_start..(col + 1) * self.nrows]
    }
}

/// Mutable column-major view bound directly to a caller-owned slice.
///
/// No copy is made: writes through the view land in the caller's buffer,
/// and the buffer cannot be touched by anyone else while the view lives.
/// This is the zero-copy counterpart of [`DenseMatrix`], which always owns
/// a private copy of its data.
///
/// ```
/// use polymat::DenseViewMut;
/// use polymat::linalg::cholesky_in_place;
/// use polymat::parallel::Parallelism;
///
/// // [[4, 2], [2, 3]] in column-major order
/// let mut buf = [4.0_f64, 2.0, 2.0, 3.0];
/// {
///     let mut view = DenseViewMut::new(&mut buf, 2, 2);
///     cholesky_in_place(&mut view, Parallelism::None).unwrap();
/// }
/// assert_eq!(buf[0], 2.0);
/// assert_eq!(buf[1], 1.0);
/// ```
#[derive(Debug)]
pub struct DenseViewMut<'a, T> {
    data: &'a mut [T],
    nrows: usize,
    ncols: usize,
}

impl<'a, T> DenseViewMut<'a, T> {
    /// Bind `data` (column-major) as an `nrows x ncols` matrix.
    ///
    /// Panics if `data.len() != nrows * ncols`.
    pub fn new(data: &'a mut [T], nrows: usize, ncols: usize) -> Self {
        assert_eq!(data.len(), nrows * ncols, "view length does not match shape");
        Self { data, nrows, ncols }
    }
}

impl<T: Scalar> DenseViewMut<'_, T> {
    /// Copy the viewed data into an owned matrix.
    pub fn to_owned(&self) -> DenseMatrix<T> {
        DenseMatrix::from_slice(self.nrows, self.ncols, self.data)
    }
}

impl<T> MatrixRef<T> for DenseViewMut<'_, T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> &T {
        &self.data[col * self.nrows + row]
    }

    #[inline]
    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T] {
        &self.data[col * self.nrows + row_start..(col + 1) * self.nrows]
    }
}

impl<T> MatrixMut<T> for DenseViewMut<'_, T> {
    #[inline]
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        &mut self.data[col * self.nrows + row]
    }

    #[inline]
    fn col_as_mut_slice(&mut self, col: usize, row_start: usize) -> &mut [T] {
        &mut self.data[col * self.nrows + row_start..(col + 1) * self.nrows]
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros() {
        let m = DenseMatrix::<f64>::zeros(3, 4);
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 4);
        assert!(m.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn from_rows_is_column_major() {
        let m = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(m.row(1), vec![4.0, 5.0, 6.0]);
        assert_eq!(m.col(2), &[3.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "slice length")]
    fn from_rows_wrong_length() {
        DenseMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "at least 1x1")]
    fn empty_matrix_rejected() {
        DenseMatrix::<f64>::zeros(0, 3);
    }

    #[test]
    fn matmul_and_transpose() {
        let a = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = DenseMatrix::from_rows(3, 2, &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let c = &a * &b;
        assert_eq!(c, DenseMatrix::from_rows(2, 2, &[58.0, 64.0, 139.0, 154.0]));
        assert_eq!(a.transpose()[(2, 1)], 6.0);
        assert_eq!(a.mul_slice(&[1.0, 1.0, 1.0]), vec![6.0, 15.0]);
    }

    #[test]
    fn add_sub_neg() {
        let a = DenseMatrix::from_rows(2, 2, &[1, 2, 3, 4]);
        let b = DenseMatrix::from_rows(2, 2, &[4, 3, 2, 1]);
        assert_eq!(&a + &b, DenseMatrix::fill(2, 2, 5));
        assert_eq!((&a - &a), DenseMatrix::zeros(2, 2));
        assert_eq!((-&a)[(1, 1)], -4);
    }

    #[test]
    fn swap_rows_and_trace() {
        let mut m = DenseMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        m.swap_rows(0, 1);
        assert_eq!(m.row(0), vec![3.0, 4.0]);
        assert_eq!(m.trace(), 5.0);
    }

    #[test]
    fn view_mut_writes_through() {
        let mut buf = vec![0.0_f64; 6];
        {
            let mut v = DenseViewMut::new(&mut buf, 2, 3);
            *v.get_mut(1, 2) = 9.0;
            v.col_as_mut_slice(0, 0)[0] = 1.0;
            assert_eq!(v.to_owned()[(1, 2)], 9.0);
        }
        assert_eq!(buf[5], 9.0);
        assert_eq!(buf[0], 1.0);
    }
}
