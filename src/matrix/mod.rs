//! The storage-polymorphic [`Matrix`].
//!
//! A `Matrix` is one of four storage kinds, fixed when it is built. Element
//! access, shape queries and structural edits work for every kind; binary
//! operations try a kind-specific fast path first and otherwise fall back
//! to the element-wise routines in [`fallback`].

mod dispatch;
pub mod fallback;

use crate::error::{LinalgError, Result};
use crate::kernel::{provider, LinearAlgebraProvider};
use crate::linalg::{Cholesky, Evd, GramSchmidt, Lu, Qr, QrMethod, Svd};
use crate::storage::{DenseMatrix, DiagonalStorage, SparseCompressedRow, StorageKind, SymmetricPacked};
use crate::traits::{FloatScalar, Scalar};
use crate::vector::DenseVector;

/// A matrix in one of the four storage kinds.
///
/// Every kind answers `at`/`set_at` for any index inside the shape, but not
/// every kind accepts every value: diagonal storage rejects non-zero
/// off-diagonal writes, and symmetric storage writes `(i, j)` and `(j, i)`
/// as one cell.
///
/// # Examples
///
/// ```
/// use polymat::{Matrix, StorageKind};
///
/// let a = Matrix::dense_from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
/// let d = Matrix::diagonal_from_slice(2, 2, &[10.0, 20.0]);
///
/// let sum = a.add(&d).unwrap();
/// assert_eq!(sum.kind(), StorageKind::Dense);
/// assert_eq!(sum.at(1, 1).unwrap(), 24.0);
///
/// let s = Matrix::sparse_from_rows(2, 2, &[0.0_f64, 1.0, 0.0, 0.0]);
/// assert_eq!(s.at(0, 1).unwrap(), 1.0);
/// assert!(s.at(2, 0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Matrix<T> {
    /// Column-major array of every element.
    Dense(DenseMatrix<T>),
    /// Compressed sparse row.
    Sparse(SparseCompressedRow<T>),
    /// Main diagonal only.
    Diagonal(DiagonalStorage<T>),
    /// Packed upper triangle.
    Symmetric(SymmetricPacked<T>),
}

// ── Constructors ────────────────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Dense `nrows x ncols` zero matrix.
    pub fn dense_zeros(nrows: usize, ncols: usize) -> Self {
        Matrix::Dense(DenseMatrix::zeros(nrows, ncols))
    }

    /// Dense `n x n` identity.
    pub fn dense_identity(n: usize) -> Self {
        Matrix::Dense(DenseMatrix::eye(n))
    }

    /// Dense matrix from a row-major slice.
    pub fn dense_from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Self {
        Matrix::Dense(DenseMatrix::from_rows(nrows, ncols, row_major))
    }

    /// Dense matrix from a column-major slice.
    pub fn dense_from_slice(nrows: usize, ncols: usize, col_major: &[T]) -> Self {
        Matrix::Dense(DenseMatrix::from_slice(nrows, ncols, col_major))
    }

    /// Dense matrix with `f(i, j)` at every cell.
    pub fn dense_from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        Matrix::Dense(DenseMatrix::from_fn(nrows, ncols, f))
    }

    /// Sparse matrix with no stored entries.
    pub fn sparse_zeros(nrows: usize, ncols: usize) -> Self {
        Matrix::Sparse(SparseCompressedRow::new(nrows, ncols))
    }

    /// Sparse matrix from a dense row-major slice, keeping the non-zeros.
    pub fn sparse_from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Self {
        Matrix::Sparse(SparseCompressedRow::from_rows(nrows, ncols, row_major))
    }

    /// Sparse matrix from `(row, col, value)` triplets; duplicates are summed.
    pub fn sparse_from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, T)]) -> Result<Self> {
        SparseCompressedRow::from_triplets(nrows, ncols, triplets).map(Matrix::Sparse)
    }

    /// Sparse matrix keeping the non-zero values of `f(i, j)`.
    pub fn sparse_from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        Matrix::Sparse(SparseCompressedRow::from_fn(nrows, ncols, f))
    }

    /// Diagonal `nrows x ncols` zero matrix.
    pub fn diagonal_zeros(nrows: usize, ncols: usize) -> Self {
        Matrix::Diagonal(DiagonalStorage::new(nrows, ncols))
    }

    /// Diagonal `n x n` identity.
    pub fn diagonal_identity(n: usize) -> Self {
        Matrix::Diagonal(DiagonalStorage::identity(n))
    }

    /// Diagonal matrix from its `min(nrows, ncols)` diagonal entries.
    pub fn diagonal_from_slice(nrows: usize, ncols: usize, diag: &[T]) -> Self {
        Matrix::Diagonal(DiagonalStorage::from_diagonal(nrows, ncols, diag))
    }

    /// Symmetric `n x n` zero matrix.
    pub fn symmetric_zeros(n: usize) -> Self {
        Matrix::Symmetric(SymmetricPacked::new(n))
    }

    /// Symmetric matrix from `f(i, j)`, evaluated for `i <= j` only.
    pub fn symmetric_from_fn(n: usize, f: impl Fn(usize, usize) -> T) -> Self {
        Matrix::Symmetric(SymmetricPacked::from_fn(n, f))
    }

    /// Symmetric matrix from a full row-major slice.
    ///
    /// Fails with [`LinalgError::NotSymmetric`] unless the slice is exactly
    /// symmetric.
    pub fn symmetric_from_rows(n: usize, row_major: &[T]) -> Result<Self> {
        SymmetricPacked::from_dense(&DenseMatrix::from_rows(n, n, row_major)).map(Matrix::Symmetric)
    }

    /// All-zero matrix of the given kind.
    ///
    /// Symmetric storage requires `nrows == ncols`.
    pub fn zeros_of_kind(kind: StorageKind, nrows: usize, ncols: usize) -> Result<Self> {
        Ok(match kind {
            StorageKind::Dense => Self::dense_zeros(nrows, ncols),
            StorageKind::Sparse => Self::sparse_zeros(nrows, ncols),
            StorageKind::Diagonal => Self::diagonal_zeros(nrows, ncols),
            StorageKind::Symmetric => {
                if nrows != ncols {
                    return Err(LinalgError::NotSquare { rows: nrows, cols: ncols });
                }
                Self::symmetric_zeros(nrows)
            }
        })
    }
}

// ── Borrowed buffers ────────────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Run `f` on a dense matrix backed by the caller's column-major buffer.
    ///
    /// The allocation is moved into the matrix for the duration of `f` and
    /// handed back afterwards, so writes made through the matrix land in
    /// `data` without a copy. If `f` replaces the matrix with another kind,
    /// its dense values are written back instead.
    ///
    /// Fails with [`LinalgError::InvalidArgument`] if `data.len()` is not
    /// `nrows * ncols`, and with [`LinalgError::DimensionMismatch`] if `f`
    /// leaves a matrix of a different shape. In the second case `data` still
    /// receives the final values.
    ///
    /// ```
    /// use polymat::Matrix;
    ///
    /// let mut buf = vec![1.0_f64, 3.0, 2.0, 4.0];
    /// let trace = Matrix::with_dense_view(&mut buf, 2, 2, |m| {
    ///     m.set_at(0, 1, 7.0).unwrap();
    ///     m.trace().unwrap()
    /// })
    /// .unwrap();
    /// assert_eq!(trace, 5.0);
    /// assert_eq!(buf, [1.0, 3.0, 7.0, 4.0]);
    /// ```
    pub fn with_dense_view<R>(
        data: &mut Vec<T>,
        nrows: usize,
        ncols: usize,
        f: impl FnOnce(&mut Matrix<T>) -> R,
    ) -> Result<R> {
        if nrows == 0 || ncols == 0 {
            return Err(LinalgError::InvalidArgument("matrix dimensions must be at least 1x1"));
        }
        if data.len() != nrows * ncols {
            return Err(LinalgError::InvalidArgument("buffer length must be nrows * ncols"));
        }
        let mut view = Matrix::Dense(DenseMatrix::from_vec(nrows, ncols, core::mem::take(data)));
        let out = f(&mut view);
        let shape = view.shape();
        *data = match view {
            Matrix::Dense(m) => m.into_vec(),
            other => other.to_dense().into_vec(),
        };
        if shape != (nrows, ncols) {
            return Err(LinalgError::mismatch((nrows, ncols), shape));
        }
        Ok(out)
    }
}

impl<T> From<DenseMatrix<T>> for Matrix<T> {
    fn from(m: DenseMatrix<T>) -> Self {
        Matrix::Dense(m)
    }
}

impl<T> From<SparseCompressedRow<T>> for Matrix<T> {
    fn from(m: SparseCompressedRow<T>) -> Self {
        Matrix::Sparse(m)
    }
}

impl<T> From<DiagonalStorage<T>> for Matrix<T> {
    fn from(m: DiagonalStorage<T>) -> Self {
        Matrix::Diagonal(m)
    }
}

impl<T> From<SymmetricPacked<T>> for Matrix<T> {
    fn from(m: SymmetricPacked<T>) -> Self {
        Matrix::Symmetric(m)
    }
}

// ── Shape and element access ────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Storage kind tag.
    #[inline]
    pub fn kind(&self) -> StorageKind {
        match self {
            Matrix::Dense(_) => StorageKind::Dense,
            Matrix::Sparse(_) => StorageKind::Sparse,
            Matrix::Diagonal(_) => StorageKind::Diagonal,
            Matrix::Symmetric(_) => StorageKind::Symmetric,
        }
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        match self {
            Matrix::Dense(m) => m.nrows(),
            Matrix::Sparse(m) => m.nrows(),
            Matrix::Diagonal(m) => m.nrows(),
            Matrix::Symmetric(m) => m.order(),
        }
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        match self {
            Matrix::Dense(m) => m.ncols(),
            Matrix::Sparse(m) => m.ncols(),
            Matrix::Diagonal(m) => m.ncols(),
            Matrix::Symmetric(m) => m.order(),
        }
    }

    /// `(nrows, ncols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// Whether `nrows == ncols`.
    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    /// Element `(i, j)` without a bounds check beyond the storage's own.
    #[inline]
    pub(crate) fn value(&self, i: usize, j: usize) -> T {
        match self {
            Matrix::Dense(m) => m[(i, j)],
            Matrix::Sparse(m) => m.get(i, j),
            Matrix::Diagonal(m) => m.get(i, j),
            Matrix::Symmetric(m) => m.get(i, j),
        }
    }

    fn check_index(&self, row: usize, col: usize) -> Result<()> {
        let (nrows, ncols) = self.shape();
        if row >= nrows || col >= ncols {
            return Err(LinalgError::IndexOutOfBounds { row, col, nrows, ncols });
        }
        Ok(())
    }

    /// Element `(i, j)`.
    pub fn at(&self, i: usize, j: usize) -> Result<T> {
        self.check_index(i, j)?;
        Ok(self.value(i, j))
    }

    /// Set element `(i, j)`.
    ///
    /// On symmetric storage this also sets `(j, i)`. On diagonal storage an
    /// off-diagonal write other than zero or NaN fails with
    /// [`LinalgError::Unsupported`].
    pub fn set_at(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        self.check_index(i, j)?;
        match self {
            Matrix::Dense(m) => m[(i, j)] = value,
            Matrix::Sparse(m) => m.set(i, j, value),
            Matrix::Diagonal(m) => m.set(i, j, value)?,
            Matrix::Symmetric(m) => m.set(i, j, value),
        }
        Ok(())
    }

    /// Dense copy.
    pub fn to_dense(&self) -> DenseMatrix<T> {
        match self {
            Matrix::Dense(m) => m.clone(),
            Matrix::Sparse(m) => m.to_dense(),
            Matrix::Diagonal(m) => m.to_dense(),
            Matrix::Symmetric(m) => m.to_dense(),
        }
    }

    /// Copy into another storage kind.
    ///
    /// Fails with [`LinalgError::Unsupported`] when the target kind cannot
    /// hold the values, and [`LinalgError::NotSquare`] for a rectangular
    /// matrix converted to symmetric storage.
    ///
    /// ```
    /// use polymat::{LinalgError, Matrix, StorageKind};
    ///
    /// let a = Matrix::dense_from_rows(2, 2, &[1.0_f64, 0.0, 0.0, 3.0]);
    /// let d = a.convert_to(StorageKind::Diagonal).unwrap();
    /// assert_eq!(d.kind(), StorageKind::Diagonal);
    ///
    /// let b = Matrix::dense_from_rows(2, 2, &[1.0_f64, 2.0, 0.0, 3.0]);
    /// assert!(matches!(
    ///     b.convert_to(StorageKind::Symmetric),
    ///     Err(LinalgError::Unsupported { .. })
    /// ));
    /// ```
    pub fn convert_to(&self, kind: StorageKind) -> Result<Matrix<T>> {
        if kind == self.kind() {
            return Ok(self.clone());
        }
        let mut out = Matrix::zeros_of_kind(kind, self.nrows(), self.ncols())?;
        fallback::assign(&mut out, &self.to_dense())?;
        Ok(out)
    }

    /// Exact test of `A[i, j] == A[j, i]` for every pair.
    pub fn is_symmetric(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        match self {
            Matrix::Symmetric(_) => true,
            Matrix::Diagonal(_) => true,
            Matrix::Sparse(m) => m == &m.transpose(),
            Matrix::Dense(m) => {
                let n = m.nrows();
                (0..n).all(|j| (0..j).all(|i| m[(i, j)] == m[(j, i)]))
            }
        }
    }
}

// ── Structure ───────────────────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Transposed copy in the same storage kind.
    pub fn transpose(&self) -> Matrix<T> {
        match self {
            Matrix::Dense(m) => Matrix::Dense(m.transpose()),
            Matrix::Sparse(m) => Matrix::Sparse(m.transpose()),
            Matrix::Diagonal(m) => Matrix::Diagonal(m.transpose()),
            Matrix::Symmetric(m) => Matrix::Symmetric(m.clone()),
        }
    }

    /// `alpha * A` in the same storage kind.
    pub fn scale(&self, alpha: T) -> Matrix<T> {
        match self {
            Matrix::Dense(m) => {
                let mut out = DenseMatrix::zeros(m.nrows(), m.ncols());
                provider().scale_array(alpha, m.as_slice(), out.as_mut_slice());
                Matrix::Dense(out)
            }
            Matrix::Sparse(m) => Matrix::Sparse(m.scale(alpha)),
            Matrix::Diagonal(m) => {
                let mut out = m.clone();
                out.diagonal_mut().iter_mut().for_each(|d| *d = alpha * *d);
                Matrix::Diagonal(out)
            }
            Matrix::Symmetric(m) => {
                let mut out = m.clone();
                out.packed_mut().iter_mut().for_each(|x| *x = alpha * *x);
                Matrix::Symmetric(out)
            }
        }
    }

    /// `-A` in the same storage kind.
    pub fn negate(&self) -> Matrix<T> {
        self.scale(T::zero() - T::one())
    }

    /// Set every element to zero, keeping shape and kind.
    pub fn clear(&mut self) {
        match self {
            Matrix::Dense(m) => m.clear(),
            Matrix::Sparse(m) => m.clear(),
            Matrix::Diagonal(m) => m.diagonal_mut().iter_mut().for_each(|d| *d = T::zero()),
            Matrix::Symmetric(m) => m.packed_mut().iter_mut().for_each(|x| *x = T::zero()),
        }
    }

    /// Sum of the diagonal of a square matrix.
    pub fn trace(&self) -> Result<T> {
        if !self.is_square() {
            return Err(LinalgError::NotSquare {
                rows: self.nrows(),
                cols: self.ncols(),
            });
        }
        Ok(match self {
            Matrix::Diagonal(m) => m.diagonal().iter().fold(T::zero(), |acc, &d| acc + d),
            _ => (0..self.nrows()).fold(T::zero(), |acc, i| acc + self.value(i, i)),
        })
    }

    /// Row `i`, copied out.
    pub fn row(&self, i: usize) -> Result<DenseVector<T>> {
        self.check_index(i, 0)?;
        let values = match self {
            Matrix::Dense(m) => m.row(i),
            Matrix::Sparse(m) => {
                let mut out = vec![T::zero(); m.ncols()];
                for (j, v) in m.row_entries(i) {
                    out[j] = v;
                }
                out
            }
            _ => (0..self.ncols()).map(|j| self.value(i, j)).collect(),
        };
        Ok(DenseVector::from_vec(values))
    }

    /// Column `j`, copied out.
    pub fn column(&self, j: usize) -> Result<DenseVector<T>> {
        self.check_index(0, j)?;
        let values = match self {
            Matrix::Dense(m) => m.col(j).to_vec(),
            _ => (0..self.nrows()).map(|i| self.value(i, j)).collect(),
        };
        Ok(DenseVector::from_vec(values))
    }

    /// Overwrite row `i` with `values`.
    ///
    /// Symmetric storage always fails with [`LinalgError::Unsupported`];
    /// diagonal storage fails the same way if a value off the diagonal is
    /// neither zero nor NaN. Nothing is written on failure.
    pub fn set_row(&mut self, i: usize, values: &[T]) -> Result<()> {
        self.check_index(i, 0)?;
        if values.len() != self.ncols() {
            return Err(LinalgError::mismatch((1, self.ncols()), (1, values.len())));
        }
        match self {
            Matrix::Dense(m) => {
                for (j, &v) in values.iter().enumerate() {
                    m[(i, j)] = v;
                }
            }
            Matrix::Sparse(m) => {
                for (j, &v) in values.iter().enumerate() {
                    m.set(i, j, v);
                }
            }
            Matrix::Diagonal(m) => set_diagonal_line(m, i, values, "set_row")?,
            Matrix::Symmetric(_) => return Err(LinalgError::unsupported(StorageKind::Symmetric, "set_row")),
        }
        Ok(())
    }

    /// Overwrite column `j` with `values`. Same storage rules as [`set_row`](Self::set_row).
    pub fn set_column(&mut self, j: usize, values: &[T]) -> Result<()> {
        self.check_index(0, j)?;
        if values.len() != self.nrows() {
            return Err(LinalgError::mismatch((self.nrows(), 1), (values.len(), 1)));
        }
        match self {
            Matrix::Dense(m) => {
                for (i, &v) in values.iter().enumerate() {
                    m[(i, j)] = v;
                }
            }
            Matrix::Sparse(m) => {
                for (i, &v) in values.iter().enumerate() {
                    m.set(i, j, v);
                }
            }
            Matrix::Diagonal(m) => set_diagonal_line(m, j, values, "set_column")?,
            Matrix::Symmetric(_) => return Err(LinalgError::unsupported(StorageKind::Symmetric, "set_column")),
        }
        Ok(())
    }

    /// New matrix with `values` inserted as row `i` (`i <= nrows`).
    ///
    /// The result keeps this matrix's storage kind. Symmetric storage fails
    /// with [`LinalgError::Unsupported`], and so does diagonal storage when a
    /// shifted entry would land off the diagonal.
    pub fn insert_row(&self, i: usize, values: &[T]) -> Result<Matrix<T>> {
        let (nrows, ncols) = self.shape();
        if i > nrows {
            return Err(LinalgError::IndexOutOfBounds { row: i, col: 0, nrows, ncols });
        }
        if values.len() != ncols {
            return Err(LinalgError::mismatch((1, ncols), (1, values.len())));
        }
        if self.kind() == StorageKind::Symmetric {
            return Err(LinalgError::unsupported(StorageKind::Symmetric, "insert_row"));
        }
        let scratch = DenseMatrix::from_fn(nrows + 1, ncols, |r, c| match r.cmp(&i) {
            core::cmp::Ordering::Less => self.value(r, c),
            core::cmp::Ordering::Equal => values[c],
            core::cmp::Ordering::Greater => self.value(r - 1, c),
        });
        let mut out = Matrix::zeros_of_kind(self.kind(), nrows + 1, ncols)?;
        fallback::assign(&mut out, &scratch)?;
        Ok(out)
    }

    /// Reorder rows in place: row `i` becomes the old row `perm[i]`.
    ///
    /// Diagonal storage fails with [`LinalgError::Unsupported`]. Symmetric
    /// storage only accepts permutations that leave the matrix symmetric.
    pub fn permute_rows(&mut self, perm: &[usize]) -> Result<()> {
        if self.kind() == StorageKind::Diagonal {
            return Err(LinalgError::unsupported(StorageKind::Diagonal, "permute_rows"));
        }
        check_permutation(perm, self.nrows())?;
        let permuted = match &*self {
            Matrix::Sparse(m) => {
                let mut triplets = Vec::with_capacity(m.nnz());
                for (new_row, &old_row) in perm.iter().enumerate() {
                    triplets.extend(m.row_entries(old_row).map(|(c, v)| (new_row, c, v)));
                }
                Matrix::Sparse(SparseCompressedRow::from_triplets(m.nrows(), m.ncols(), &triplets)?)
            }
            other => {
                let scratch = DenseMatrix::from_fn(other.nrows(), other.ncols(), |r, c| other.value(perm[r], c));
                let mut out = Matrix::zeros_of_kind(other.kind(), other.nrows(), other.ncols())?;
                fallback::assign(&mut out, &scratch)?;
                out
            }
        };
        *self = permuted;
        Ok(())
    }

    /// Reorder columns in place: column `j` becomes the old column `perm[j]`.
    ///
    /// Same storage rules as [`permute_rows`](Self::permute_rows).
    pub fn permute_columns(&mut self, perm: &[usize]) -> Result<()> {
        if self.kind() == StorageKind::Diagonal {
            return Err(LinalgError::unsupported(StorageKind::Diagonal, "permute_columns"));
        }
        check_permutation(perm, self.ncols())?;
        let scratch = DenseMatrix::from_fn(self.nrows(), self.ncols(), |r, c| self.value(r, perm[c]));
        let mut out = Matrix::zeros_of_kind(self.kind(), self.nrows(), self.ncols())?;
        fallback::assign(&mut out, &scratch)?;
        *self = out;
        Ok(())
    }
}

/// Write row or column `k` of a diagonal matrix, which must be zero (or NaN)
/// everywhere except at index `k`.
fn set_diagonal_line<T: Scalar>(m: &mut DiagonalStorage<T>, k: usize, values: &[T], op: &'static str) -> Result<()> {
    let fits = values
        .iter()
        .enumerate()
        .all(|(idx, &v)| idx == k || DiagonalStorage::is_storable_off_diagonal(v));
    if !fits {
        return Err(LinalgError::unsupported(StorageKind::Diagonal, op));
    }
    if k < m.diagonal().len() {
        m.diagonal_mut()[k] = values[k];
    }
    Ok(())
}

fn check_permutation(perm: &[usize], n: usize) -> Result<()> {
    if perm.len() != n {
        return Err(LinalgError::InvalidArgument("permutation length must match the dimension"));
    }
    let mut seen = vec![false; n];
    for &p in perm {
        if p >= n || seen[p] {
            return Err(LinalgError::InvalidArgument("not a permutation"));
        }
        seen[p] = true;
    }
    Ok(())
}

// ── Norms and factorizations ────────────────────────────────────────

impl<T: FloatScalar> Matrix<T> {
    /// Frobenius norm, `sqrt(sum |a_ij|^2)`, visiting stored values only.
    pub fn frobenius_norm(&self) -> T {
        let sum_sq = |xs: &[T]| xs.iter().fold(T::zero(), |acc, &x| acc + x * x);
        let total = match self {
            Matrix::Dense(m) => sum_sq(m.as_slice()),
            Matrix::Sparse(m) => sum_sq(m.values()),
            Matrix::Diagonal(m) => sum_sq(m.diagonal()),
            Matrix::Symmetric(m) => {
                // off-diagonal cells stand for two elements
                let n = m.order();
                let diag: T = (0..n).fold(T::zero(), |acc, i| acc + m.get(i, i) * m.get(i, i));
                let all = sum_sq(m.packed());
                all + all - diag
            }
        };
        total.sqrt()
    }

    /// LU factorization with partial pivoting.
    pub fn lu(&self) -> Result<Lu<T>> {
        Lu::new(self)
    }

    /// Cholesky factorization.
    pub fn cholesky(&self) -> Result<Cholesky<T>> {
        Cholesky::new(self)
    }

    /// Householder QR, full or thin.
    pub fn qr(&self, method: QrMethod) -> Result<Qr<T>> {
        Qr::new(self, method)
    }

    /// QR by modified Gram-Schmidt.
    pub fn gram_schmidt(&self) -> Result<GramSchmidt<T>> {
        GramSchmidt::new(self)
    }

    /// Singular value decomposition; vectors only if `compute_vectors`.
    pub fn svd(&self, compute_vectors: bool) -> Result<Svd<T>> {
        Svd::new(self, compute_vectors)
    }

    /// Eigenvalue decomposition.
    pub fn evd(&self) -> Result<Evd<T>> {
        Evd::new(self)
    }

    /// Inverse of a square matrix.
    ///
    /// Diagonal storage inverts entry by entry and stays diagonal; every
    /// other kind goes through LU and returns a dense matrix. A zero
    /// diagonal entry or an exactly zero pivot fails with
    /// [`LinalgError::Singular`].
    ///
    /// ```
    /// use polymat::Matrix;
    ///
    /// let d = Matrix::diagonal_from_slice(3, 3, &[2.0_f64, 4.0, 5.0]);
    /// let inv = d.inverse().unwrap();
    /// assert_eq!(inv.at(1, 1).unwrap(), 0.25);
    /// ```
    pub fn inverse(&self) -> Result<Matrix<T>> {
        match self {
            Matrix::Diagonal(m) => m.inverse().map(Matrix::Diagonal),
            _ => Ok(Matrix::Dense(self.lu()?.inverse())),
        }
    }

    /// Determinant of a square matrix; zero when LU hits an exact zero pivot.
    pub fn determinant(&self) -> Result<T> {
        match self {
            Matrix::Diagonal(m) => m.determinant(),
            _ => match self.lu() {
                Ok(lu) => Ok(lu.determinant()),
                Err(LinalgError::Singular) => Ok(T::zero()),
                Err(e) => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vector;

    fn all_kinds() -> Vec<Matrix<f64>> {
        let rows = [2.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 3.0];
        vec![
            Matrix::dense_from_rows(3, 3, &rows),
            Matrix::sparse_from_rows(3, 3, &rows),
            Matrix::diagonal_from_slice(3, 3, &[2.0, -1.0, 3.0]),
            Matrix::symmetric_from_rows(3, &rows).unwrap(),
        ]
    }

    #[test]
    fn kinds_agree_on_access() {
        let kinds = all_kinds();
        let expected = kinds[0].to_dense();
        for m in &kinds {
            assert_eq!(m.to_dense(), expected, "{}", m.kind());
            assert_eq!(m.trace().unwrap(), 4.0);
            assert_eq!(m.transpose().to_dense(), expected.transpose());
            assert_eq!(m.negate().at(2, 2).unwrap(), -3.0);
            assert_eq!(m.scale(2.0).at(1, 1).unwrap(), -2.0);
            assert!((m.frobenius_norm() - 14.0_f64.sqrt()).abs() < 1e-12);
            assert!(m.is_symmetric());
            assert_eq!(m.row(1).unwrap().as_slice(), &[0.0, -1.0, 0.0]);
            assert_eq!(m.column(2).unwrap().as_slice(), &[0.0, 0.0, 3.0]);
            assert!(matches!(m.at(3, 0), Err(LinalgError::IndexOutOfBounds { .. })));
        }
    }

    #[test]
    fn symmetric_set_writes_both_cells() {
        let mut s = Matrix::<f64>::symmetric_zeros(3);
        s.set_at(0, 2, 5.0).unwrap();
        assert_eq!(s.at(2, 0).unwrap(), 5.0);
        assert!(s.is_symmetric());
        assert!(matches!(
            s.set_row(0, &[1.0, 2.0, 3.0]),
            Err(LinalgError::Unsupported { kind: StorageKind::Symmetric, .. })
        ));
        assert!(matches!(
            s.insert_row(1, &[1.0, 2.0, 3.0]),
            Err(LinalgError::Unsupported { kind: StorageKind::Symmetric, .. })
        ));
    }

    #[test]
    fn diagonal_rules() {
        let mut d = Matrix::diagonal_from_slice(3, 3, &[1.0_f64, 2.0, 3.0]);
        assert!(matches!(
            d.set_at(0, 1, 4.0),
            Err(LinalgError::Unsupported { kind: StorageKind::Diagonal, .. })
        ));
        d.set_at(0, 1, 0.0).unwrap();
        d.set_row(1, &[0.0, 9.0, 0.0]).unwrap();
        assert_eq!(d.at(1, 1).unwrap(), 9.0);
        assert!(d.set_column(2, &[1.0, 0.0, 7.0]).is_err());
        assert_eq!(d.at(2, 2).unwrap(), 3.0);
        assert!(matches!(
            d.permute_rows(&[1, 0, 2]),
            Err(LinalgError::Unsupported { kind: StorageKind::Diagonal, .. })
        ));
        assert!(matches!(
            d.permute_columns(&[0, 1, 2]),
            Err(LinalgError::Unsupported { kind: StorageKind::Diagonal, .. })
        ));
    }

    #[test]
    fn insert_row_keeps_kind() {
        let a = Matrix::sparse_from_rows(2, 2, &[1.0_f64, 0.0, 0.0, 2.0]);
        let b = a.insert_row(1, &[5.0, 6.0]).unwrap();
        assert_eq!(b.kind(), StorageKind::Sparse);
        assert_eq!(b.to_dense(), DenseMatrix::from_rows(3, 2, &[1.0, 0.0, 5.0, 6.0, 0.0, 2.0]));

        let d = Matrix::diagonal_from_slice(2, 2, &[1.0_f64, 2.0]);
        // appending keeps both entries on the diagonal; prepending shifts them off it
        assert!(d.insert_row(2, &[0.0, 0.0]).is_ok());
        assert!(d.insert_row(0, &[0.0, 0.0]).is_err());
    }

    #[test]
    fn permutations() {
        let mut a = Matrix::dense_from_rows(3, 2, &[1.0_f64, 2.0, 3.0, 4.0, 5.0, 6.0]);
        a.permute_rows(&[2, 0, 1]).unwrap();
        assert_eq!(a.row(0).unwrap().as_slice(), &[5.0, 6.0]);
        a.permute_columns(&[1, 0]).unwrap();
        assert_eq!(a.row(0).unwrap().as_slice(), &[6.0, 5.0]);
        assert!(matches!(a.permute_rows(&[0, 0, 1]), Err(LinalgError::InvalidArgument(_))));

        let mut s = Matrix::sparse_from_rows(2, 2, &[0.0_f64, 1.0, 2.0, 0.0]);
        s.permute_rows(&[1, 0]).unwrap();
        assert_eq!(s.to_dense(), DenseMatrix::from_rows(2, 2, &[2.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn convert_round_trip() {
        let a = Matrix::dense_from_rows(2, 3, &[1.0_f64, 0.0, 0.0, 0.0, 2.0, 0.0]);
        let s = a.convert_to(StorageKind::Sparse).unwrap();
        assert_eq!(s.kind(), StorageKind::Sparse);
        let d = s.convert_to(StorageKind::Diagonal).unwrap();
        assert_eq!(d.to_dense(), a.to_dense());
        assert!(matches!(
            a.convert_to(StorageKind::Symmetric),
            Err(LinalgError::NotSquare { .. })
        ));
    }

    #[test]
    fn inverse_and_determinant() {
        let d = Matrix::diagonal_from_slice(3, 3, &[2.0_f64, 4.0, 5.0]);
        let inv = d.inverse().unwrap();
        assert_eq!(inv.kind(), StorageKind::Diagonal);
        assert_eq!(inv.to_dense(), DenseMatrix::from_diag(&[0.5, 0.25, 0.2]));
        assert_eq!(d.determinant().unwrap(), 40.0);

        let z = Matrix::diagonal_from_slice(2, 2, &[1.0_f64, 0.0]);
        assert_eq!(z.inverse().unwrap_err(), LinalgError::Singular);

        let singular = Matrix::dense_from_rows(2, 2, &[1.0_f64, 2.0, 2.0, 4.0]);
        assert_eq!(singular.determinant().unwrap(), 0.0);
        assert_eq!(singular.inverse().unwrap_err(), LinalgError::Singular);
    }

    #[test]
    fn dense_view_writes_into_caller_buffer() {
        // Column-major [[1, 2], [3, 4]].
        let mut buf = vec![1.0_f64, 3.0, 2.0, 4.0];
        let ptr = buf.as_ptr();
        let (det, y) = Matrix::with_dense_view(&mut buf, 2, 2, |m| {
            m.set_at(1, 0, 5.0).unwrap();
            let y = m.mul_vector(&Vector::dense_from_slice(&[1.0, 1.0])).unwrap();
            (m.determinant().unwrap(), y)
        })
        .unwrap();
        assert_eq!(buf, [1.0, 5.0, 2.0, 4.0]);
        assert_eq!(buf.as_ptr(), ptr);
        assert!((det + 6.0).abs() < 1e-12);
        assert_eq!(y.as_slice(), &[3.0, 9.0]);

        Matrix::with_dense_view(&mut buf, 2, 2, |m| {
            let sum = m.add(&Matrix::diagonal_identity(2)).unwrap();
            *m = sum.convert_to(StorageKind::Sparse).unwrap();
        })
        .unwrap();
        assert_eq!(buf, [2.0, 5.0, 2.0, 5.0]);

        let r = Matrix::with_dense_view(&mut buf, 2, 2, |m| *m = m.insert_row(2, &[0.0, 0.0]).unwrap());
        assert!(matches!(r, Err(LinalgError::DimensionMismatch { .. })));
        assert_eq!(buf.len(), 6);

        let mut short = vec![1.0_f64; 3];
        assert!(matches!(
            Matrix::with_dense_view(&mut short, 2, 2, |_| ()),
            Err(LinalgError::InvalidArgument(_))
        ));
        assert_eq!(short, [1.0; 3]);
    }
}
