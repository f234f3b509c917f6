use crate::error::{LinalgError, Result};
use crate::storage::DenseMatrix;
use crate::traits::Scalar;

/// Compressed Sparse Row matrix.
///
/// Three arrays describe the non-zeros:
/// - `row_ptr[r]..row_ptr[r + 1]` is the range of entries belonging to row `r`
/// - `col_idx` holds the column of each entry, strictly ascending within a row
/// - `values` holds the entry values
///
/// Explicit zeros are never stored: writing a zero removes the entry.
///
/// ```
/// use polymat::SparseCompressedRow;
///
/// let csr = SparseCompressedRow::from_triplets(
///     3, 3,
///     &[(0, 0, 1.0_f64), (1, 2, 2.0), (2, 1, 3.0), (1, 2, 0.5)],
/// ).unwrap();
/// assert_eq!(csr.nnz(), 3);
/// assert_eq!(csr.get(1, 2), 2.5);
/// assert_eq!(csr.get(0, 1), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SparseCompressedRow<T> {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
    nrows: usize,
    ncols: usize,
}

impl<T: Scalar> SparseCompressedRow<T> {
    /// Create an empty (all-zero) sparse matrix.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        assert!(
            nrows >= 1 && ncols >= 1,
            "matrix dimensions must be at least 1x1, got {}x{}",
            nrows,
            ncols
        );
        Self {
            row_ptr: vec![0; nrows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
            nrows,
            ncols,
        }
    }

    /// Build from `(row, col, value)` triplets.
    ///
    /// Duplicates are summed; entries that sum to zero are dropped.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, T)]) -> Result<Self> {
        let mut entries: Vec<(usize, usize, T)> = Vec::with_capacity(triplets.len());
        for &(r, c, v) in triplets {
            if r >= nrows || c >= ncols {
                return Err(LinalgError::IndexOutOfBounds {
                    row: r,
                    col: c,
                    nrows,
                    ncols,
                });
            }
            entries.push((r, c, v));
        }
        entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut out = Self::new(nrows, ncols);
        let mut i = 0;
        while i < entries.len() {
            let (r, c, mut v) = entries[i];
            i += 1;
            while i < entries.len() && entries[i].0 == r && entries[i].1 == c {
                v = v + entries[i].2;
                i += 1;
            }
            if v != T::zero() {
                out.col_idx.push(c);
                out.values.push(v);
                out.row_ptr[r + 1] += 1;
            }
        }
        for r in 0..nrows {
            out.row_ptr[r + 1] += out.row_ptr[r];
        }
        Ok(out)
    }

    /// Build by calling `f(row, col)` for every cell and keeping the non-zeros.
    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut out = Self::new(nrows, ncols);
        for i in 0..nrows {
            for j in 0..ncols {
                let v = f(i, j);
                if v != T::zero() {
                    out.col_idx.push(j);
                    out.values.push(v);
                }
            }
            out.row_ptr[i + 1] = out.col_idx.len();
        }
        out
    }

    /// Build from a dense row-major slice.
    pub fn from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Self {
        assert_eq!(
            row_major.len(),
            nrows * ncols,
            "slice length {} does not match {}x{} matrix",
            row_major.len(),
            nrows,
            ncols,
        );
        Self::from_fn(nrows, ncols, |i, j| row_major[i * ncols + j])
    }

    /// Build from a dense matrix, keeping the non-zeros.
    pub fn from_dense(dense: &DenseMatrix<T>) -> Self {
        Self::from_fn(dense.nrows(), dense.ncols(), |i, j| dense[(i, j)])
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

    /// Number of stored non-zeros.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row pointer array (length `nrows + 1`).
    #[inline]
    pub fn row_pointers(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column index array (length `nnz`).
    #[inline]
    pub fn column_indices(&self) -> &[usize] {
        &self.col_idx
    }

    /// Value array (length `nnz`).
    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Iterate the stored `(col, value)` pairs of row `i`.
    pub fn row_entries(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        self.col_idx[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    fn find(&self, row: usize, col: usize) -> core::result::Result<usize, usize> {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        self.col_idx[start..end]
            .binary_search(&col)
            .map(|k| start + k)
            .map_err(|k| start + k)
    }

    /// Element at `(row, col)`; zero if not stored.
    ///
    /// Panics if the index is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(row < self.nrows && col < self.ncols, "index out of bounds");
        match self.find(row, col) {
            Ok(k) => self.values[k],
            Err(_) => T::zero(),
        }
    }

    /// Set element `(row, col)`, inserting or removing an entry as needed.
    ///
    /// Panics if the index is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(row < self.nrows && col < self.ncols, "index out of bounds");
        match self.find(row, col) {
            Ok(k) if value == T::zero() => {
                self.col_idx.remove(k);
                self.values.remove(k);
                self.row_ptr[row + 1..].iter_mut().for_each(|p| *p -= 1);
            }
            Ok(k) => self.values[k] = value,
            Err(_) if value == T::zero() => {}
            Err(k) => {
                self.col_idx.insert(k, col);
                self.values.insert(k, value);
                self.row_ptr[row + 1..].iter_mut().for_each(|p| *p += 1);
            }
        }
    }

    /// Remove every stored entry.
    pub fn clear(&mut self) {
        self.col_idx.clear();
        self.values.clear();
        self.row_ptr.iter_mut().for_each(|p| *p = 0);
    }

    /// Expand into a dense matrix.
    pub fn to_dense(&self) -> DenseMatrix<T> {
        let mut out = DenseMatrix::zeros(self.nrows, self.ncols);
        for i in 0..self.nrows {
            for (j, v) in self.row_entries(i) {
                out[(i, j)] = v;
            }
        }
        out
    }

    /// Transposed copy, still in CSR form.
    pub fn transpose(&self) -> Self {
        let mut row_ptr = vec![0usize; self.ncols + 1];
        for &c in &self.col_idx {
            row_ptr[c + 1] += 1;
        }
        for c in 0..self.ncols {
            row_ptr[c + 1] += row_ptr[c];
        }
        let mut next = row_ptr.clone();
        let mut col_idx = vec![0usize; self.nnz()];
        let mut values = vec![T::zero(); self.nnz()];
        for i in 0..self.nrows {
            for (j, v) in self.row_entries(i) {
                let dst = next[j];
                col_idx[dst] = i;
                values[dst] = v;
                next[j] += 1;
            }
        }
        Self {
            row_ptr,
            col_idx,
            values,
            nrows: self.ncols,
            ncols: self.nrows,
        }
    }

    /// `y = A * x`, visiting only the stored entries.
    pub fn mul_dense_vector(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols, "vector length mismatch");
        assert_eq!(y.len(), self.nrows, "result length mismatch");
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self
                .row_entries(i)
                .fold(T::zero(), |acc, (j, v)| acc + v * x[j]);
        }
    }

    /// Multiply every stored value by `alpha`.
    pub fn scale(&self, alpha: T) -> Self {
        if alpha == T::zero() {
            return Self::new(self.nrows, self.ncols);
        }
        let mut out = self.clone();
        out.values.iter_mut().for_each(|v| *v = *v * alpha);
        out
    }

    /// Union merge of two patterns of equal shape, `f(a, b)` per cell present
    /// in either operand. Zero results are dropped.
    pub(crate) fn merge_union(&self, other: &Self, f: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!((self.nrows, self.ncols), (other.nrows, other.ncols));
        let mut out = Self::new(self.nrows, self.ncols);
        for i in 0..self.nrows {
            let (mut a, a_end) = (self.row_ptr[i], self.row_ptr[i + 1]);
            let (mut b, b_end) = (other.row_ptr[i], other.row_ptr[i + 1]);
            while a < a_end || b < b_end {
                let ca = if a < a_end { self.col_idx[a] } else { usize::MAX };
                let cb = if b < b_end { other.col_idx[b] } else { usize::MAX };
                let (col, v) = if ca == cb {
                    let v = f(self.values[a], other.values[b]);
                    a += 1;
                    b += 1;
                    (ca, v)
                } else if ca < cb {
                    let v = f(self.values[a], T::zero());
                    a += 1;
                    (ca, v)
                } else {
                    let v = f(T::zero(), other.values[b]);
                    b += 1;
                    (cb, v)
                };
                if v != T::zero() {
                    out.col_idx.push(col);
                    out.values.push(v);
                }
            }
            out.row_ptr[i + 1] = out.col_idx.len();
        }
        out
    }

    /// Sparse product `A * B` (row-by-row with a dense accumulator).
    pub fn matmul(&self, other: &Self) -> Self {
        assert_eq!(self.ncols, other.nrows, "dimension mismatch in sparse matmul");
        let mut out = Self::new(self.nrows, other.ncols);
        let mut acc = vec![T::zero(); other.ncols];
        let mut touched = vec![false; other.ncols];
        let mut pattern: Vec<usize> = Vec::new();
        for i in 0..self.nrows {
            for (k, a_ik) in self.row_entries(i) {
                for (j, b_kj) in other.row_entries(k) {
                    if !touched[j] {
                        touched[j] = true;
                        pattern.push(j);
                    }
                    acc[j] = acc[j] + a_ik * b_kj;
                }
            }
            pattern.sort_unstable();
            for &j in &pattern {
                if acc[j] != T::zero() {
                    out.col_idx.push(j);
                    out.values.push(acc[j]);
                }
                acc[j] = T::zero();
                touched[j] = false;
            }
            pattern.clear();
            out.row_ptr[i + 1] = out.col_idx.len();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseCompressedRow<f64> {
        // [[1, 0, 2],
        //  [0, 0, 3],
        //  [4, 5, 0]]
        SparseCompressedRow::from_rows(3, 3, &[1.0, 0.0, 2.0, 0.0, 0.0, 3.0, 4.0, 5.0, 0.0])
    }

    #[test]
    fn csr_layout() {
        let a = sample();
        assert_eq!(a.row_pointers(), &[0, 2, 3, 5]);
        assert_eq!(a.column_indices(), &[0, 2, 2, 0, 1]);
        assert_eq!(a.values(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn triplets_out_of_bounds() {
        let err = SparseCompressedRow::from_triplets(2, 2, &[(2, 0, 1.0_f64)]).unwrap_err();
        assert!(matches!(err, LinalgError::IndexOutOfBounds { row: 2, .. }));
    }

    #[test]
    fn set_inserts_and_removes() {
        let mut a = sample();
        a.set(1, 0, 7.0);
        assert_eq!(a.get(1, 0), 7.0);
        assert_eq!(a.row_pointers(), &[0, 2, 4, 6]);
        a.set(0, 2, 0.0);
        assert_eq!(a.get(0, 2), 0.0);
        assert_eq!(a.nnz(), 5);
        assert_eq!(a.row_pointers(), &[0, 1, 3, 5]);
        // Column indices stay sorted within the row
        assert_eq!(&a.column_indices()[1..3], &[0, 2]);
    }

    #[test]
    fn transpose_round_trip() {
        let a = sample();
        let t = a.transpose();
        assert_eq!(t.get(2, 0), 2.0);
        assert_eq!(t.get(1, 2), 5.0);
        assert_eq!(t.transpose(), a);
    }

    #[test]
    fn matvec() {
        let a = sample();
        let mut y = [0.0; 3];
        a.mul_dense_vector(&[1.0, 2.0, 3.0], &mut y);
        assert_eq!(y, [7.0, 9.0, 14.0]);
    }

    #[test]
    fn merges() {
        let a = sample();
        let diff = a.merge_union(&a, |x, y| x - y);
        assert_eq!(diff.nnz(), 0);
        let sq = a.merge_union(&a, |x, y| x * y);
        assert_eq!(sq.get(2, 1), 25.0);
        assert_eq!(sq.nnz(), a.nnz());
    }

    #[test]
    fn sparse_matmul_matches_dense() {
        let a = sample();
        let p = a.matmul(&a).to_dense();
        let d = a.to_dense();
        let expected = &d * &d;
        assert_eq!(p, expected);
    }
}
