use crate::error::{LinalgError, Result};
use crate::traits::Scalar;

use super::DenseVector;

/// Sparse vector: strictly ascending indices with their non-zero values.
///
/// ```
/// use polymat::SparseVector;
///
/// let v = SparseVector::from_slice(&[0.0_f64, 3.0, 0.0, 4.0]);
/// assert_eq!(v.nnz(), 2);
/// assert_eq!(v.indices(), &[1, 3]);
/// assert_eq!(v.get(2), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector<T> {
    len: usize,
    indices: Vec<usize>,
    values: Vec<T>,
}

impl<T: Scalar> SparseVector<T> {
    /// All-zero vector of length `len`.
    pub fn new(len: usize) -> Self {
        assert!(len >= 1, "vector length must be at least 1");
        Self {
            len,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Keep the non-zeros of a dense slice.
    pub fn from_slice(data: &[T]) -> Self {
        let mut out = Self::new(data.len());
        for (i, &v) in data.iter().enumerate() {
            if v != T::zero() {
                out.indices.push(i);
                out.values.push(v);
            }
        }
        out
    }

    /// Build from `(index, value)` pairs. Duplicates are summed; zero sums
    /// are dropped.
    pub fn from_pairs(len: usize, pairs: &[(usize, T)]) -> Result<Self> {
        let mut sorted = pairs.to_vec();
        if let Some(&(i, _)) = sorted.iter().find(|(i, _)| *i >= len) {
            return Err(LinalgError::IndexOutOfBounds {
                row: i,
                col: 0,
                nrows: len,
                ncols: 1,
            });
        }
        sorted.sort_by_key(|&(i, _)| i);
        let mut out = Self::new(len);
        for (i, v) in sorted {
            match out.indices.last() {
                Some(&last) if last == i => {
                    if let Some(acc) = out.values.last_mut() {
                        *acc = *acc + v;
                    }
                }
                _ => {
                    out.indices.push(i);
                    out.values.push(v);
                }
            }
        }
        out.drop_zeros();
        Ok(out)
    }

    fn drop_zeros(&mut self) {
        let mut keep = 0;
        for k in 0..self.values.len() {
            if self.values[k] != T::zero() {
                self.indices[keep] = self.indices[k];
                self.values[keep] = self.values[k];
                keep += 1;
            }
        }
        self.indices.truncate(keep);
        self.values.truncate(keep);
    }

    /// Logical length.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector is empty (never true for a constructed vector).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored indices, ascending.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Stored values, matching [`indices`](Self::indices).
    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Element `i`; zero if not stored.
    ///
    /// Panics if `i >= len`.
    pub fn get(&self, i: usize) -> T {
        assert!(i < self.len, "index out of bounds");
        match self.indices.binary_search(&i) {
            Ok(k) => self.values[k],
            Err(_) => T::zero(),
        }
    }

    /// Set element `i`, inserting or removing an entry as needed.
    ///
    /// Panics if `i >= len`.
    pub fn set(&mut self, i: usize, value: T) {
        assert!(i < self.len, "index out of bounds");
        match self.indices.binary_search(&i) {
            Ok(k) if value == T::zero() => {
                self.indices.remove(k);
                self.values.remove(k);
            }
            Ok(k) => self.values[k] = value,
            Err(_) if value == T::zero() => {}
            Err(k) => {
                self.indices.insert(k, i);
                self.values.insert(k, value);
            }
        }
    }

    /// Expand into a dense vector.
    pub fn to_dense(&self) -> DenseVector<T> {
        let mut out = DenseVector::zeros(self.len);
        for (&i, &v) in self.indices.iter().zip(&self.values) {
            out[i] = v;
        }
        out
    }

    /// Multiply every stored value by `alpha`.
    pub fn scale(&self, alpha: T) -> Self {
        let mut out = self.clone();
        out.values.iter_mut().for_each(|v| *v = alpha * *v);
        out.drop_zeros();
        out
    }

    /// `f(a, b)` at every index stored in either operand.
    pub(crate) fn merge_union(&self, other: &Self, f: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!(self.len, other.len);
        let mut out = Self::new(self.len);
        let (mut a, mut b) = (0, 0);
        while a < self.nnz() || b < other.nnz() {
            let ia = self.indices.get(a).copied().unwrap_or(usize::MAX);
            let ib = other.indices.get(b).copied().unwrap_or(usize::MAX);
            let (i, v) = if ia == ib {
                a += 1;
                b += 1;
                (ia, f(self.values[a - 1], other.values[b - 1]))
            } else if ia < ib {
                a += 1;
                (ia, f(self.values[a - 1], T::zero()))
            } else {
                b += 1;
                (ib, f(T::zero(), other.values[b - 1]))
            };
            if v != T::zero() {
                out.indices.push(i);
                out.values.push(v);
            }
        }
        out
    }

}
