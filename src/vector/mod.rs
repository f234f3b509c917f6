//! The storage-polymorphic [`Vector`].
//!
//! Dense-dense operations run through the array kernels and sparse-sparse
//! operations merge the stored entries. Mixed operands use an element-wise
//! fallback.

mod dense;
mod sparse;

pub use dense::DenseVector;
pub use sparse::SparseVector;

use crate::error::{LinalgError, Result};
use crate::kernel::{provider, LinearAlgebraProvider};
use crate::storage::StorageKind;
use crate::traits::{FloatScalar, Scalar};

/// A vector in dense or sparse storage.
///
/// # Examples
///
/// ```
/// use polymat::Vector;
///
/// let a = Vector::dense_from_slice(&[1.0_f64, 2.0, 3.0]);
/// let b = Vector::sparse_from_slice(&[0.0, 0.0, 4.0]);
/// assert_eq!(a.dot(&b).unwrap(), 12.0);
/// assert_eq!(a.add(&b).unwrap().at(2).unwrap(), 7.0);
/// assert!((b.norm() - 4.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Vector<T> {
    /// Every element stored.
    Dense(DenseVector<T>),
    /// Non-zero elements only.
    Sparse(SparseVector<T>),
}

impl<T: Scalar> Vector<T> {
    /// Dense zero vector.
    pub fn dense_zeros(n: usize) -> Self {
        Vector::Dense(DenseVector::zeros(n))
    }

    /// Dense vector copied from a slice.
    pub fn dense_from_slice(data: &[T]) -> Self {
        Vector::Dense(DenseVector::from_slice(data))
    }

    /// Dense vector with `f(i)` at every index.
    pub fn dense_from_fn(n: usize, f: impl Fn(usize) -> T) -> Self {
        Vector::Dense(DenseVector::from_fn(n, f))
    }

    /// Sparse zero vector.
    pub fn sparse_zeros(n: usize) -> Self {
        Vector::Sparse(SparseVector::new(n))
    }

    /// Sparse vector keeping the non-zeros of a slice.
    pub fn sparse_from_slice(data: &[T]) -> Self {
        Vector::Sparse(SparseVector::from_slice(data))
    }

    /// Sparse vector from `(index, value)` pairs.
    pub fn sparse_from_pairs(len: usize, pairs: &[(usize, T)]) -> Result<Self> {
        SparseVector::from_pairs(len, pairs).map(Vector::Sparse)
    }

    /// Storage kind tag, [`StorageKind::Dense`] or [`StorageKind::Sparse`].
    #[inline]
    pub fn kind(&self) -> StorageKind {
        match self {
            Vector::Dense(_) => StorageKind::Dense,
            Vector::Sparse(_) => StorageKind::Sparse,
        }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Vector::Dense(v) => v.len(),
            Vector::Sparse(v) => v.len(),
        }
    }

    /// Whether the vector is empty (never true for a constructed vector).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn value(&self, i: usize) -> T {
        match self {
            Vector::Dense(v) => v[i],
            Vector::Sparse(v) => v.get(i),
        }
    }

    fn check_index(&self, i: usize) -> Result<()> {
        if i >= self.len() {
            return Err(LinalgError::IndexOutOfBounds {
                row: i,
                col: 0,
                nrows: self.len(),
                ncols: 1,
            });
        }
        Ok(())
    }

    /// Element `i`.
    pub fn at(&self, i: usize) -> Result<T> {
        self.check_index(i)?;
        Ok(self.value(i))
    }

    /// Set element `i`.
    pub fn set_at(&mut self, i: usize, value: T) -> Result<()> {
        self.check_index(i)?;
        match self {
            Vector::Dense(v) => v[i] = value,
            Vector::Sparse(v) => v.set(i, value),
        }
        Ok(())
    }

    /// Dense copy.
    pub fn to_dense(&self) -> DenseVector<T> {
        match self {
            Vector::Dense(v) => v.clone(),
            Vector::Sparse(v) => v.to_dense(),
        }
    }

    fn check_len(&self, other: &Vector<T>) -> Result<()> {
        if self.len() != other.len() {
            return Err(LinalgError::mismatch((self.len(), 1), (other.len(), 1)));
        }
        Ok(())
    }

    /// `self + other`; sparse only when both operands are.
    pub fn add(&self, other: &Vector<T>) -> Result<Vector<T>> {
        self.check_len(other)?;
        Ok(match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => dense_zip(a, b, |x, y, r| provider().add_arrays(x, y, r)),
            (Vector::Sparse(a), Vector::Sparse(b)) => Vector::Sparse(a.merge_union(b, |x, y| x + y)),
            (a, b) => fallback_zip("add", a, b, StorageKind::Dense, |x, y| x + y),
        })
    }

    /// `self - other`; sparse only when both operands are.
    pub fn sub(&self, other: &Vector<T>) -> Result<Vector<T>> {
        self.check_len(other)?;
        if core::ptr::eq(self, other) {
            return Ok(match self {
                Vector::Dense(v) => Vector::dense_zeros(v.len()),
                Vector::Sparse(v) => Vector::sparse_zeros(v.len()),
            });
        }
        Ok(match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => dense_zip(a, b, |x, y, r| provider().subtract_arrays(x, y, r)),
            (Vector::Sparse(a), Vector::Sparse(b)) => Vector::Sparse(a.merge_union(b, |x, y| x - y)),
            (a, b) => fallback_zip("sub", a, b, StorageKind::Dense, |x, y| x - y),
        })
    }

    /// Element-wise product; sparse if either operand is.
    pub fn pointwise_mul(&self, other: &Vector<T>) -> Result<Vector<T>> {
        self.check_len(other)?;
        Ok(match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => {
                dense_zip(a, b, |x, y, r| provider().pointwise_multiply_arrays(x, y, r))
            }
            (Vector::Sparse(a), Vector::Sparse(b)) => Vector::Sparse(a.merge_union(b, |x, y| x * y)),
            (a, b) => fallback_zip("pointwise_mul", a, b, StorageKind::Sparse, |x, y| x * y),
        })
    }

    /// Element-wise quotient, always dense.
    pub fn pointwise_div(&self, other: &Vector<T>) -> Result<Vector<T>> {
        self.check_len(other)?;
        Ok(match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => {
                dense_zip(a, b, |x, y, r| provider().pointwise_divide_arrays(x, y, r))
            }
            (a, b) => fallback_zip("pointwise_div", a, b, StorageKind::Dense, |x, y| x / y),
        })
    }

    /// `alpha * self`, same storage kind.
    pub fn scale(&self, alpha: T) -> Vector<T> {
        match self {
            Vector::Dense(v) => {
                let mut out = DenseVector::zeros(v.len());
                provider().scale_array(alpha, v.as_slice(), out.as_mut_slice());
                Vector::Dense(out)
            }
            Vector::Sparse(v) => Vector::Sparse(v.scale(alpha)),
        }
    }

    /// `-self`, same storage kind.
    pub fn negate(&self) -> Vector<T> {
        self.scale(T::zero() - T::one())
    }

    /// Inner product.
    pub fn dot(&self, other: &Vector<T>) -> Result<T> {
        self.check_len(other)?;
        Ok(match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => provider().dot_product(a.as_slice(), b.as_slice()),
            (Vector::Sparse(a), Vector::Sparse(b)) => a
                .merge_union(b, |x, y| x * y)
                .values()
                .iter()
                .fold(T::zero(), |acc, &v| acc + v),
            (a, b) => {
                log_fallback("dot", a, b);
                (0..a.len()).fold(T::zero(), |acc, i| acc + a.value(i) * b.value(i))
            }
        })
    }
}

impl<T: FloatScalar> Vector<T> {
    /// Euclidean (L2) norm.
    pub fn norm(&self) -> T {
        let stored = match self {
            Vector::Dense(v) => v.as_slice(),
            Vector::Sparse(v) => v.values(),
        };
        stored.iter().fold(T::zero(), |acc, &x| acc + x * x).sqrt()
    }
}

impl<T: Scalar> Vector<T> {
    /// Run `f` on a dense vector that owns the caller's buffer for the call.
    ///
    /// Writes through the vector land in `data` without a copy. A vector
    /// switched to sparse storage inside `f` is written back densely. Fails
    /// with [`LinalgError::DimensionMismatch`] if `f` leaves a vector of a
    /// different length; `data` still receives its values. An empty buffer
    /// is [`LinalgError::InvalidArgument`].
    pub fn with_dense_view<R>(data: &mut Vec<T>, f: impl FnOnce(&mut Vector<T>) -> R) -> Result<R> {
        let len = data.len();
        if len == 0 {
            return Err(LinalgError::InvalidArgument("vector length must be at least 1"));
        }
        let mut view = Vector::Dense(DenseVector::from_vec(core::mem::take(data)));
        let out = f(&mut view);
        let new_len = view.len();
        *data = match view {
            Vector::Dense(v) => v.into_vec(),
            other => other.to_dense().into_vec(),
        };
        if new_len != len {
            return Err(LinalgError::mismatch((len, 1), (new_len, 1)));
        }
        Ok(out)
    }
}

impl<T> From<DenseVector<T>> for Vector<T> {
    fn from(v: DenseVector<T>) -> Self {
        Vector::Dense(v)
    }
}

impl<T> From<SparseVector<T>> for Vector<T> {
    fn from(v: SparseVector<T>) -> Self {
        Vector::Sparse(v)
    }
}

fn dense_zip<T: Scalar>(a: &DenseVector<T>, b: &DenseVector<T>, kernel: impl Fn(&[T], &[T], &mut [T])) -> Vector<T> {
    let mut out = DenseVector::zeros(a.len());
    kernel(a.as_slice(), b.as_slice(), out.as_mut_slice());
    Vector::Dense(out)
}

fn log_fallback<T: Scalar>(op: &str, a: &Vector<T>, b: &Vector<T>) {
    log::debug!(
        target: "polymat_perf",
        "{}: no fast path for vectors ({}, {}), using element-wise fallback",
        op,
        a.kind(),
        b.kind()
    );
}

fn fallback_zip<T: Scalar>(
    op: &str,
    a: &Vector<T>,
    b: &Vector<T>,
    kind: StorageKind,
    f: impl Fn(T, T) -> T,
) -> Vector<T> {
    log_fallback(op, a, b);
    let values: Vec<T> = (0..a.len()).map(|i| f(a.value(i), b.value(i))).collect();
    match kind {
        StorageKind::Sparse => Vector::Sparse(SparseVector::from_slice(&values)),
        _ => Vector::Dense(DenseVector::from_vec(values)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Vector<f64>, Vector<f64>) {
        (
            Vector::dense_from_slice(&[1.0, 0.0, -2.0, 4.0]),
            Vector::sparse_from_slice(&[0.0, 3.0, 2.0, 0.0]),
        )
    }

    #[test]
    fn kinds_of_results() {
        let (d, s) = pair();
        assert_eq!(d.add(&s).unwrap().kind(), StorageKind::Dense);
        assert_eq!(s.add(&s.scale(2.0)).unwrap().kind(), StorageKind::Sparse);
        assert_eq!(d.pointwise_mul(&s).unwrap().kind(), StorageKind::Sparse);
        assert_eq!(s.pointwise_div(&d).unwrap().kind(), StorageKind::Dense);
    }

    #[test]
    fn mixed_and_uniform_agree() {
        let (d, s) = pair();
        let sd = Vector::Dense(s.to_dense());
        let ds = Vector::Sparse(SparseVector::from_slice(d.to_dense().as_slice()));
        assert_eq!(d.add(&s).unwrap().to_dense(), d.add(&sd).unwrap().to_dense());
        assert_eq!(d.sub(&s).unwrap().to_dense(), ds.sub(&s).unwrap().to_dense());
        assert_eq!(d.pointwise_mul(&s).unwrap().to_dense(), ds.pointwise_mul(&s).unwrap().to_dense());
        assert_eq!(d.dot(&s).unwrap(), ds.dot(&s).unwrap());
        assert_eq!(d.dot(&s).unwrap(), d.dot(&sd).unwrap());
        assert_eq!(d.dot(&s).unwrap(), -4.0);
    }

    #[test]
    fn element_access_and_norm() {
        let (mut d, mut s) = pair();
        s.set_at(0, 5.0).unwrap();
        assert_eq!(s.at(0).unwrap(), 5.0);
        d.set_at(3, 0.0).unwrap();
        assert!(matches!(d.at(4), Err(LinalgError::IndexOutOfBounds { .. })));
        assert!((d.norm() - 5.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.negate().at(1).unwrap(), -3.0);
        assert_eq!(d.sub(&d).unwrap().to_dense(), DenseVector::zeros(4));
    }

    #[test]
    fn length_mismatch() {
        let (d, _) = pair();
        let short = Vector::dense_zeros(3);
        assert!(matches!(d.add(&short), Err(LinalgError::DimensionMismatch { .. })));
        assert!(matches!(d.dot(&short), Err(LinalgError::DimensionMismatch { .. })));
    }

    #[test]
    fn sparse_products_keep_non_finite_results() {
        let a = [f64::INFINITY, 0.0, 2.0, f64::NAN];
        let b = [0.0, 5.0, 3.0, 0.0];
        let (sa, sb) = (Vector::sparse_from_slice(&a), Vector::sparse_from_slice(&b));
        let (da, db) = (Vector::dense_from_slice(&a), Vector::dense_from_slice(&b));

        let sparse = sa.pointwise_mul(&sb).unwrap();
        let dense = da.pointwise_mul(&db).unwrap();
        for i in 0..4 {
            let (x, y) = (sparse.at(i).unwrap(), dense.at(i).unwrap());
            assert!(x == y || (x.is_nan() && y.is_nan()), "index {}: {} != {}", i, x, y);
        }
        assert!(sa.dot(&sb).unwrap().is_nan());
        assert!(da.dot(&db).unwrap().is_nan());
    }

    #[test]
    fn dense_view_writes_into_caller_buffer() {
        let mut buf = vec![1.0_f64, 2.0, 3.0];
        let ptr = buf.as_ptr();
        let dot = Vector::with_dense_view(&mut buf, |v| {
            v.set_at(1, -2.0).unwrap();
            v.dot(&Vector::sparse_from_slice(&[0.0, 1.0, 1.0])).unwrap()
        })
        .unwrap();
        assert_eq!(dot, 1.0);
        assert_eq!(buf, [1.0, -2.0, 3.0]);
        assert_eq!(buf.as_ptr(), ptr);

        Vector::with_dense_view(&mut buf, |v| *v = Vector::sparse_from_slice(v.to_dense().as_slice())).unwrap();
        assert_eq!(buf, [1.0, -2.0, 3.0]);

        let r = Vector::with_dense_view(&mut buf, |v| *v = Vector::dense_zeros(2));
        assert!(matches!(r, Err(LinalgError::DimensionMismatch { .. })));
        assert_eq!(buf, [0.0, 0.0]);

        let mut empty: Vec<f64> = Vec::new();
        assert!(matches!(
            Vector::with_dense_view(&mut empty, |_| ()),
            Err(LinalgError::InvalidArgument(_))
        ));
    }
}
