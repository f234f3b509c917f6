use crate::error::{LinalgError, Result};
use crate::kernel::{provider, LinearAlgebraProvider};
use crate::storage::StorageKind;
use crate::traits::Scalar;
use crate::vector::{DenseVector, Vector};

use super::{fallback, Matrix};

fn check_elementwise<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(LinalgError::mismatch(a.shape(), b.shape()));
    }
    Ok(())
}

fn check_product<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>) -> Result<()> {
    if a.ncols() != b.nrows() {
        return Err(LinalgError::mismatch((a.ncols(), b.ncols()), b.shape()));
    }
    Ok(())
}

fn check_result<T: Scalar>(expected: (usize, usize), result: &Matrix<T>) -> Result<()> {
    if result.shape() != expected {
        return Err(LinalgError::mismatch(expected, result.shape()));
    }
    Ok(())
}

fn log_fallback<T: Scalar>(op: &str, a: &Matrix<T>, b: &Matrix<T>, result: &Matrix<T>) {
    log::debug!(
        target: "polymat_perf",
        "{}: no fast path for ({}, {}) -> {}, using element-wise fallback",
        op,
        a.kind(),
        b.kind(),
        result.kind()
    );
}

// ── Result kinds for the allocating forms ───────────────────────────

fn sum_kind(a: StorageKind, b: StorageKind) -> StorageKind {
    use StorageKind::*;
    match (a, b) {
        _ if a == b => a,
        (Diagonal, Sparse) | (Sparse, Diagonal) => Sparse,
        (Diagonal, Symmetric) | (Symmetric, Diagonal) => Symmetric,
        _ => Dense,
    }
}

fn product_kind(a: StorageKind, b: StorageKind) -> StorageKind {
    use StorageKind::*;
    match (a, b) {
        (Diagonal, Diagonal) => Diagonal,
        (Sparse, _) | (_, Sparse) => Sparse,
        _ if a == b => a,
        _ => Dense,
    }
}

// Implicit zeros divide to NaN, so only kinds that store every entry keep their kind.
fn quotient_kind(a: StorageKind, b: StorageKind) -> StorageKind {
    match (a, b) {
        (StorageKind::Symmetric, StorageKind::Symmetric) => StorageKind::Symmetric,
        _ => StorageKind::Dense,
    }
}

fn matmul_kind(a: StorageKind, b: StorageKind) -> StorageKind {
    if a == b && a != StorageKind::Symmetric {
        a
    } else {
        StorageKind::Dense
    }
}

// ── Element-wise operations ─────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// `result = self + other`.
    ///
    /// Runs a kind-specific kernel when all three matrices share a storage
    /// kind and the element-wise fallback otherwise. Shapes are validated
    /// before anything is written.
    pub fn add_into(&self, other: &Matrix<T>, result: &mut Matrix<T>) -> Result<()> {
        check_elementwise(self, other)?;
        check_result(self.shape(), result)?;
        match (self, other, result) {
            (Matrix::Dense(a), Matrix::Dense(b), Matrix::Dense(r)) => {
                provider().add_arrays(a.as_slice(), b.as_slice(), r.as_mut_slice());
            }
            (Matrix::Sparse(a), Matrix::Sparse(b), Matrix::Sparse(r)) => *r = a.merge_union(b, |x, y| x + y),
            (Matrix::Diagonal(a), Matrix::Diagonal(b), Matrix::Diagonal(r)) => *r = a.zip_with(b, |x, y| x + y),
            (Matrix::Symmetric(a), Matrix::Symmetric(b), Matrix::Symmetric(r)) => {
                *r = a.zip_with(b, |x, y| x + y)
            }
            (a, b, r) => {
                log_fallback("add", a, b, r);
                return fallback::add(a, b, r);
            }
        }
        Ok(())
    }

    /// `result = self - other`.
    ///
    /// Passing the same matrix as both operands clears `result` without
    /// visiting any element.
    pub fn sub_into(&self, other: &Matrix<T>, result: &mut Matrix<T>) -> Result<()> {
        check_elementwise(self, other)?;
        check_result(self.shape(), result)?;
        if core::ptr::eq(self, other) {
            result.clear();
            return Ok(());
        }
        match (self, other, result) {
            (Matrix::Dense(a), Matrix::Dense(b), Matrix::Dense(r)) => {
                provider().subtract_arrays(a.as_slice(), b.as_slice(), r.as_mut_slice());
            }
            (Matrix::Sparse(a), Matrix::Sparse(b), Matrix::Sparse(r)) => *r = a.merge_union(b, |x, y| x - y),
            (Matrix::Diagonal(a), Matrix::Diagonal(b), Matrix::Diagonal(r)) => *r = a.zip_with(b, |x, y| x - y),
            (Matrix::Symmetric(a), Matrix::Symmetric(b), Matrix::Symmetric(r)) => {
                *r = a.zip_with(b, |x, y| x - y)
            }
            (a, b, r) => {
                log_fallback("sub", a, b, r);
                return fallback::sub(a, b, r);
            }
        }
        Ok(())
    }

    /// `result[i, j] = self[i, j] * other[i, j]`.
    pub fn pointwise_mul_into(&self, other: &Matrix<T>, result: &mut Matrix<T>) -> Result<()> {
        check_elementwise(self, other)?;
        check_result(self.shape(), result)?;
        match (self, other, result) {
            (Matrix::Dense(a), Matrix::Dense(b), Matrix::Dense(r)) => {
                provider().pointwise_multiply_arrays(a.as_slice(), b.as_slice(), r.as_mut_slice());
            }
            (Matrix::Sparse(a), Matrix::Sparse(b), Matrix::Sparse(r)) => *r = a.merge_union(b, |x, y| x * y),
            (Matrix::Diagonal(a), Matrix::Diagonal(b), Matrix::Diagonal(r)) => *r = a.zip_with(b, |x, y| x * y),
            (Matrix::Symmetric(a), Matrix::Symmetric(b), Matrix::Symmetric(r)) => {
                *r = a.zip_with(b, |x, y| x * y)
            }
            (a, b, r) => {
                log_fallback("pointwise_mul", a, b, r);
                return fallback::pointwise_mul(a, b, r);
            }
        }
        Ok(())
    }

    /// `result[i, j] = self[i, j] / other[i, j]`.
    ///
    /// Sparse operands always take the fallback: the implicit zeros divide
    /// to NaN, which the merge kernels would skip.
    pub fn pointwise_div_into(&self, other: &Matrix<T>, result: &mut Matrix<T>) -> Result<()> {
        check_elementwise(self, other)?;
        check_result(self.shape(), result)?;
        match (self, other, result) {
            (Matrix::Dense(a), Matrix::Dense(b), Matrix::Dense(r)) => {
                provider().pointwise_divide_arrays(a.as_slice(), b.as_slice(), r.as_mut_slice());
            }
            (Matrix::Diagonal(a), Matrix::Diagonal(b), Matrix::Diagonal(r)) => *r = a.zip_with(b, |x, y| x / y),
            (Matrix::Symmetric(a), Matrix::Symmetric(b), Matrix::Symmetric(r)) => {
                *r = a.zip_with(b, |x, y| x / y)
            }
            (a, b, r) => {
                log_fallback("pointwise_div", a, b, r);
                return fallback::pointwise_div(a, b, r);
            }
        }
        Ok(())
    }

    /// `self + other`, in the sparsest kind that can hold the sum.
    pub fn add(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        check_elementwise(self, other)?;
        let mut result = Matrix::zeros_of_kind(sum_kind(self.kind(), other.kind()), self.nrows(), self.ncols())?;
        self.add_into(other, &mut result)?;
        Ok(result)
    }

    /// `self - other`, in the sparsest kind that can hold the difference.
    ///
    /// `a.sub(&a)` returns a zero matrix of `a`'s kind directly.
    ///
    /// ```
    /// use polymat::Matrix;
    ///
    /// let a = Matrix::dense_from_rows(2, 2, &[1.0_f64, f64::INFINITY, 3.0, 4.0]);
    /// let z = a.sub(&a).unwrap();
    /// assert_eq!(z.at(0, 1).unwrap(), 0.0);
    /// ```
    pub fn sub(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        check_elementwise(self, other)?;
        if core::ptr::eq(self, other) {
            return Matrix::zeros_of_kind(self.kind(), self.nrows(), self.ncols());
        }
        let mut result = Matrix::zeros_of_kind(sum_kind(self.kind(), other.kind()), self.nrows(), self.ncols())?;
        self.sub_into(other, &mut result)?;
        Ok(result)
    }

    /// Element-wise product. A diagonal or sparse operand makes the result
    /// diagonal or sparse.
    pub fn pointwise_mul(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        check_elementwise(self, other)?;
        let kind = product_kind(self.kind(), other.kind());
        let mut result = Matrix::zeros_of_kind(kind, self.nrows(), self.ncols())?;
        self.pointwise_mul_into(other, &mut result)?;
        Ok(result)
    }

    /// Element-wise quotient.
    pub fn pointwise_div(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        check_elementwise(self, other)?;
        let kind = quotient_kind(self.kind(), other.kind());
        let mut result = Matrix::zeros_of_kind(kind, self.nrows(), self.ncols())?;
        self.pointwise_div_into(other, &mut result)?;
        Ok(result)
    }
}

// ── Products ────────────────────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// `result = self * other`.
    ///
    /// Fast paths: dense, sparse and diagonal products within one kind, and
    /// any sparse, diagonal or symmetric left operand times a dense right
    /// operand into a dense result.
    pub fn matmul_into(&self, other: &Matrix<T>, result: &mut Matrix<T>) -> Result<()> {
        check_product(self, other)?;
        check_result((self.nrows(), other.ncols()), result)?;
        let m = self.nrows();
        match (self, other, result) {
            (Matrix::Dense(a), Matrix::Dense(b), Matrix::Dense(r)) => {
                provider().matrix_multiply(a.as_slice(), m, a.ncols(), b.as_slice(), b.ncols(), r.as_mut_slice());
            }
            (Matrix::Sparse(a), Matrix::Sparse(b), Matrix::Sparse(r)) => *r = a.matmul(b),
            (Matrix::Diagonal(a), Matrix::Diagonal(b), Matrix::Diagonal(r)) => *r = a.matmul(b),
            (Matrix::Sparse(a), Matrix::Dense(b), Matrix::Dense(r)) => {
                for (j, r_col) in r.as_mut_slice().chunks_mut(m).enumerate() {
                    a.mul_dense_vector(b.col(j), r_col);
                }
            }
            (Matrix::Diagonal(a), Matrix::Dense(b), Matrix::Dense(r)) => {
                for (j, r_col) in r.as_mut_slice().chunks_mut(m).enumerate() {
                    a.mul_dense_vector(b.col(j), r_col);
                }
            }
            (Matrix::Symmetric(a), Matrix::Dense(b), Matrix::Dense(r)) => {
                for (j, r_col) in r.as_mut_slice().chunks_mut(m).enumerate() {
                    a.mul_dense_vector(b.col(j), r_col);
                }
            }
            (Matrix::Dense(a), Matrix::Diagonal(b), Matrix::Dense(r)) => {
                let diag = b.diagonal();
                for (j, r_col) in r.as_mut_slice().chunks_mut(m).enumerate() {
                    match diag.get(j) {
                        Some(&d) => provider().scale_array(d, a.col(j), r_col),
                        None => r_col.iter_mut().for_each(|x| *x = T::zero()),
                    }
                }
            }
            (a, b, r) => {
                log_fallback("matmul", a, b, r);
                return fallback::matmul(a, b, r);
            }
        }
        Ok(())
    }

    /// `self * other`. Dense, sparse and diagonal products stay in their
    /// kind; every other combination yields a dense matrix.
    pub fn matmul(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        check_product(self, other)?;
        let kind = matmul_kind(self.kind(), other.kind());
        let mut result = Matrix::zeros_of_kind(kind, self.nrows(), other.ncols())?;
        self.matmul_into(other, &mut result)?;
        Ok(result)
    }

    /// `y = self * x`.
    ///
    /// Every storage kind has a fast path for a dense `x`; a sparse `x` goes
    /// through the fallback.
    ///
    /// ```
    /// use polymat::{Matrix, Vector};
    ///
    /// let a = Matrix::sparse_from_rows(2, 3, &[1.0_f64, 0.0, 2.0, 0.0, 3.0, 0.0]);
    /// let y = a.mul_vector(&Vector::dense_from_slice(&[1.0, 1.0, 1.0])).unwrap();
    /// assert_eq!(y.as_slice(), &[3.0, 3.0]);
    /// ```
    pub fn mul_vector(&self, x: &Vector<T>) -> Result<DenseVector<T>> {
        if x.len() != self.ncols() {
            return Err(LinalgError::mismatch((self.ncols(), 1), (x.len(), 1)));
        }
        let mut y = vec![T::zero(); self.nrows()];
        match (self, x) {
            (Matrix::Dense(a), Vector::Dense(v)) => {
                provider().matrix_multiply(a.as_slice(), a.nrows(), a.ncols(), v.as_slice(), 1, &mut y);
            }
            (Matrix::Sparse(a), Vector::Dense(v)) => a.mul_dense_vector(v.as_slice(), &mut y),
            (Matrix::Diagonal(a), Vector::Dense(v)) => a.mul_dense_vector(v.as_slice(), &mut y),
            (Matrix::Symmetric(a), Vector::Dense(v)) => a.mul_dense_vector(v.as_slice(), &mut y),
            (a, v) => {
                log::debug!(
                    target: "polymat_perf",
                    "mul_vector: no fast path for ({}, {}), using element-wise fallback",
                    a.kind(),
                    v.kind()
                );
                fallback::mul_vector(a, v, &mut y)?;
            }
        }
        Ok(DenseVector::from_vec(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DenseMatrix;

    fn sample(kind: StorageKind) -> Matrix<f64> {
        let rows = [4.0, 0.0, 1.0, 0.0, 3.0, 0.0, 1.0, 0.0, 2.0];
        let dense = Matrix::dense_from_rows(3, 3, &rows);
        match kind {
            StorageKind::Diagonal => Matrix::diagonal_from_slice(3, 3, &[4.0, 3.0, 2.0]),
            other => dense.convert_to(other).unwrap(),
        }
    }

    const KINDS: [StorageKind; 4] = [
        StorageKind::Dense,
        StorageKind::Sparse,
        StorageKind::Diagonal,
        StorageKind::Symmetric,
    ];

    #[test]
    fn fast_paths_match_fallback() {
        for &ka in &KINDS {
            for &kb in &KINDS {
                let (a, b) = (sample(ka), sample(kb));
                for op in 0..4 {
                    let fast = match op {
                        0 => a.add(&b),
                        1 => a.sub(&b),
                        2 => a.pointwise_mul(&b),
                        _ => a.matmul(&b),
                    }
                    .unwrap();
                    let mut slow = Matrix::dense_zeros(3, 3);
                    match op {
                        0 => fallback::add(&a, &b, &mut slow),
                        1 => fallback::sub(&a, &b, &mut slow),
                        2 => fallback::pointwise_mul(&a, &b, &mut slow),
                        _ => fallback::matmul(&a, &b, &mut slow),
                    }
                    .unwrap();
                    assert_eq!(fast.to_dense(), slow.to_dense(), "op {} on ({}, {})", op, ka, kb);
                }
            }
        }
    }

    #[test]
    fn result_kinds() {
        let d = sample(StorageKind::Diagonal);
        let s = sample(StorageKind::Sparse);
        let y = sample(StorageKind::Symmetric);
        let g = sample(StorageKind::Dense);
        assert_eq!(d.add(&s).unwrap().kind(), StorageKind::Sparse);
        assert_eq!(d.add(&y).unwrap().kind(), StorageKind::Symmetric);
        assert_eq!(s.add(&y).unwrap().kind(), StorageKind::Dense);
        assert_eq!(g.pointwise_mul(&d).unwrap().kind(), StorageKind::Dense);
        assert_eq!(d.pointwise_mul(&d).unwrap().kind(), StorageKind::Diagonal);
        assert_eq!(s.pointwise_mul(&d).unwrap().kind(), StorageKind::Sparse);
        assert_eq!(g.pointwise_mul(&s).unwrap().kind(), StorageKind::Sparse);
        assert_eq!(y.matmul(&y).unwrap().kind(), StorageKind::Dense);
        assert_eq!(s.matmul(&s).unwrap().kind(), StorageKind::Sparse);
    }

    #[test]
    fn self_subtraction_is_zero() {
        for &k in &KINDS {
            let a = sample(k);
            let z = a.sub(&a).unwrap();
            assert_eq!(z.kind(), k);
            assert_eq!(z.to_dense(), DenseMatrix::zeros(3, 3));

            let mut r = Matrix::dense_from_fn(3, 3, |_, _| 7.0);
            a.sub_into(&a, &mut r).unwrap();
            assert_eq!(r.to_dense(), DenseMatrix::zeros(3, 3));
        }
    }

    #[test]
    fn mismatched_shapes_rejected_untouched() {
        let a = Matrix::dense_from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
        let b = Matrix::sparse_zeros(2, 3);
        assert!(matches!(a.add(&b), Err(LinalgError::DimensionMismatch { .. })));

        let mut r = Matrix::dense_from_fn(2, 3, |_, _| 5.0);
        assert!(matches!(a.add_into(&a, &mut r), Err(LinalgError::DimensionMismatch { .. })));
        assert_eq!(r.to_dense(), DenseMatrix::fill(2, 3, 5.0));

        assert!(matches!(b.matmul(&a), Err(LinalgError::DimensionMismatch { .. })));
        let x = Vector::dense_from_slice(&[1.0, 2.0, 3.0]);
        assert!(matches!(a.mul_vector(&x), Err(LinalgError::DimensionMismatch { .. })));
    }

    #[test]
    fn incompatible_result_kind_rejected() {
        let a = sample(StorageKind::Dense);
        let mut r = Matrix::diagonal_zeros(3, 3);
        assert!(matches!(
            a.add_into(&a, &mut r),
            Err(LinalgError::Unsupported { kind: StorageKind::Diagonal, .. })
        ));
        assert_eq!(r.to_dense(), DenseMatrix::zeros(3, 3));
    }

    #[test]
    fn pointwise_div_kinds() {
        let a = sample(StorageKind::Diagonal);
        let q = a.pointwise_div(&a).unwrap();
        assert_eq!(q.kind(), StorageKind::Dense);
        for i in 0..3 {
            for j in 0..3 {
                let v = q.at(i, j).unwrap();
                if i == j {
                    assert_eq!(v, 1.0);
                } else {
                    assert!(v.is_nan());
                }
            }
        }

        // A diagonal target drops the NaN off-diagonals.
        let mut r = Matrix::diagonal_zeros(3, 3);
        a.pointwise_div_into(&a, &mut r).unwrap();
        assert_eq!(r.to_dense(), DenseMatrix::eye(3));

        let g = Matrix::dense_from_rows(2, 2, &[2.0_f64, 4.0, 6.0, 8.0]);
        let h = Matrix::sparse_from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
        assert_eq!(g.pointwise_div(&h).unwrap().to_dense(), DenseMatrix::fill(2, 2, 2.0));
    }

    #[test]
    fn mul_vector_every_kind() {
        let x = Vector::dense_from_slice(&[1.0, -1.0, 2.0]);
        let xs = Vector::sparse_from_slice(&[1.0, -1.0, 2.0]);
        for &k in &KINDS {
            let a = sample(k);
            let expected = a.to_dense().mul_slice(x.to_dense().as_slice());
            assert_eq!(a.mul_vector(&x).unwrap().as_slice(), expected.as_slice(), "{}", k);
            assert_eq!(a.mul_vector(&xs).unwrap().as_slice(), expected.as_slice(), "{}", k);
        }
    }

    fn same_or_both_nan(x: f64, y: f64) -> bool {
        x == y || (x.is_nan() && y.is_nan())
    }

    fn non_finite_sample(kind: StorageKind) -> Matrix<f64> {
        let inf = f64::INFINITY;
        let rows = [inf, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, f64::NAN];
        match kind {
            StorageKind::Diagonal => Matrix::diagonal_from_slice(3, 3, &[inf, 0.0, f64::NAN]),
            StorageKind::Symmetric => Matrix::symmetric_from_fn(3, |i, j| rows[i * 3 + j]),
            other => Matrix::dense_from_rows(3, 3, &rows).convert_to(other).unwrap(),
        }
    }

    #[test]
    fn element_wise_ops_agree_with_dense_on_non_finite_values() {
        for &ka in &KINDS {
            for &kb in &KINDS {
                let (a, b) = (non_finite_sample(ka), non_finite_sample(kb));
                for op in 0..4 {
                    let f = |x: f64, y: f64| match op {
                        0 => x + y,
                        1 => x - y,
                        2 => x * y,
                        _ => x / y,
                    };
                    let got = match op {
                        0 => a.add(&b),
                        1 => a.sub(&b),
                        2 => a.pointwise_mul(&b),
                        _ => a.pointwise_div(&b),
                    }
                    .unwrap();
                    for i in 0..3 {
                        for j in 0..3 {
                            let want = f(a.at(i, j).unwrap(), b.at(i, j).unwrap());
                            let v = got.at(i, j).unwrap();
                            assert!(
                                same_or_both_nan(v, want),
                                "op {} on ({}, {}) at ({}, {}): {} != {}",
                                op,
                                ka,
                                kb,
                                i,
                                j,
                                v,
                                want
                            );
                        }
                    }
                }
            }
        }
    }
}
