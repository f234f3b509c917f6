use crate::error::{LinalgError, Result};
use crate::kernel::{provider, LinearAlgebraProvider};
use crate::linalg::{column_to_vector, dense_rhs, dense_rhs_vector, to_float};
use crate::matrix::Matrix;
use crate::storage::DenseMatrix;
use crate::traits::{FloatScalar, MatrixMut, MatrixRef};
use crate::vector::{DenseVector, Vector};

/// QR sweeps allowed per singular value before giving up.
const MAX_SWEEPS: usize = 1000;

/// Rotate columns `a` and `b`: `(M[:,a], M[:,b]) <- (c*M[:,a] + s*M[:,b], c*M[:,b] - s*M[:,a])`.
fn rotate_columns<T: FloatScalar>(m: &mut impl MatrixMut<T>, a: usize, b: usize, cs: T, sn: T) {
    for i in 0..m.nrows() {
        let ma = *m.get(i, a);
        let mb = *m.get(i, b);
        *m.get_mut(i, a) = cs * ma + sn * mb;
        *m.get_mut(i, b) = cs * mb - sn * ma;
    }
}

fn swap_columns<T: FloatScalar>(m: &mut impl MatrixMut<T>, a: usize, b: usize) {
    for i in 0..m.nrows() {
        let tmp = *m.get(i, a);
        *m.get_mut(i, a) = *m.get(i, b);
        *m.get_mut(i, b) = tmp;
    }
}

/// Classification of the trailing bidiagonal block at the top of each sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    /// `s[p-1]` and `e[k-1]` are negligible: rotate `e[p-2]` away.
    DeflateLast,
    /// `s[k-1]` is negligible: split the problem there.
    Split,
    /// No negligible entries in `k..p`: take one implicit-shift QR step.
    QrStep,
    /// `e[p-2]` is negligible: `s[p-1]` has converged.
    Converged,
}

// ── Golub-Kahan-Reinsch ─────────────────────────────────────────────

/// Singular value decomposition in place, for `m >= n`.
///
/// `a` (`m x n`) is destroyed. On return:
/// - `s[0..n]` holds the singular values, non-negative and sorted descending
/// - `u` (`m x m`) and `v` (`n x n`) hold the full singular vectors when
///   `compute_vectors` is set (otherwise they are not touched)
///
/// so that `A = U * diag(s) * V^T`.
///
/// Phase one reduces `a` to upper bidiagonal form with alternating column
/// and row Householder reflections. Phase two runs implicit-shift QR sweeps
/// with Givens rotations, classifying the trailing block on every pass.
///
/// Each singular-vector pair `(u_k, v_k)` is sign-normalized so the largest
/// entry of `v_k` is positive.
///
/// Fails with [`LinalgError::ConvergenceFailure`] if one singular value takes
/// more than 1000 QR sweeps.
pub fn svd_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    s: &mut [T],
    u: &mut impl MatrixMut<T>,
    v: &mut impl MatrixMut<T>,
    compute_vectors: bool,
) -> Result<()> {
    svd_in_place_capped(a, s, u, v, compute_vectors, MAX_SWEEPS)
}

/// [`svd_in_place`] with an explicit per-value sweep cap.
pub(crate) fn svd_in_place_capped<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    s: &mut [T],
    u: &mut impl MatrixMut<T>,
    v: &mut impl MatrixMut<T>,
    compute_vectors: bool,
    max_sweeps: usize,
) -> Result<()> {
    let m = a.nrows();
    let n = a.ncols();
    assert!(m >= n, "svd_in_place requires rows >= columns");
    assert_eq!(s.len(), n, "singular value slice must have length N");
    if compute_vectors {
        assert_eq!((u.nrows(), u.ncols()), (m, m), "U must be M x M");
        assert_eq!((v.nrows(), v.ncols()), (n, n), "V must be N x N");
    }

    let zero = T::zero();
    let one = T::one();
    let mut e = vec![zero; n];
    let mut work = vec![zero; m];

    let nct = (m - 1).min(n);
    let nrt = n.saturating_sub(2).min(m);

    // ── Bidiagonalization ──

    for k in 0..nct.max(nrt) {
        if k < nct {
            // Column reflector: the k-th diagonal lands in s[k]
            let mut norm = zero;
            for i in k..m {
                norm = norm.hypot(*a.get(i, k));
            }
            if norm != zero {
                if *a.get(k, k) < zero {
                    norm = -norm;
                }
                for x in a.col_as_mut_slice(k, k) {
                    *x = *x / norm;
                }
                *a.get_mut(k, k) = *a.get(k, k) + one;
            }
            s[k] = -norm;
        }

        for j in (k + 1)..n {
            if k < nct && s[k] != zero {
                let mut t = zero;
                for i in k..m {
                    t = t + *a.get(i, k) * *a.get(i, j);
                }
                t = -t / *a.get(k, k);
                for i in k..m {
                    *a.get_mut(i, j) = *a.get(i, j) + t * *a.get(i, k);
                }
            }
            // Row k feeds the row reflector below
            e[j] = *a.get(k, j);
        }

        if compute_vectors && k < nct {
            for i in k..m {
                *u.get_mut(i, k) = *a.get(i, k);
            }
        }

        if k < nrt {
            // Row reflector: the k-th superdiagonal lands in e[k]
            let mut norm = zero;
            for &x in &e[(k + 1)..n] {
                norm = norm.hypot(x);
            }
            if norm != zero {
                if e[k + 1] < zero {
                    norm = -norm;
                }
                for x in &mut e[(k + 1)..n] {
                    *x = *x / norm;
                }
                e[k + 1] = e[k + 1] + one;
            }
            e[k] = -norm;

            if k + 1 < m && e[k] != zero {
                for w in &mut work[(k + 1)..m] {
                    *w = zero;
                }
                for j in (k + 1)..n {
                    for i in (k + 1)..m {
                        work[i] = work[i] + e[j] * *a.get(i, j);
                    }
                }
                for j in (k + 1)..n {
                    let t = -e[j] / e[k + 1];
                    for i in (k + 1)..m {
                        *a.get_mut(i, j) = *a.get(i, j) + t * work[i];
                    }
                }
            }

            if compute_vectors {
                for i in (k + 1)..n {
                    *v.get_mut(i, k) = e[i];
                }
            }
        }
    }

    let mut p = n;
    if nct < n {
        s[nct] = *a.get(nct, nct);
    }
    if nrt + 1 < p {
        e[nrt] = *a.get(nrt, p - 1);
    }
    e[p - 1] = zero;

    // ── Accumulate U and V ──

    if compute_vectors {
        for j in nct..m {
            for x in u.col_as_mut_slice(j, 0) {
                *x = zero;
            }
            *u.get_mut(j, j) = one;
        }
        for k in (0..nct).rev() {
            if s[k] != zero {
                for j in (k + 1)..m {
                    let mut t = zero;
                    for i in k..m {
                        t = t + *u.get(i, k) * *u.get(i, j);
                    }
                    t = -t / *u.get(k, k);
                    for i in k..m {
                        *u.get_mut(i, j) = *u.get(i, j) + t * *u.get(i, k);
                    }
                }
                for x in u.col_as_mut_slice(k, k) {
                    *x = -*x;
                }
                *u.get_mut(k, k) = one + *u.get(k, k);
                for i in 0..k {
                    *u.get_mut(i, k) = zero;
                }
            } else {
                for x in u.col_as_mut_slice(k, 0) {
                    *x = zero;
                }
                *u.get_mut(k, k) = one;
            }
        }

        for k in (0..n).rev() {
            if k < nrt && e[k] != zero {
                for j in (k + 1)..n {
                    let mut t = zero;
                    for i in (k + 1)..n {
                        t = t + *v.get(i, k) * *v.get(i, j);
                    }
                    t = -t / *v.get(k + 1, k);
                    for i in (k + 1)..n {
                        *v.get_mut(i, j) = *v.get(i, j) + t * *v.get(i, k);
                    }
                }
            }
            for x in v.col_as_mut_slice(k, 0) {
                *x = zero;
            }
            *v.get_mut(k, k) = one;
        }
    }

    // ── Implicit-shift QR on the bidiagonal ──

    let pp = p - 1;
    let eps = T::epsilon();
    let tiny = T::min_positive_value() / eps;
    let mut sweeps = 0usize;

    while p > 0 {
        // Largest k < p-1 with negligible e[k], or -1
        let mut k = p as isize - 2;
        while k >= 0 {
            let ku = k as usize;
            if e[ku].abs() <= tiny + eps * (s[ku].abs() + s[ku + 1].abs()) {
                e[ku] = zero;
                break;
            }
            k -= 1;
        }

        let kind = if k == p as isize - 2 {
            Sweep::Converged
        } else {
            let mut ks = p as isize - 1;
            while ks > k {
                let ksu = ks as usize;
                let mut t = e[ksu].abs();
                if ks != k + 1 {
                    t = t + e[ksu - 1].abs();
                }
                if s[ksu].abs() <= tiny + eps * t {
                    s[ksu] = zero;
                    break;
                }
                ks -= 1;
            }
            if ks == k {
                Sweep::QrStep
            } else if ks == p as isize - 1 {
                Sweep::DeflateLast
            } else {
                k = ks;
                Sweep::Split
            }
        };
        let k = (k + 1) as usize;

        match kind {
            Sweep::DeflateLast => {
                let mut f = e[p - 2];
                e[p - 2] = zero;
                for j in (k..=(p - 2)).rev() {
                    let t = s[j].hypot(f);
                    let cs = s[j] / t;
                    let sn = f / t;
                    s[j] = t;
                    if j != k {
                        f = -sn * e[j - 1];
                        e[j - 1] = cs * e[j - 1];
                    }
                    if compute_vectors {
                        rotate_columns(v, j, p - 1, cs, sn);
                    }
                }
            }
            Sweep::Split => {
                let mut f = e[k - 1];
                e[k - 1] = zero;
                for j in k..p {
                    let t = s[j].hypot(f);
                    let cs = s[j] / t;
                    let sn = f / t;
                    s[j] = t;
                    f = -sn * e[j];
                    e[j] = cs * e[j];
                    if compute_vectors {
                        rotate_columns(u, j, k - 1, cs, sn);
                    }
                }
            }
            Sweep::QrStep => {
                if sweeps >= max_sweeps {
                    log::warn!(
                        "svd: singular value {} not converged after {} sweeps",
                        p - 1,
                        sweeps
                    );
                    return Err(LinalgError::ConvergenceFailure);
                }

                // Shift from the trailing 2x2, computed on scaled values
                let scale = s[p - 1]
                    .abs()
                    .max(s[p - 2].abs())
                    .max(e[p - 2].abs())
                    .max(s[k].abs())
                    .max(e[k].abs());
                let sp = s[p - 1] / scale;
                let spm1 = s[p - 2] / scale;
                let epm1 = e[p - 2] / scale;
                let sk = s[k] / scale;
                let ek = e[k] / scale;
                let b = ((spm1 + sp) * (spm1 - sp) + epm1 * epm1) / (one + one);
                let c = (sp * epm1) * (sp * epm1);
                let mut shift = zero;
                if b != zero || c != zero {
                    shift = (b * b + c).sqrt();
                    if b < zero {
                        shift = -shift;
                    }
                    shift = c / (b + shift);
                }
                let mut f = (sk + sp) * (sk - sp) + shift;
                let mut g = sk * ek;

                // Chase the bulge down the bidiagonal
                for j in k..(p - 1) {
                    let t = f.hypot(g);
                    let cs = f / t;
                    let sn = g / t;
                    if j != k {
                        e[j - 1] = t;
                    }
                    f = cs * s[j] + sn * e[j];
                    e[j] = cs * e[j] - sn * s[j];
                    g = sn * s[j + 1];
                    s[j + 1] = cs * s[j + 1];
                    if compute_vectors {
                        rotate_columns(v, j, j + 1, cs, sn);
                    }

                    let t = f.hypot(g);
                    let cs = f / t;
                    let sn = g / t;
                    s[j] = t;
                    f = cs * e[j] + sn * s[j + 1];
                    s[j + 1] = -sn * e[j] + cs * s[j + 1];
                    g = sn * e[j + 1];
                    e[j + 1] = cs * e[j + 1];
                    if compute_vectors && j < m - 1 {
                        rotate_columns(u, j, j + 1, cs, sn);
                    }
                }
                e[p - 2] = f;
                sweeps += 1;
            }
            Sweep::Converged => {
                let mut k = k;
                if s[k] <= zero {
                    s[k] = if s[k] < zero { -s[k] } else { zero };
                    if compute_vectors {
                        for x in v.col_as_mut_slice(k, 0) {
                            *x = -*x;
                        }
                    }
                }

                // Bubble the converged value into descending position
                while k < pp && s[k] < s[k + 1] {
                    s.swap(k, k + 1);
                    if compute_vectors {
                        swap_columns(v, k, k + 1);
                        swap_columns(u, k, k + 1);
                    }
                    k += 1;
                }

                log::trace!("svd: s[{}] converged after {} sweeps", p - 1, sweeps);
                sweeps = 0;
                p -= 1;
            }
        }
    }

    if compute_vectors {
        for k in 0..n {
            let col = v.col_as_slice(k, 0);
            let mut big = 0;
            for i in 1..n {
                if col[i].abs() > col[big].abs() {
                    big = i;
                }
            }
            if col[big] < zero {
                for x in v.col_as_mut_slice(k, 0) {
                    *x = -*x;
                }
                for x in u.col_as_mut_slice(k, 0) {
                    *x = -*x;
                }
            }
        }
    }

    Ok(())
}

// ── Svd ─────────────────────────────────────────────────────────────

/// Singular value decomposition `A = U * diag(S) * V^T` of any `m x n` matrix.
///
/// U is `m x m`, V^T is `n x n`, and S has `min(m, n)` entries sorted
/// descending. Wide input is factored through its transpose.
///
/// # Example
///
/// ```
/// use polymat::Matrix;
///
/// let a = Matrix::dense_from_rows(3, 2, &[1.0_f64, 0.0, 0.0, 2.0, 0.0, 0.0]);
/// let svd = a.svd(true).unwrap();
/// assert!((svd.s()[0] - 2.0).abs() < 1e-12);
/// assert!((svd.s()[1] - 1.0).abs() < 1e-12);
/// assert_eq!(svd.rank(), 2);
/// assert!((svd.condition_number() - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Svd<T> {
    s: Vec<T>,
    u: Option<DenseMatrix<T>>,
    vt: Option<DenseMatrix<T>>,
    nrows: usize,
    ncols: usize,
}

impl<T: FloatScalar> Svd<T> {
    /// Decompose `a`. Singular vectors are only formed when `compute_vectors` is set.
    pub fn new(a: &Matrix<T>, compute_vectors: bool) -> Result<Self> {
        let (nrows, ncols) = a.shape();
        let wide = nrows < ncols;
        let mut work = if wide { a.to_dense().transpose() } else { a.to_dense() };
        let (m, n) = (work.nrows(), work.ncols());

        let mut s = vec![T::zero(); n];
        let (mut u, mut v) = if compute_vectors {
            (DenseMatrix::zeros(m, m), DenseMatrix::zeros(n, n))
        } else {
            (DenseMatrix::zeros(1, 1), DenseMatrix::zeros(1, 1))
        };
        svd_in_place(&mut work, &mut s, &mut u, &mut v, compute_vectors)?;

        let (u, vt) = if !compute_vectors {
            (None, None)
        } else if wide {
            // A^T = U' S V'^T  =>  A = V' S U'^T
            (Some(v), Some(u.transpose()))
        } else {
            (Some(u), Some(v.transpose()))
        };

        Ok(Self {
            s,
            u,
            vt,
            nrows,
            ncols,
        })
    }

    /// Singular values, sorted descending.
    pub fn s(&self) -> &[T] {
        &self.s
    }

    /// Left singular vectors (`m x m`), if computed.
    pub fn u(&self) -> Option<&DenseMatrix<T>> {
        self.u.as_ref()
    }

    /// Transposed right singular vectors (`n x n`), if computed.
    pub fn vt(&self) -> Option<&DenseMatrix<T>> {
        self.vt.as_ref()
    }

    /// Singular values as an `m x n` diagonal matrix.
    pub fn w(&self) -> DenseMatrix<T> {
        let mut w = DenseMatrix::zeros(self.nrows, self.ncols);
        for (i, &s) in self.s.iter().enumerate() {
            w[(i, i)] = s;
        }
        w
    }

    /// `eps * max(m, n) * s_max`, the cutoff below which a singular value counts as zero.
    pub fn default_tolerance(&self) -> T {
        T::epsilon() * to_float::<T>(self.nrows.max(self.ncols)) * self.s[0]
    }

    /// Number of singular values above [`default_tolerance`](Self::default_tolerance).
    pub fn rank(&self) -> usize {
        self.rank_with_tolerance(self.default_tolerance())
    }

    /// Number of singular values strictly above `tol`.
    pub fn rank_with_tolerance(&self, tol: T) -> usize {
        self.s.iter().filter(|&&s| s > tol).count()
    }

    /// Spectral norm, the largest singular value.
    pub fn l2_norm(&self) -> T {
        self.s[0]
    }

    /// `s_max / s_min`; infinite for a singular matrix.
    pub fn condition_number(&self) -> T {
        self.s[0] / self.s[self.s.len() - 1]
    }

    /// `|det(A)|`, the product of the singular values. Square input only.
    pub fn determinant(&self) -> Result<T> {
        if self.nrows != self.ncols {
            return Err(LinalgError::NotSquare {
                rows: self.nrows,
                cols: self.ncols,
            });
        }
        Ok(self.s.iter().fold(T::one(), |acc, &s| acc * s))
    }

    /// Minimum-norm least-squares solve using [`default_tolerance`](Self::default_tolerance).
    pub fn solve(&self, b: &Matrix<T>) -> Result<DenseMatrix<T>> {
        self.solve_with_tolerance(b, self.default_tolerance())
    }

    /// Solve for a single right-hand side using the default tolerance.
    pub fn solve_vector(&self, b: &Vector<T>) -> Result<DenseVector<T>> {
        let b = dense_rhs_vector(b, self.nrows)?;
        self.solve_dense(&b, self.default_tolerance())
            .map(column_to_vector)
    }

    /// `X = V * diag(1/s) * U^T * B`, dropping every direction whose singular
    /// value is at or below `tol`.
    pub fn solve_with_tolerance(&self, b: &Matrix<T>, tol: T) -> Result<DenseMatrix<T>> {
        let b = dense_rhs(b, self.nrows)?;
        self.solve_dense(&b, tol)
    }

    fn solve_dense(&self, b: &DenseMatrix<T>, tol: T) -> Result<DenseMatrix<T>> {
        let (u, vt) = match (&self.u, &self.vt) {
            (Some(u), Some(vt)) => (u, vt),
            _ => {
                return Err(LinalgError::InvalidArgument(
                    "singular vectors were not computed",
                ))
            }
        };
        let k = self.s.len();
        let mut x = DenseMatrix::zeros(self.ncols, b.ncols());
        let mut tmp = vec![T::zero(); k];
        for c in 0..b.ncols() {
            let b_col = b.col(c);
            for (i, t) in tmp.iter_mut().enumerate() {
                *t = if self.s[i] > tol {
                    provider().dot_product(u.col(i), b_col) / self.s[i]
                } else {
                    T::zero()
                };
            }
            for j in 0..self.ncols {
                let mut sum = T::zero();
                for (i, &t) in tmp.iter().enumerate() {
                    sum = sum + vt[(i, j)] * t;
                }
                x[(j, c)] = sum;
            }
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::test_util::{assert_matrix_near, assert_near};

    const TOL: f64 = 1e-10;

    fn reconstruct(svd: &Svd<f64>) -> DenseMatrix<f64> {
        let u = svd.u().unwrap();
        let vt = svd.vt().unwrap();
        &(u * &svd.w()) * vt
    }

    fn check_sorted_non_negative(s: &[f64]) {
        for w in s.windows(2) {
            assert!(w[0] >= w[1], "not descending: {:?}", s);
        }
        assert!(s.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn identity_is_fixed_point() {
        let svd = Matrix::<f64>::dense_identity(3).svd(true).unwrap();
        assert_eq!(svd.s(), &[1.0, 1.0, 1.0]);
        assert_matrix_near(svd.u().unwrap(), &DenseMatrix::eye(3), TOL, "U");
        assert_matrix_near(svd.vt().unwrap(), &DenseMatrix::eye(3), TOL, "V^T");
    }

    #[test]
    fn tall_reconstructs() {
        let a = DenseMatrix::from_rows(4, 3, &[
            2.0, -1.0, 0.5, //
            1.0, 3.0, -2.0, //
            0.0, 1.0, 4.0, //
            -1.5, 2.0, 1.0,
        ]);
        let svd = Svd::new(&Matrix::Dense(a.clone()), true).unwrap();
        check_sorted_non_negative(svd.s());
        let u = svd.u().unwrap();
        assert_matrix_near(&(&u.transpose() * u), &DenseMatrix::eye(4), TOL, "U^T U");
        assert_matrix_near(&reconstruct(&svd), &a, 1e-9, "U S V^T");
    }

    #[test]
    fn wide_reconstructs() {
        let a = DenseMatrix::from_rows(2, 4, &[1.0, 2.0, 0.0, -1.0, 3.0, -1.0, 2.0, 0.5]);
        let svd = Svd::new(&Matrix::Dense(a.clone()), true).unwrap();
        assert_eq!(svd.s().len(), 2);
        check_sorted_non_negative(svd.s());
        assert_eq!(svd.vt().unwrap().nrows(), 4);
        assert_matrix_near(&reconstruct(&svd), &a, 1e-9, "U S V^T");
    }

    #[test]
    fn values_only_match() {
        let a = Matrix::dense_from_rows(3, 3, &[4.0_f64, 1.0, -2.0, 1.0, 2.0, 0.0, -2.0, 0.0, 3.0]);
        let full = a.svd(true).unwrap();
        let bare = a.svd(false).unwrap();
        assert!(bare.u().is_none());
        for (x, y) in full.s().iter().zip(bare.s()) {
            assert_near(*x, *y, TOL, "s");
        }
        assert!(matches!(
            bare.solve_vector(&Vector::dense_from_slice(&[1.0, 2.0, 3.0])),
            Err(LinalgError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rank_and_determinant() {
        let a = Matrix::dense_from_rows(3, 3, &[1.0_f64, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 0.0, 1.0]);
        let svd = a.svd(true).unwrap();
        assert_eq!(svd.rank(), 2);
        assert!(svd.determinant().unwrap().abs() < 1e-10);

        let b = Matrix::dense_from_rows(2, 2, &[3.0_f64, 1.0, 4.0, 2.0]);
        assert_near(b.svd(false).unwrap().determinant().unwrap(), 2.0, TOL, "|det|");
    }

    #[test]
    fn solve_drops_null_directions() {
        // Rank 1: solution is the minimum-norm one
        let a = Matrix::dense_from_rows(2, 2, &[1.0_f64, 1.0, 1.0, 1.0]);
        let svd = a.svd(true).unwrap();
        let x = svd.solve_vector(&Vector::dense_from_slice(&[2.0, 2.0])).unwrap();
        assert_near(x[0], 1.0, TOL, "x0");
        assert_near(x[1], 1.0, TOL, "x1");
        assert!(x.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn solve_square_system() {
        let a = DenseMatrix::from_rows(3, 3, &[3.0, 2.0, -1.0, 2.0, -2.0, 4.0, -1.0, 0.5, -1.0]);
        let svd = Svd::new(&Matrix::Dense(a.clone()), true).unwrap();
        let b = Matrix::dense_from_rows(3, 1, &[1.0, -2.0, 0.0]);
        let x = svd.solve(&b).unwrap();
        assert_matrix_near(&(&a * &x), &b.to_dense(), TOL, "A x = b");
    }

    #[test]
    fn sweep_cap_reports_convergence_failure() {
        let a = DenseMatrix::from_rows(3, 3, &[4.0, 1.0, -2.0, 1.0, 3.0, 0.5, 2.0, -1.0, 5.0]);
        let mut s = vec![0.0; 3];
        let mut u = DenseMatrix::zeros(3, 3);
        let mut v = DenseMatrix::zeros(3, 3);

        let mut work = a.clone();
        let err = svd_in_place_capped(&mut work, &mut s, &mut u, &mut v, true, 0).unwrap_err();
        assert_eq!(err, LinalgError::ConvergenceFailure);

        let mut work = a.clone();
        svd_in_place_capped(&mut work, &mut s, &mut u, &mut v, true, MAX_SWEEPS).unwrap();
        check_sorted_non_negative(&s);
    }
}
