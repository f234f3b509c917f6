use crate::error::{LinalgError, Result};
use crate::traits::{FloatScalar, MatrixMut};

/// Iterations allowed per eigenvalue in [`tridiagonal_ql`].
const MAX_ITERATIONS: usize = 1000;

/// Householder tridiagonalization of a symmetric matrix, in place.
///
/// On entry `v` holds the symmetric input; only its lower triangle is read.
/// On return:
/// - `v` holds the orthogonal Q with `Q^T A Q = T`
/// - `d[0..n]` is the diagonal of T
/// - `e[1..n]` is the subdiagonal (`e[i] = T[i, i-1]`), with `e[0] = 0`
///
/// Rows are reduced from the bottom up. Each step scales the row by its
/// 1-norm before forming the reflector to avoid under/overflow.
pub fn tridiagonalize<T: FloatScalar>(v: &mut impl MatrixMut<T>, d: &mut [T], e: &mut [T]) {
    let n = v.nrows();
    assert_eq!(n, v.ncols(), "tridiagonalize requires a square matrix");
    assert_eq!(d.len(), n, "diagonal length must equal N");
    assert_eq!(e.len(), n, "off-diagonal length must equal N");
    let zero = T::zero();

    for j in 0..n {
        d[j] = *v.get(n - 1, j);
    }

    for i in (1..n).rev() {
        let scale = d[..i].iter().fold(zero, |acc, &x| acc + x.abs());
        let mut h = zero;

        if scale == zero {
            e[i] = d[i - 1];
            for j in 0..i {
                d[j] = *v.get(i - 1, j);
                *v.get_mut(i, j) = zero;
                *v.get_mut(j, i) = zero;
            }
        } else {
            for x in &mut d[..i] {
                *x = *x / scale;
                h = h + *x * *x;
            }
            let mut f = d[i - 1];
            let mut g = h.sqrt();
            if f > zero {
                g = -g;
            }
            e[i] = scale * g;
            h = h - f * g;
            d[i - 1] = f - g;
            for x in &mut e[..i] {
                *x = zero;
            }

            // e <- A d, using the lower triangle only
            for j in 0..i {
                f = d[j];
                *v.get_mut(j, i) = f;
                g = e[j] + *v.get(j, j) * f;
                for k in (j + 1)..i {
                    g = g + *v.get(k, j) * d[k];
                    e[k] = e[k] + *v.get(k, j) * f;
                }
                e[j] = g;
            }

            f = zero;
            for j in 0..i {
                e[j] = e[j] / h;
                f = f + e[j] * d[j];
            }
            let hh = f / (h + h);
            for j in 0..i {
                e[j] = e[j] - hh * d[j];
            }

            // Rank-2 update of the leading block
            for j in 0..i {
                f = d[j];
                g = e[j];
                for k in j..i {
                    *v.get_mut(k, j) = *v.get(k, j) - (f * e[k] + g * d[k]);
                }
                d[j] = *v.get(i - 1, j);
                *v.get_mut(i, j) = zero;
            }
        }
        d[i] = h;
    }

    // Accumulate the reflectors into Q
    for i in 0..n.saturating_sub(1) {
        *v.get_mut(n - 1, i) = *v.get(i, i);
        *v.get_mut(i, i) = T::one();
        let h = d[i + 1];
        if h != zero {
            for k in 0..=i {
                d[k] = *v.get(k, i + 1) / h;
            }
            for j in 0..=i {
                let mut g = zero;
                for k in 0..=i {
                    g = g + *v.get(k, i + 1) * *v.get(k, j);
                }
                for k in 0..=i {
                    *v.get_mut(k, j) = *v.get(k, j) - g * d[k];
                }
            }
        }
        for k in 0..=i {
            *v.get_mut(k, i + 1) = zero;
        }
    }
    for j in 0..n {
        d[j] = *v.get(n - 1, j);
        *v.get_mut(n - 1, j) = zero;
    }
    *v.get_mut(n - 1, n - 1) = T::one();
    e[0] = zero;
}

/// Implicit-shift QL iteration on a symmetric tridiagonal matrix.
///
/// Takes `d`/`e` as produced by [`tridiagonalize`] and the accumulated Q in
/// `v`. On return `d` holds the eigenvalues sorted ascending, the columns of
/// `v` the matching orthonormal eigenvectors, and `e` is zeroed.
///
/// A subdiagonal entry is negligible once it is at most `eps` times the
/// largest `|d[l]| + |e[l]|` seen so far. Fails with
/// [`LinalgError::ConvergenceFailure`] if an eigenvalue needs more than 1000
/// iterations.
pub fn tridiagonal_ql<T: FloatScalar>(
    v: &mut impl MatrixMut<T>,
    d: &mut [T],
    e: &mut [T],
) -> Result<()> {
    tridiagonal_ql_capped(v, d, e, MAX_ITERATIONS)
}

/// [`tridiagonal_ql`] with an explicit per-eigenvalue iteration cap.
pub(crate) fn tridiagonal_ql_capped<T: FloatScalar>(
    v: &mut impl MatrixMut<T>,
    d: &mut [T],
    e: &mut [T],
    max_iterations: usize,
) -> Result<()> {
    let n = d.len();
    assert_eq!(e.len(), n, "off-diagonal length must equal N");
    assert_eq!((v.nrows(), v.ncols()), (n, n), "eigenvector matrix must be N x N");
    let zero = T::zero();
    let one = T::one();
    let eps = T::epsilon();

    for i in 1..n {
        e[i - 1] = e[i];
    }
    e[n - 1] = zero;

    let mut f = zero;
    let mut tst1 = zero;
    for l in 0..n {
        tst1 = tst1.max(d[l].abs() + e[l].abs());
        let mut m = l;
        // e[n-1] is zero, so this stops by n-1
        while m < n - 1 && e[m].abs() > eps * tst1 {
            m += 1;
        }

        if m > l {
            let mut iter = 0;
            loop {
                iter += 1;
                if iter > max_iterations {
                    log::warn!("tridiagonal_ql: eigenvalue {} not converged after {} iterations", l, max_iterations);
                    return Err(LinalgError::ConvergenceFailure);
                }

                // Shift from the leading 2x2 of the active block
                let mut g = d[l];
                let mut p = (d[l + 1] - g) / (e[l] + e[l]);
                let mut r = p.hypot(one);
                if p < zero {
                    r = -r;
                }
                d[l] = e[l] / (p + r);
                d[l + 1] = e[l] * (p + r);
                let dl1 = d[l + 1];
                let mut h = g - d[l];
                for x in &mut d[(l + 2)..n] {
                    *x = *x - h;
                }
                f = f + h;

                p = d[m];
                let mut c = one;
                let mut c2 = c;
                let mut c3 = c;
                let el1 = e[l + 1];
                let mut s = zero;
                let mut s2 = zero;
                for i in (l..m).rev() {
                    c3 = c2;
                    c2 = c;
                    s2 = s;
                    g = c * e[i];
                    h = c * p;
                    r = p.hypot(e[i]);
                    e[i + 1] = s * r;
                    s = e[i] / r;
                    c = p / r;
                    p = c * d[i] - s * g;
                    d[i + 1] = h + s * (c * g + s * d[i]);

                    for k in 0..n {
                        let vk1 = *v.get(k, i + 1);
                        let vk = *v.get(k, i);
                        *v.get_mut(k, i + 1) = s * vk + c * vk1;
                        *v.get_mut(k, i) = c * vk - s * vk1;
                    }
                }
                p = -s * s2 * c3 * el1 * e[l] / dl1;
                e[l] = s * p;
                d[l] = c * p;

                if e[l].abs() <= eps * tst1 {
                    break;
                }
            }
            log::trace!("tridiagonal_ql: eigenvalue {} converged in {} iterations", l, iter);
        }
        d[l] = d[l] + f;
        e[l] = zero;
    }

    // Selection sort, ascending, carrying eigenvector columns
    for i in 0..n.saturating_sub(1) {
        let mut k = i;
        for j in (i + 1)..n {
            if d[j] < d[k] {
                k = j;
            }
        }
        if k != i {
            d.swap(i, k);
            for row in 0..n {
                let tmp = *v.get(row, i);
                *v.get_mut(row, i) = *v.get(row, k);
                *v.get_mut(row, k) = tmp;
            }
        }
    }
    Ok(())
}
