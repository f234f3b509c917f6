use num_complex::Complex;

use crate::error::{LinalgError, Result};
use crate::traits::{FloatScalar, MatrixMut, MatrixRef};

/// Helper: get element with dereference for calling Float methods.
#[inline]
fn g<T: Copy>(m: &impl MatrixRef<T>, i: usize, j: usize) -> T {
    *m.get(i, j)
}

#[inline]
fn constant<T: FloatScalar>(c: f64) -> T {
    num_traits::cast(c).unwrap_or_else(T::zero)
}

/// Smith's complex division `x / y`, avoiding overflow in `|y|^2`.
fn cdiv<T: FloatScalar>(x: Complex<T>, y: Complex<T>) -> Complex<T> {
    if y.re.abs() > y.im.abs() {
        let r = y.im / y.re;
        let d = y.re + r * y.im;
        Complex::new((x.re + r * x.im) / d, (x.im - r * x.re) / d)
    } else {
        let r = y.re / y.im;
        let d = y.im + r * y.re;
        Complex::new((r * x.re + x.im) / d, (r * x.im - x.re) / d)
    }
}

/// Real Schur reduction of an upper Hessenberg matrix with eigenvectors.
///
/// `h` is the Hessenberg matrix and `v` the transform from [`hessenberg`]
/// (`A = V H V^T`). Runs the implicit double-shift QR algorithm, then
/// back-substitutes through the quasi-triangular result and transforms back.
///
/// On return:
/// - `d[i] + i*e[i]` is the `i`-th eigenvalue. A complex-conjugate pair
///   occupies two consecutive slots with `e > 0` first.
/// - the columns of `v` hold the eigenvectors. For a pair at `(i, i+1)` the
///   real and imaginary parts sit in columns `i` and `i+1`.
/// - `h` is destroyed.
///
/// Exceptional shifts are applied on the 10th and 30th iteration for the
/// same eigenvalue. Fails with [`LinalgError::ConvergenceFailure`] after
/// `max(30 n, 100)` iterations without deflation.
///
/// [`hessenberg`]: crate::linalg::hessenberg
pub fn hqr2<T: FloatScalar>(
    h: &mut impl MatrixMut<T>,
    v: &mut impl MatrixMut<T>,
    d: &mut [T],
    e: &mut [T],
) -> Result<()> {
    let max_iter = (30 * h.nrows()).max(100);
    hqr2_capped(h, v, d, e, max_iter)
}

/// [`hqr2`] with an explicit iteration cap.
pub(crate) fn hqr2_capped<T: FloatScalar>(
    h: &mut impl MatrixMut<T>,
    v: &mut impl MatrixMut<T>,
    d: &mut [T],
    e: &mut [T],
    max_iter: usize,
) -> Result<()> {
    let nn = h.nrows();
    assert_eq!(nn, h.ncols(), "hqr2 requires a square matrix");
    assert_eq!((v.nrows(), v.ncols()), (nn, nn), "V must be N x N");
    assert_eq!(d.len(), nn, "eigenvalue slice must have length N");
    assert_eq!(e.len(), nn, "eigenvalue slice must have length N");

    let zero = T::zero();
    let one = T::one();
    let two = one + one;
    let eps = T::epsilon();
    let mut exshift = zero;
    let (mut p, mut q, mut r, mut s, mut z) = (zero, zero, zero, zero, zero);
    let (mut w, mut x, mut y) = (zero, zero, zero);

    let mut norm = zero;
    for i in 0..nn {
        for j in i.saturating_sub(1)..nn {
            norm = norm + g(h, i, j).abs();
        }
    }

    // ── Schur reduction ──

    let mut remaining = nn;
    let mut iter = 0usize;
    while remaining > 0 {
        let n = remaining - 1;

        // Look for a single small subdiagonal element
        let mut l = n;
        while l > 0 {
            s = g(h, l - 1, l - 1).abs() + g(h, l, l).abs();
            if s == zero {
                s = norm;
            }
            if g(h, l, l - 1).abs() < eps * s {
                break;
            }
            l -= 1;
        }

        if l == n {
            // One root
            *h.get_mut(n, n) = g(h, n, n) + exshift;
            d[n] = g(h, n, n);
            e[n] = zero;
            log::trace!("hqr2: eigenvalue {} isolated after {} iterations", n, iter);
            remaining -= 1;
            iter = 0;
        } else if l == n - 1 {
            // Two roots
            w = g(h, n, n - 1) * g(h, n - 1, n);
            p = (g(h, n - 1, n - 1) - g(h, n, n)) / two;
            q = p * p + w;
            z = q.abs().sqrt();
            *h.get_mut(n, n) = g(h, n, n) + exshift;
            *h.get_mut(n - 1, n - 1) = g(h, n - 1, n - 1) + exshift;
            x = g(h, n, n);

            if q >= zero {
                // Real pair
                z = if p >= zero { p + z } else { p - z };
                d[n - 1] = x + z;
                d[n] = d[n - 1];
                if z != zero {
                    d[n] = x - w / z;
                }
                e[n - 1] = zero;
                e[n] = zero;
                x = g(h, n, n - 1);
                s = x.abs() + z.abs();
                p = x / s;
                q = z / s;
                r = (p * p + q * q).sqrt();
                p = p / r;
                q = q / r;

                for j in (n - 1)..nn {
                    z = g(h, n - 1, j);
                    *h.get_mut(n - 1, j) = q * z + p * g(h, n, j);
                    *h.get_mut(n, j) = q * g(h, n, j) - p * z;
                }
                for i in 0..=n {
                    z = g(h, i, n - 1);
                    *h.get_mut(i, n - 1) = q * z + p * g(h, i, n);
                    *h.get_mut(i, n) = q * g(h, i, n) - p * z;
                }
                for i in 0..nn {
                    z = g(v, i, n - 1);
                    *v.get_mut(i, n - 1) = q * z + p * g(v, i, n);
                    *v.get_mut(i, n) = q * g(v, i, n) - p * z;
                }
            } else {
                // Complex pair
                d[n - 1] = x + p;
                d[n] = x + p;
                e[n - 1] = z;
                e[n] = -z;
            }
            log::trace!("hqr2: eigenvalues {}..={} isolated after {} iterations", n - 1, n, iter);
            remaining -= 2;
            iter = 0;
        } else {
            // No convergence yet: form the shift
            x = g(h, n, n);
            y = zero;
            w = zero;
            if l < n {
                y = g(h, n - 1, n - 1);
                w = g(h, n, n - 1) * g(h, n - 1, n);
            }

            // Wilkinson's ad hoc shift
            if iter == 10 {
                exshift = exshift + x;
                for i in 0..=n {
                    *h.get_mut(i, i) = g(h, i, i) - x;
                }
                s = g(h, n, n - 1).abs() + g(h, n - 1, n - 2).abs();
                x = constant::<T>(0.75) * s;
                y = x;
                w = -constant::<T>(0.4375) * s * s;
            }

            // Second ad hoc shift
            if iter == 30 {
                s = (y - x) / two;
                s = s * s + w;
                if s > zero {
                    s = s.sqrt();
                    if y < x {
                        s = -s;
                    }
                    s = x - w / ((y - x) / two + s);
                    for i in 0..=n {
                        *h.get_mut(i, i) = g(h, i, i) - s;
                    }
                    exshift = exshift + s;
                    x = constant::<T>(0.964);
                    y = x;
                    w = x;
                }
            }

            iter += 1;
            if iter > max_iter {
                log::warn!("hqr2: eigenvalue {} not converged after {} iterations", n, max_iter);
                return Err(LinalgError::ConvergenceFailure);
            }

            // Look for two consecutive small subdiagonal elements
            let mut m = n - 2;
            loop {
                z = g(h, m, m);
                r = x - z;
                s = y - z;
                p = (r * s - w) / g(h, m + 1, m) + g(h, m, m + 1);
                q = g(h, m + 1, m + 1) - z - r - s;
                r = g(h, m + 2, m + 1);
                s = p.abs() + q.abs() + r.abs();
                p = p / s;
                q = q / s;
                r = r / s;
                if m == l {
                    break;
                }
                if g(h, m, m - 1).abs() * (q.abs() + r.abs())
                    < eps * (p.abs() * (g(h, m - 1, m - 1).abs() + z.abs() + g(h, m + 1, m + 1).abs()))
                {
                    break;
                }
                m -= 1;
            }

            for i in (m + 2)..=n {
                *h.get_mut(i, i - 2) = zero;
                if i > m + 2 {
                    *h.get_mut(i, i - 3) = zero;
                }
            }

            // Double QR step on rows l..=n and columns m..=n
            for k in m..n {
                let notlast = k != n - 1;
                if k != m {
                    p = g(h, k, k - 1);
                    q = g(h, k + 1, k - 1);
                    r = if notlast { g(h, k + 2, k - 1) } else { zero };
                    x = p.abs() + q.abs() + r.abs();
                    if x == zero {
                        continue;
                    }
                    p = p / x;
                    q = q / x;
                    r = r / x;
                }

                s = (p * p + q * q + r * r).sqrt();
                if p < zero {
                    s = -s;
                }
                if s == zero {
                    continue;
                }
                if k != m {
                    *h.get_mut(k, k - 1) = -s * x;
                } else if l != m {
                    *h.get_mut(k, k - 1) = -g(h, k, k - 1);
                }
                p = p + s;
                x = p / s;
                y = q / s;
                z = r / s;
                q = q / p;
                r = r / p;

                // Row modification
                for j in k..nn {
                    p = g(h, k, j) + q * g(h, k + 1, j);
                    if notlast {
                        p = p + r * g(h, k + 2, j);
                        *h.get_mut(k + 2, j) = g(h, k + 2, j) - p * z;
                    }
                    *h.get_mut(k, j) = g(h, k, j) - p * x;
                    *h.get_mut(k + 1, j) = g(h, k + 1, j) - p * y;
                }

                // Column modification
                for i in 0..=n.min(k + 3) {
                    p = x * g(h, i, k) + y * g(h, i, k + 1);
                    if notlast {
                        p = p + z * g(h, i, k + 2);
                        *h.get_mut(i, k + 2) = g(h, i, k + 2) - p * r;
                    }
                    *h.get_mut(i, k) = g(h, i, k) - p;
                    *h.get_mut(i, k + 1) = g(h, i, k + 1) - p * q;
                }

                // Accumulate transformations
                for i in 0..nn {
                    p = x * g(v, i, k) + y * g(v, i, k + 1);
                    if notlast {
                        p = p + z * g(v, i, k + 2);
                        *v.get_mut(i, k + 2) = g(v, i, k + 2) - p * r;
                    }
                    *v.get_mut(i, k) = g(v, i, k) - p;
                    *v.get_mut(i, k + 1) = g(v, i, k + 1) - p * q;
                }
            }
        }
    }

    if norm == zero {
        return Ok(());
    }

    // ── Back-substitution on the quasi-triangular form ──

    for n in (0..nn).rev() {
        p = d[n];
        q = e[n];

        if q == zero {
            // Real vector
            let mut l = n;
            *h.get_mut(n, n) = one;
            for i in (0..n).rev() {
                w = g(h, i, i) - p;
                r = zero;
                for j in l..=n {
                    r = r + g(h, i, j) * g(h, j, n);
                }
                if e[i] < zero {
                    z = w;
                    s = r;
                } else {
                    l = i;
                    if e[i] == zero {
                        let denom = if w != zero { w } else { eps * norm };
                        *h.get_mut(i, n) = -r / denom;
                    } else {
                        // 2x2 real block
                        x = g(h, i, i + 1);
                        y = g(h, i + 1, i);
                        q = (d[i] - p) * (d[i] - p) + e[i] * e[i];
                        let t = (x * s - z * r) / q;
                        *h.get_mut(i, n) = t;
                        let below = if x.abs() > z.abs() {
                            (-r - w * t) / x
                        } else {
                            (-s - y * t) / z
                        };
                        *h.get_mut(i + 1, n) = below;
                    }

                    // Overflow control
                    let t = g(h, i, n).abs();
                    if (eps * t) * t > one {
                        for j in i..=n {
                            *h.get_mut(j, n) = g(h, j, n) / t;
                        }
                    }
                }
            }
        } else if q < zero {
            // Complex vector: real part in column n-1, imaginary in column n
            let mut l = n - 1;
            if g(h, n, n - 1).abs() > g(h, n - 1, n).abs() {
                *h.get_mut(n - 1, n - 1) = q / g(h, n, n - 1);
                *h.get_mut(n - 1, n) = -(g(h, n, n) - p) / g(h, n, n - 1);
            } else {
                let c = cdiv(
                    Complex::new(zero, -g(h, n - 1, n)),
                    Complex::new(g(h, n - 1, n - 1) - p, q),
                );
                *h.get_mut(n - 1, n - 1) = c.re;
                *h.get_mut(n - 1, n) = c.im;
            }
            *h.get_mut(n, n - 1) = zero;
            *h.get_mut(n, n) = one;

            for i in (0..n - 1).rev() {
                let mut ra = zero;
                let mut sa = zero;
                for j in l..=n {
                    ra = ra + g(h, i, j) * g(h, j, n - 1);
                    sa = sa + g(h, i, j) * g(h, j, n);
                }
                w = g(h, i, i) - p;

                if e[i] < zero {
                    z = w;
                    r = ra;
                    s = sa;
                } else {
                    l = i;
                    if e[i] == zero {
                        let c = cdiv(Complex::new(-ra, -sa), Complex::new(w, q));
                        *h.get_mut(i, n - 1) = c.re;
                        *h.get_mut(i, n) = c.im;
                    } else {
                        // 2x2 complex block
                        x = g(h, i, i + 1);
                        y = g(h, i + 1, i);
                        let mut vr = (d[i] - p) * (d[i] - p) + e[i] * e[i] - q * q;
                        let vi = (d[i] - p) * two * q;
                        if vr == zero && vi == zero {
                            vr = eps * norm * (w.abs() + q.abs() + x.abs() + y.abs() + z.abs());
                        }
                        let c = cdiv(
                            Complex::new(x * r - z * ra + q * sa, x * s - z * sa - q * ra),
                            Complex::new(vr, vi),
                        );
                        *h.get_mut(i, n - 1) = c.re;
                        *h.get_mut(i, n) = c.im;
                        if x.abs() > z.abs() + q.abs() {
                            *h.get_mut(i + 1, n - 1) =
                                (-ra - w * g(h, i, n - 1) + q * g(h, i, n)) / x;
                            *h.get_mut(i + 1, n) = (-sa - w * g(h, i, n) - q * g(h, i, n - 1)) / x;
                        } else {
                            let c = cdiv(
                                Complex::new(-r - y * g(h, i, n - 1), -s - y * g(h, i, n)),
                                Complex::new(z, q),
                            );
                            *h.get_mut(i + 1, n - 1) = c.re;
                            *h.get_mut(i + 1, n) = c.im;
                        }
                    }

                    // Overflow control
                    let t = g(h, i, n - 1).abs().max(g(h, i, n).abs());
                    if (eps * t) * t > one {
                        for j in i..=n {
                            *h.get_mut(j, n - 1) = g(h, j, n - 1) / t;
                            *h.get_mut(j, n) = g(h, j, n) / t;
                        }
                    }
                }
            }
        }
    }

    // ── Back transformation: V <- V * (upper part of H) ──

    for j in (0..nn).rev() {
        for i in 0..nn {
            z = zero;
            for k in 0..=j {
                z = z + g(v, i, k) * g(h, k, j);
            }
            *v.get_mut(i, j) = z;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::hessenberg;
    use crate::linalg::test_util::assert_near;
    use crate::storage::DenseMatrix;

    const TOL: f64 = 1e-9;

    fn eig(a: &DenseMatrix<f64>) -> (DenseMatrix<f64>, Vec<f64>, Vec<f64>) {
        let n = a.nrows();
        let mut h = a.clone();
        let mut v = DenseMatrix::zeros(n, n);
        let mut d = vec![0.0; n];
        let mut e = vec![0.0; n];
        hessenberg(&mut h, &mut v);
        hqr2(&mut h, &mut v, &mut d, &mut e).unwrap();
        (v, d, e)
    }

    #[test]
    fn real_eigenpairs() {
        // Upper triangular: eigenvalues are the diagonal
        let a = DenseMatrix::from_rows(3, 3, &[2.0, 1.0, 4.0, 0.0, -3.0, 5.0, 0.0, 0.0, 7.0]);
        let (v, d, e) = eig(&a);
        let mut sorted = d.clone();
        sorted.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_near(sorted[0], -3.0, TOL, "l0");
        assert_near(sorted[1], 2.0, TOL, "l1");
        assert_near(sorted[2], 7.0, TOL, "l2");
        assert!(e.iter().all(|&x| x == 0.0));

        for k in 0..3 {
            let col: Vec<f64> = (0..3).map(|i| v[(i, k)]).collect();
            let av = a.mul_slice(&col);
            for i in 0..3 {
                assert_near(av[i], d[k] * col[i], TOL, "A v = l v");
            }
        }
    }

    #[test]
    fn complex_pair_vectors() {
        let a = DenseMatrix::from_rows(3, 3, &[1.0, -2.0, 0.0, 3.0, 1.0, 0.5, 0.0, 0.2, 4.0]);
        let (v, d, e) = eig(&a);
        let k = (0..3).find(|&k| e[k] > 0.0).expect("complex pair");
        assert_near(e[k + 1], -e[k], TOL, "conjugate");
        assert_near(d[k + 1], d[k], TOL, "shared real part");

        // A (vr + i vi) = (d + i e)(vr + i vi)
        let vr: Vec<f64> = (0..3).map(|i| v[(i, k)]).collect();
        let vi: Vec<f64> = (0..3).map(|i| v[(i, k + 1)]).collect();
        let avr = a.mul_slice(&vr);
        let avi = a.mul_slice(&vi);
        for i in 0..3 {
            assert_near(avr[i], d[k] * vr[i] - e[k] * vi[i], TOL, "real part");
            assert_near(avi[i], e[k] * vr[i] + d[k] * vi[i], TOL, "imaginary part");
        }
    }

    #[test]
    fn cdiv_matches_complex_division() {
        let x = Complex::new(3.0_f64, -1.0);
        for y in [Complex::new(2.0, 0.5), Complex::new(0.25, -4.0)] {
            let q = cdiv(x, y);
            let expected = x / y;
            assert_near(q.re, expected.re, 1e-14, "re");
            assert_near(q.im, expected.im, 1e-14, "im");
        }
    }

    #[test]
    fn iteration_cap_reports_convergence_failure() {
        let a = DenseMatrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0]);
        let mut h = a.clone();
        let mut v = DenseMatrix::zeros(3, 3);
        let mut d = vec![0.0; 3];
        let mut e = vec![0.0; 3];
        hessenberg(&mut h, &mut v);
        assert_eq!(
            hqr2_capped(&mut h, &mut v, &mut d, &mut e, 0).unwrap_err(),
            LinalgError::ConvergenceFailure
        );
    }
}
