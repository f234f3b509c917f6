use crate::linalg::two_columns_mut;
use crate::traits::{FloatScalar, MatrixMut};

/// Reduce a square matrix to upper Hessenberg form via Householder similarity
/// transforms: `Q^T A Q = H`.
///
/// On return:
/// - `a` is overwritten with the upper Hessenberg matrix H (entries below
///   the subdiagonal are exactly zero)
/// - `q` holds the orthogonal transform Q, so `A = Q H Q^T`
pub fn hessenberg<T: FloatScalar>(a: &mut impl MatrixMut<T>, q: &mut impl MatrixMut<T>) {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "hessenberg requires a square matrix");
    assert_eq!((q.nrows(), q.ncols()), (n, n), "Q must be N x N");

    for i in 0..n {
        for j in 0..n {
            *q.get_mut(i, j) = if i == j { T::one() } else { T::zero() };
        }
    }

    for k in 0..n.saturating_sub(2) {
        let norm = a
            .col_as_slice(k, k + 1)
            .iter()
            .fold(T::zero(), |acc, &v| acc + v * v)
            .sqrt();
        if norm == T::zero() {
            continue;
        }

        let ak1k = *a.get(k + 1, k);
        let sigma = if ak1k >= T::zero() { norm } else { -norm };
        let v0 = ak1k + sigma;
        let tau = v0 / sigma;

        // Householder vector in a[k+2.., k], leading 1 implicit
        for x in a.col_as_mut_slice(k, k + 2) {
            *x = *x / v0;
        }

        // Left: A[k+1.., j] -= tau * v * (v^T A[k+1.., j])
        for j in (k + 1)..n {
            let (v, col) = two_columns_mut(a.as_mut_slice(), n, k, j, k + 1);
            let mut dot = col[0];
            for idx in 1..v.len() {
                dot = dot + v[idx] * col[idx];
            }
            dot = dot * tau;
            col[0] = col[0] - dot;
            for idx in 1..v.len() {
                col[idx] = col[idx] - dot * v[idx];
            }
        }

        // Right: A[i, k+1..] -= tau * (A[i, k+1..] v) v^T
        for i in 0..n {
            let mut dot = *a.get(i, k + 1);
            for jj in (k + 2)..n {
                dot = dot + *a.get(i, jj) * *a.get(jj, k);
            }
            dot = dot * tau;
            *a.get_mut(i, k + 1) = *a.get(i, k + 1) - dot;
            for jj in (k + 2)..n {
                let vj = *a.get(jj, k);
                *a.get_mut(i, jj) = *a.get(i, jj) - dot * vj;
            }
        }

        // Q <- Q (I - tau v v^T)
        for i in 0..n {
            let mut dot = *q.get(i, k + 1);
            for jj in (k + 2)..n {
                dot = dot + *q.get(i, jj) * *a.get(jj, k);
            }
            dot = dot * tau;
            *q.get_mut(i, k + 1) = *q.get(i, k + 1) - dot;
            for jj in (k + 2)..n {
                let vj = *a.get(jj, k);
                *q.get_mut(i, jj) = *q.get(i, jj) - dot * vj;
            }
        }

        *a.get_mut(k + 1, k) = -sigma;
        for x in a.col_as_mut_slice(k, k + 2) {
            *x = T::zero();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::test_util::assert_matrix_near;
    use crate::storage::DenseMatrix;

    const TOL: f64 = 1e-10;

    #[test]
    fn similarity_and_shape() {
        let orig = DenseMatrix::from_rows(4, 4, &[
            4.0, 1.0, -2.0, 2.0, //
            1.0, 2.0, 0.0, 1.0, //
            -2.0, 5.0, 3.0, -2.0, //
            2.0, 1.0, -7.0, -1.0,
        ]);
        let mut h = orig.clone();
        let mut q = DenseMatrix::zeros(4, 4);
        hessenberg(&mut h, &mut q);

        for j in 0..4 {
            for i in (j + 2)..4 {
                assert_eq!(h[(i, j)], 0.0, "H[({},{})]", i, j);
            }
        }
        assert_matrix_near(&(&q.transpose() * &q), &DenseMatrix::eye(4), TOL, "Q^T Q");
        let back = &(&q * &h) * &q.transpose();
        assert_matrix_near(&back, &orig, TOL, "Q H Q^T");
    }

    #[test]
    fn small_matrices_untouched() {
        let orig = DenseMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
        let mut h = orig.clone();
        let mut q = DenseMatrix::zeros(2, 2);
        hessenberg(&mut h, &mut q);
        assert_eq!(h, orig);
        assert_eq!(q, DenseMatrix::eye(2));
    }
}
