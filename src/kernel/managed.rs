use num_complex::Complex;

use super::{FactorizationProvider, LinearAlgebraProvider};
use crate::error::{LinalgError, Result};
use crate::linalg::{
    cholesky_in_place, cholesky_solve_in_place, hessenberg, hqr2, lu_in_place,
    lu_solve_in_place, solve_upper_triangular, tridiagonal_ql, tridiagonalize,
};
use crate::parallel::{
    get_global_parallelism, split_columns, PARALLEL_COLUMN_THRESHOLD, PARALLEL_ELEMENT_THRESHOLD,
};
use crate::storage::{DenseMatrix, DenseView, DenseViewMut};
use crate::traits::{FloatScalar, MatrixMut, MatrixRef, Scalar};

/// Portable reference provider written with plain loops.
///
/// Element-wise kernels fan out through [`split_columns`] once an array
/// reaches [`PARALLEL_ELEMENT_THRESHOLD`] elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagedProvider;

fn zip_map<T: Scalar>(x: &[T], y: &[T], result: &mut [T], f: impl Sync + Fn(T, T) -> T) {
    assert_eq!(x.len(), y.len(), "array length mismatch");
    assert_eq!(x.len(), result.len(), "result length mismatch");
    split_columns(
        result,
        1,
        0,
        PARALLEL_ELEMENT_THRESHOLD,
        get_global_parallelism(),
        &|first, block: &mut [T]| {
            for (k, out) in block.iter_mut().enumerate() {
                *out = f(x[first + k], y[first + k]);
            }
        },
    );
}

impl<T: Scalar> LinearAlgebraProvider<T> for ManagedProvider {
    fn add_arrays(&self, x: &[T], y: &[T], result: &mut [T]) {
        zip_map(x, y, result, |a, b| a + b);
    }

    fn subtract_arrays(&self, x: &[T], y: &[T], result: &mut [T]) {
        zip_map(x, y, result, |a, b| a - b);
    }

    fn scale_array(&self, alpha: T, x: &[T], result: &mut [T]) {
        zip_map(x, x, result, |a, _| alpha * a);
    }

    fn pointwise_multiply_arrays(&self, x: &[T], y: &[T], result: &mut [T]) {
        zip_map(x, y, result, |a, b| a * b);
    }

    fn pointwise_divide_arrays(&self, x: &[T], y: &[T], result: &mut [T]) {
        zip_map(x, y, result, |a, b| a / b);
    }

    fn dot_product(&self, x: &[T], y: &[T]) -> T {
        assert_eq!(x.len(), y.len(), "array length mismatch");
        x.iter()
            .zip(y)
            .fold(T::zero(), |acc, (&a, &b)| acc + a * b)
    }

    fn matrix_multiply(
        &self,
        a: &[T],
        a_rows: usize,
        a_cols: usize,
        b: &[T],
        b_cols: usize,
        c: &mut [T],
    ) {
        assert_eq!(a.len(), a_rows * a_cols, "lhs length mismatch");
        assert_eq!(b.len(), a_cols * b_cols, "rhs length mismatch");
        assert_eq!(c.len(), a_rows * b_cols, "result length mismatch");
        // Columns of C are independent: C[:, j] = sum_k A[:, k] * B[k, j]
        split_columns(
            c,
            a_rows,
            0,
            PARALLEL_COLUMN_THRESHOLD,
            get_global_parallelism(),
            &|first, block: &mut [T]| {
                for (jj, c_col) in block.chunks_mut(a_rows).enumerate() {
                    let j = first + jj;
                    c_col.iter_mut().for_each(|x| *x = T::zero());
                    for k in 0..a_cols {
                        let b_kj = b[j * a_cols + k];
                        let a_col = &a[k * a_rows..(k + 1) * a_rows];
                        for (ci, &ai) in c_col.iter_mut().zip(a_col) {
                            *ci = *ci + ai * b_kj;
                        }
                    }
                }
            },
        );
    }
}

impl<T: FloatScalar> FactorizationProvider<T> for ManagedProvider {
    fn lu_factor(&self, data: &mut [T], order: usize, pivots: &mut [usize]) -> Result<usize> {
        let mut a = DenseViewMut::new(data, order, order);
        lu_in_place(&mut a, pivots)
    }

    fn lu_solve_factored(
        &self,
        factor: &[T],
        order: usize,
        pivots: &[usize],
        rhs: &mut [T],
        rhs_cols: usize,
    ) {
        let lu = DenseView::new(factor, order, order);
        let mut b = DenseViewMut::new(rhs, order, rhs_cols);
        lu_solve_in_place(&lu, pivots, &mut b);
    }

    fn cholesky_factor(&self, data: &mut [T], order: usize) -> Result<()> {
        let mut a = DenseViewMut::new(data, order, order);
        cholesky_in_place(&mut a, get_global_parallelism())
    }

    fn cholesky_solve_factored(&self, factor: &[T], order: usize, rhs: &mut [T], rhs_cols: usize) {
        let l = DenseView::new(factor, order, order);
        let mut b = DenseViewMut::new(rhs, order, rhs_cols);
        cholesky_solve_in_place(&l, &mut b);
    }

    fn qr_solve_factored(
        &self,
        q: &[T],
        r: &[T],
        rows: usize,
        cols: usize,
        q_cols: usize,
        b: &[T],
        b_cols: usize,
        x: &mut [T],
    ) -> Result<()> {
        if b.len() != rows * b_cols {
            return Err(LinalgError::mismatch((rows, b_cols), (b.len() / b_cols.max(1), b_cols)));
        }
        let q = DenseView::new(q, rows, q_cols);
        let r = DenseView::new(r, q_cols, cols);
        let b = DenseView::new(b, rows, b_cols);
        let mut x = DenseViewMut::new(x, cols, b_cols);

        // x[0..cols, k] = (Q^T b)[0..cols, k]
        for k in 0..b_cols {
            let b_col = b.col_as_slice(k, 0);
            for i in 0..cols {
                *x.get_mut(i, k) = self.dot_product(q.col_as_slice(i, 0), b_col);
            }
        }
        solve_upper_triangular(&r, &mut x)
    }

    fn eigen_decomp(
        &self,
        is_symmetric: bool,
        order: usize,
        input: &[T],
        eigenvectors: &mut [T],
        eigenvalues: &mut [Complex<T>],
        block_diagonal: &mut [T],
    ) -> Result<()> {
        let n = order;
        assert_eq!(input.len(), n * n, "input length mismatch");
        assert_eq!(eigenvalues.len(), n, "eigenvalue length mismatch");
        let mut d = vec![T::zero(); n];
        let mut e = vec![T::zero(); n];

        if is_symmetric {
            eigenvectors.copy_from_slice(input);
            let mut v = DenseViewMut::new(eigenvectors, n, n);
            tridiagonalize(&mut v, &mut d, &mut e);
            tridiagonal_ql(&mut v, &mut d, &mut e)?;
            // tridiagonal_ql leaves e zeroed
        } else {
            let mut h = DenseMatrix::from_slice(n, n, input);
            let mut v = DenseViewMut::new(eigenvectors, n, n);
            hessenberg(&mut h, &mut v);
            hqr2(&mut h, &mut v, &mut d, &mut e)?;
        }

        let mut blocks = DenseViewMut::new(block_diagonal, n, n);
        blocks.as_mut_slice().iter_mut().for_each(|x| *x = T::zero());
        for i in 0..n {
            eigenvalues[i] = Complex::new(d[i], e[i]);
            *blocks.get_mut(i, i) = d[i];
            if e[i] > T::zero() {
                *blocks.get_mut(i, i + 1) = e[i];
            } else if e[i] < T::zero() {
                *blocks.get_mut(i, i - 1) = e[i];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elementwise_kernels() {
        let p = ManagedProvider;
        let x = [1.0_f64, 2.0, 3.0];
        let y = [4.0_f64, 5.0, 6.0];
        let mut out = [0.0; 3];
        p.add_arrays(&x, &y, &mut out);
        assert_eq!(out, [5.0, 7.0, 9.0]);
        p.subtract_arrays(&x, &y, &mut out);
        assert_eq!(out, [-3.0, -3.0, -3.0]);
        p.scale_array(2.0, &x, &mut out);
        assert_eq!(out, [2.0, 4.0, 6.0]);
        p.pointwise_multiply_arrays(&x, &y, &mut out);
        assert_eq!(out, [4.0, 10.0, 18.0]);
        p.pointwise_divide_arrays(&y, &x, &mut out);
        assert_eq!(out, [4.0, 2.5, 2.0]);
        assert_eq!(p.dot_product(&x, &y), 32.0);
    }

    #[test]
    fn large_arrays_match_sequential() {
        let n = 3 * PARALLEL_ELEMENT_THRESHOLD + 7;
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| (n - i) as f64).collect();
        let mut out = vec![0.0; n];
        ManagedProvider.add_arrays(&x, &y, &mut out);
        assert!(out.iter().all(|&v| v == n as f64));
    }

    #[test]
    fn matrix_multiply_column_major() {
        // [[1, 2], [3, 4]] * [[5], [6]] = [[17], [39]]
        let a = [1.0_f64, 3.0, 2.0, 4.0];
        let b = [5.0_f64, 6.0];
        let mut c = [0.0; 2];
        ManagedProvider.matrix_multiply(&a, 2, 2, &b, 1, &mut c);
        assert_eq!(c, [17.0, 39.0]);
    }

    #[test]
    fn cholesky_factor_and_solve() {
        // [[4, 2], [2, 3]] x = [8, 7] -> x = [1.25, 1.5]
        let mut data = [4.0_f64, 2.0, 2.0, 3.0];
        ManagedProvider.cholesky_factor(&mut data, 2).unwrap();
        let mut rhs = [8.0_f64, 7.0];
        ManagedProvider.cholesky_solve_factored(&data, 2, &mut rhs, 1);
        assert!((rhs[0] - 1.25).abs() < 1e-12);
        assert!((rhs[1] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn eigen_decomp_rotation_has_complex_pair() {
        // [[0, -1], [1, 0]] has eigenvalues +-i
        let input = [0.0_f64, 1.0, -1.0, 0.0];
        let mut vecs = [0.0; 4];
        let mut vals = [Complex::new(0.0, 0.0); 2];
        let mut blocks = [0.0; 4];
        ManagedProvider
            .eigen_decomp(false, 2, &input, &mut vecs, &mut vals, &mut blocks)
            .unwrap();
        assert!(vals[0].re.abs() < 1e-12);
        assert!((vals[0].im.abs() - 1.0).abs() < 1e-12);
        assert!((vals[0].im + vals[1].im).abs() < 1e-12);
    }
}
