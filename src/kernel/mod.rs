//! Low-level array kernels behind the storage fast paths and factorizations.
//!
//! Every array argument is a flat column-major slice. The fast paths in
//! [`matrix`](crate::matrix) and [`vector`](crate::vector) call through these
//! traits once they have confirmed that all operands share a storage kind, so
//! swapping the provider never changes which code path is taken.

mod managed;

pub use managed::ManagedProvider;

use num_complex::Complex;

use crate::error::Result;
use crate::traits::{FloatScalar, Scalar};

/// Element-wise and BLAS-style array primitives.
///
/// Output slices must have the same length as the inputs; implementations
/// panic otherwise. Callers validate shapes before reaching this layer.
pub trait LinearAlgebraProvider<T: Scalar> {
    /// `result[i] = x[i] + y[i]`
    fn add_arrays(&self, x: &[T], y: &[T], result: &mut [T]);

    /// `result[i] = x[i] - y[i]`
    fn subtract_arrays(&self, x: &[T], y: &[T], result: &mut [T]);

    /// `result[i] = alpha * x[i]`
    fn scale_array(&self, alpha: T, x: &[T], result: &mut [T]);

    /// `result[i] = x[i] * y[i]`
    fn pointwise_multiply_arrays(&self, x: &[T], y: &[T], result: &mut [T]);

    /// `result[i] = x[i] / y[i]`
    fn pointwise_divide_arrays(&self, x: &[T], y: &[T], result: &mut [T]);

    /// `sum(x[i] * y[i])`
    fn dot_product(&self, x: &[T], y: &[T]) -> T;

    /// `c = a * b` with `a` of shape `a_rows x a_cols` and `b` of shape
    /// `a_cols x b_cols`. `c` is overwritten.
    fn matrix_multiply(
        &self,
        a: &[T],
        a_rows: usize,
        a_cols: usize,
        b: &[T],
        b_cols: usize,
        c: &mut [T],
    );
}

/// In-place factor and factored-solve kernels.
pub trait FactorizationProvider<T: FloatScalar>: LinearAlgebraProvider<T> {
    /// LU-factor the `order x order` matrix in `data` with partial pivoting.
    ///
    /// Writes the row swap performed at each step into `pivots` and returns
    /// the number of swaps.
    fn lu_factor(&self, data: &mut [T], order: usize, pivots: &mut [usize]) -> Result<usize>;

    /// Solve `A X = B` in place given the output of [`lu_factor`](Self::lu_factor).
    /// `rhs` is `order x rhs_cols`.
    fn lu_solve_factored(
        &self,
        factor: &[T],
        order: usize,
        pivots: &[usize],
        rhs: &mut [T],
        rhs_cols: usize,
    );

    /// Overwrite `data` with its lower Cholesky factor.
    fn cholesky_factor(&self, data: &mut [T], order: usize) -> Result<()>;

    /// Solve `L L^T X = B` in place. `rhs` is `order x rhs_cols`.
    fn cholesky_solve_factored(&self, factor: &[T], order: usize, rhs: &mut [T], rhs_cols: usize);

    /// Least-squares solve `R X = Q^T B` given explicit `q` (`rows x q_cols`)
    /// and `r` (`q_cols x cols`). `b` is `rows x b_cols`; `x` is `cols x b_cols`.
    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<()>;

    /// Full eigen-decomposition of the `order x order` matrix in `input`.
    ///
    /// Writes eigenvectors (one per column, complex pairs split into real and
    /// imaginary columns), eigenvalues, and the real block-diagonal matrix.
    fn eigen_decomp(
        &self,
        is_symmetric: bool,
        order: usize,
        input: &[T],
        eigenvectors: &mut [T],
        eigenvalues: &mut [Complex<T>],
        block_diagonal: &mut [T],
    ) -> Result<()>;
}

/// The provider used by the storage fast paths and factorizations.
#[inline]
pub fn provider() -> &'static ManagedProvider {
    static PROVIDER: ManagedProvider = ManagedProvider;
    &PROVIDER
}
