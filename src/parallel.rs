//! Fork-join fan-out used by the factorizations and the element-wise kernels.
//!
//! Work is split by recursively halving a column (or element) range. Each
//! half receives half of the remaining thread budget, so the total fan-out
//! never exceeds the degree passed in by the caller. Below the size
//! thresholds everything runs on the calling thread.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Minimum column count of a trailing submatrix before the Cholesky and
/// Householder QR updates split it across threads.
pub const PARALLEL_COLUMN_THRESHOLD: usize = 200;

/// Minimum array length before element-wise kernels split across threads.
pub const PARALLEL_ELEMENT_THRESHOLD: usize = 4096;

/// Parallelism strategy passed to the routines that can fan out.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parallelism {
    /// No parallelism.
    ///
    /// The code is executed sequentially on the same thread that calls a function
    /// and passes this argument.
    None,
    /// Rayon parallelism. Only available with the `rayon` feature.
    ///
    /// The value is the number of threads to use. `0` means all of rayon's threads.
    #[cfg(feature = "rayon")]
    Rayon(usize),
}

// 0 is never stored; 1 encodes `None`, n >= 2 encodes `Rayon(n - 2)`.
static GLOBAL_PARALLELISM: AtomicUsize = {
    #[cfg(feature = "rayon")]
    {
        AtomicUsize::new(2)
    }
    #[cfg(not(feature = "rayon"))]
    {
        AtomicUsize::new(1)
    }
};

/// Sets the parallelism used by factorizations built through [`Matrix`](crate::Matrix).
pub fn set_global_parallelism(parallelism: Parallelism) {
    let value = match parallelism {
        Parallelism::None => 1,
        #[cfg(feature = "rayon")]
        Parallelism::Rayon(n) => n.saturating_add(2),
    };
    GLOBAL_PARALLELISM.store(value, Ordering::Relaxed);
}

/// Gets the global parallelism setting.
pub fn get_global_parallelism() -> Parallelism {
    match GLOBAL_PARALLELISM.load(Ordering::Relaxed) {
        #[cfg(feature = "rayon")]
        n if n >= 2 => Parallelism::Rayon(n - 2),
        _ => Parallelism::None,
    }
}

/// The amount of threads that should ideally execute an operation with the given parallelism.
#[inline]
pub fn parallelism_degree(parallelism: Parallelism) -> usize {
    match parallelism {
        Parallelism::None => 1,
        #[cfg(feature = "rayon")]
        Parallelism::Rayon(0) => rayon::current_num_threads(),
        #[cfg(feature = "rayon")]
        Parallelism::Rayon(n_threads) => n_threads,
    }
}

/// Executes the two operations, possibly in parallel, while splitting the amount of parallelism
/// between the two.
#[inline]
pub fn join_raw(
    op_a: impl Send + FnOnce(Parallelism),
    op_b: impl Send + FnOnce(Parallelism),
    parallelism: Parallelism,
) {
    match parallelism {
        Parallelism::None => {
            op_a(parallelism);
            op_b(parallelism);
        }
        #[cfg(feature = "rayon")]
        Parallelism::Rayon(n_threads) => {
            let n_threads = if n_threads > 0 {
                n_threads
            } else {
                rayon::current_num_threads()
            };
            if n_threads <= 1 {
                op_a(Parallelism::None);
                op_b(Parallelism::None);
            } else {
                let (n_a, n_b) = split_budget(n_threads);
                log::trace!(target: "polymat", "join_raw: fork with {n_threads} threads ({n_a} + {n_b})");
                rayon::join(|| op_a(Parallelism::Rayon(n_a)), || op_b(Parallelism::Rayon(n_b)));
            }
        }
    }
}

/// Splits a thread budget of `n >= 2` into two non-zero halves summing to `n`.
#[cfg_attr(not(feature = "rayon"), allow(dead_code))]
#[inline]
fn split_budget(n: usize) -> (usize, usize) {
    (n - n / 2, n / 2)
}

/// Applies `op(first_col, block)` to a column-major block of `ncols` columns of
/// height `nrows`, recursively halving the block while it has more than
/// `threshold` columns and more than one thread is available.
///
/// `op` receives the index of the first column of the block it was given,
/// relative to the start of `data`. Every call sees a write-disjoint block.
pub fn split_columns<T: Send>(
    data: &mut [T],
    nrows: usize,
    first_col: usize,
    threshold: usize,
    parallelism: Parallelism,
    op: &(impl Sync + Fn(usize, &mut [T])),
) {
    let ncols = if nrows == 0 { 0 } else { data.len() / nrows };
    if ncols > threshold && parallelism_degree(parallelism) > 1 {
        let mid = ncols / 2;
        let (left, right) = data.split_at_mut(mid * nrows);
        join_raw(
            |par| split_columns(left, nrows, first_col, threshold, par, op),
            |par| split_columns(right, nrows, first_col + mid, threshold, par, op),
            parallelism,
        );
    } else {
        op(first_col, data);
    }
}
