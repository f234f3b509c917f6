//! # polymat
//!
//! Storage-polymorphic matrices and vectors with the classic dense
//! factorizations: LU, Householder and Gram-Schmidt QR, Cholesky, SVD, and
//! symmetric/nonsymmetric eigenvalue decomposition.
//!
//! ## Quick start
//!
//! ```
//! use polymat::{Matrix, Vector};
//!
//! // Solve a linear system Ax = b
//! let a = Matrix::dense_from_rows(3, 3, &[
//!     2.0_f64, 1.0, -1.0,
//!     -3.0, -1.0, 2.0,
//!     -2.0, 1.0, 2.0,
//! ]);
//! let b = Vector::dense_from_slice(&[8.0, -11.0, -3.0]);
//! let x = a.lu().unwrap().solve_vector(&b).unwrap(); // x = [2, 3, -1]
//! assert!((x[0] - 2.0).abs() < 1e-12);
//! ```
//!
//! ## Modules
//!
//! - [`storage`]: raw containers. Column-major [`DenseMatrix`] (plus the
//!   borrowed [`DenseView`] / [`DenseViewMut`]), compressed-row
//!   [`SparseCompressedRow`], [`DiagonalStorage`], and packed
//!   [`SymmetricPacked`].
//!
//! - [`matrix`]: [`Matrix`], a closed enum over the storage kinds. Binary
//!   operations dispatch on the `(lhs, rhs, result)` kind triple to a fast
//!   path, or to the element-wise routines in [`matrix::fallback`].
//!
//! - [`vector`]: [`Vector`], dense or sparse.
//!
//! - [`linalg`]: Factorizations. Free functions operate on
//!   `&mut impl MatrixMut<T>` in place; the wrapper structs ([`Lu`],
//!   [`Cholesky`], [`Qr`], [`GramSchmidt`], [`Svd`], [`Evd`]) factor once and
//!   answer `solve` / `determinant` from the cached factors.
//!
//! - [`kernel`]: The array primitives behind the fast paths, with the
//!   portable [`ManagedProvider`](kernel::ManagedProvider).
//!
//! - [`parallel`]: Fork-join helpers used by the Cholesky and QR trailing
//!   updates and by large element-wise kernels.
//!
//! - [`traits`]: Element trait hierarchy:
//!   - [`Scalar`]: all matrix elements (`Copy + PartialEq + Debug + Num + Send + Sync`)
//!   - [`FloatScalar`]: real floats (`Scalar + Float`), used by factorizations
//!   - [`MatrixRef`] / [`MatrixMut`]: column-major access for in-place kernels
//!
//! ## Logging
//!
//! Uses the [`log`](https://docs.rs/log) facade; nothing is printed unless the
//! application installs a logger. Operations that miss every fast path log
//! at `debug` level under the `polymat_perf` target.
//!
//! ## Cargo features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `rayon` | yes     | Parallel trailing updates and element-wise kernels |

pub mod error;
pub mod kernel;
pub mod linalg;
pub mod matrix;
pub mod parallel;
pub mod storage;
pub mod traits;
pub mod vector;

pub use error::{LinalgError, Result};
pub use linalg::{Cholesky, Evd, GramSchmidt, Lu, Qr, QrMethod, Svd, Symmetricity};
pub use matrix::Matrix;
pub use parallel::{get_global_parallelism, set_global_parallelism, Parallelism};
pub use storage::{
    DenseMatrix, DenseView, DenseViewMut, DiagonalStorage, SparseCompressedRow, StorageKind, SymmetricPacked,
};
pub use traits::{FloatScalar, MatrixMut, MatrixRef, Scalar};
pub use vector::{DenseVector, SparseVector, Vector};

pub use num_complex::Complex;
