use core::fmt::Debug;
use num_traits::{Float, Num, One, Zero};

/// Trait for types that can be stored in a matrix or vector.
///
/// Blanket-implemented for all types satisfying the bounds.
/// Covers `f32`, `f64`, and all integer types. `Send + Sync` lets the
/// parallel fan-out hand disjoint column ranges to worker threads.
pub trait Scalar: Copy + PartialEq + Debug + Zero + One + Num + Send + Sync {}

impl<T: Copy + PartialEq + Debug + Zero + One + Num + Send + Sync> Scalar for T {}

/// Trait for floating-point matrix elements.
///
/// Required by every factorization (`sqrt`, `hypot`, `abs`, `epsilon`).
pub trait FloatScalar: Scalar + Float {}

impl<T: Scalar + Float> FloatScalar for T {}

/// Read-only access to a contiguous column-major matrix.
///
/// Implemented by [`DenseMatrix`](crate::DenseMatrix) and
/// [`DenseViewMut`](crate::DenseViewMut), so the in-place factorization
/// kernels in [`linalg`](crate::linalg) work on owned and borrowed storage alike.
pub trait MatrixRef<T> {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
    fn get(&self, row: usize, col: usize) -> &T;

    /// Contiguous slice of column `col` starting at `row_start`.
    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T];
}

/// Mutable access to a contiguous column-major matrix.
pub trait MatrixMut<T>: MatrixRef<T> {
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T;

    /// Mutable contiguous slice of column `col` starting at `row_start`.
    fn col_as_mut_slice(&mut self, col: usize, row_start: usize) -> &mut [T];

    /// The whole column-major backing slice.
    fn as_mut_slice(&mut self) -> &mut [T];
}
