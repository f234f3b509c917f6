//! Raw containers for matrix data.
//!
//! Each storage kind owns its arrays and exposes element accessors; the
//! arithmetic that spans kinds lives in [`matrix`](crate::matrix).

mod dense;
mod diagonal;
mod sparse;
mod symmetric;

pub use dense::{DenseMatrix, DenseView, DenseViewMut};
pub use diagonal::DiagonalStorage;
pub use sparse::SparseCompressedRow;
pub use symmetric::SymmetricPacked;
pub(crate) use symmetric::mirrored_equal;

use core::fmt;

/// Tag identifying how a [`Matrix`](crate::Matrix) stores its elements.
///
/// Fixed at construction; conversions always build a new matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Column-major array of every element.
    Dense,
    /// Compressed sparse row (row pointers, column indices, values).
    Sparse,
    /// Main diagonal only; off-diagonal entries are implicitly zero.
    Diagonal,
    /// Packed upper triangle of a symmetric matrix.
    Symmetric,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::Dense => "dense",
            StorageKind::Sparse => "sparse",
            StorageKind::Diagonal => "diagonal",
            StorageKind::Symmetric => "symmetric",
        };
        f.write_str(name)
    }
}
