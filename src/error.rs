//! Error types for polymat

use crate::storage::StorageKind;
use thiserror::Error;

/// Result type alias using polymat's [`LinalgError`].
pub type Result<T, E = LinalgError> = core::result::Result<T, E>;

/// Errors from matrix operations and factorizations.
///
/// Variants fall into four groups: shape/argument errors, numerical
/// infeasibility (`Singular`, `NotPositiveDefinite`, `RankDeficient`),
/// non-convergence, and operations a storage kind does not support.
///
/// ```
/// use polymat::{LinalgError, Matrix};
///
/// let not_pd = Matrix::dense_from_rows(2, 2, &[1.0_f64, 5.0, 5.0, 1.0]);
/// assert_eq!(not_pd.cholesky().unwrap_err(), LinalgError::NotPositiveDefinite);
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    /// Operand shapes do not agree.
    #[error("dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        /// Expected `(rows, cols)`.
        expected: (usize, usize),
        /// Got `(rows, cols)`.
        got: (usize, usize),
    },

    /// A square matrix was required.
    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare {
        /// Row count of the offending matrix
        rows: usize,
        /// Column count of the offending matrix
        cols: usize,
    },

    /// Element index outside the matrix or vector.
    #[error("index ({row}, {col}) out of bounds for {nrows}x{ncols}")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },

    /// An argument was structurally invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Matrix is singular (zero pivot or zero diagonal entry).
    #[error("matrix is singular")]
    Singular,

    /// Matrix is not positive definite (required for Cholesky).
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,

    /// Matrix columns are linearly dependent (Gram-Schmidt QR).
    #[error("matrix is rank deficient")]
    RankDeficient,

    /// Iterative algorithm did not converge within the iteration budget.
    #[error("iterative algorithm did not converge")]
    ConvergenceFailure,

    /// Operation requires a symmetric matrix.
    #[error("matrix must be symmetric")]
    NotSymmetric,

    /// Operation would break a structural invariant of the storage kind.
    #[error("operation '{op}' is not supported for {kind} storage")]
    Unsupported {
        /// Storage kind that rejected the operation
        kind: StorageKind,
        /// The operation name
        op: &'static str,
    },
}

impl LinalgError {
    pub(crate) fn mismatch(expected: (usize, usize), got: (usize, usize)) -> Self {
        LinalgError::DimensionMismatch { expected, got }
    }

    pub(crate) fn unsupported(kind: StorageKind, op: &'static str) -> Self {
        LinalgError::Unsupported { kind, op }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = LinalgError::mismatch((2, 3), (3, 2));
        assert_eq!(e.to_string(), "dimension mismatch: expected (2, 3), got (3, 2)");

        let e = LinalgError::unsupported(StorageKind::Diagonal, "permute_rows");
        assert_eq!(
            e.to_string(),
            "operation 'permute_rows' is not supported for diagonal storage"
        );

        assert_eq!(LinalgError::NotSymmetric.to_string(), "matrix must be symmetric");
    }
}
