//! Error types for normalization, matrix construction and resampling.

use thiserror::Error;

use crate::array::ReadError;

/// Error types for subvolume operations.
///
/// Every variant carries the offending parameter so a failed call can be
/// diagnosed without re-running it.
#[derive(Debug, Error)]
pub enum Error {
    /// Rank or length mismatch among matrices, bounding boxes, shapes or
    /// transform parameters.
    #[error("Dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An array shape disagrees with the one required.
    #[error("Shape mismatch in {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A region resolves entirely outside the valid coordinate space.
    #[error("Axis {axis} bound {value} is outside [0, {extent}]")]
    Bounds { axis: usize, value: i64, extent: usize },

    /// The linear part of an affine matrix is not invertible.
    #[error("Degenerate transform: linear part has determinant {determinant:e}")]
    DegenerateTransform { determinant: f64 },

    /// The requested operation is not implemented.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A matrix or parameter value is malformed (non-finite, wrong layout).
    #[error("Invalid value for {what}: {detail}")]
    InvalidValue { what: &'static str, detail: String },

    /// Error surfaced by the storage backend, passed through unchanged.
    #[error(transparent)]
    Storage(ReadError),
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        Error::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }

    pub(crate) fn invalid(what: &'static str, detail: impl Into<String>) -> Self {
        Error::InvalidValue {
            what,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::dimension("rotation angles", 3, 2);
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in rotation angles: expected 3, got 2"
        );

        let err = Error::Bounds {
            axis: 1,
            value: 12,
            extent: 10,
        };
        assert_eq!(err.to_string(), "Axis 1 bound 12 is outside [0, 10]");

        let err = Error::UnsupportedOperation("interpolation order 3".to_string());
        assert_eq!(err.to_string(), "Unsupported operation: interpolation order 3");
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let inner: ReadError = Box::new(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "chunk 0/1 missing",
        ));
        let err = Error::Storage(inner);
        assert_eq!(err.to_string(), "chunk 0/1 missing");
    }
}
