//! Error types for storage backends.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening, reading or writing stored arrays.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No opener is registered for the file extension.
    #[error("No backend registered for extension '{extension}' ({path})")]
    UnknownExtension { extension: String, path: PathBuf },

    /// Filesystem error, with the path that caused it.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed `attributes.json`.
    #[error("Invalid metadata in {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Image decoding failed.
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    /// No dataset or group with the requested name.
    #[error("No dataset named '{0}'")]
    MissingDataset(String),

    /// Write attempted on a container opened for reading or a read-only format.
    #[error("Container is read-only: {0}")]
    ReadOnly(PathBuf),

    /// Stored data disagrees with the declared layout.
    #[error("Shape mismatch in {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Chunk shape or data type not supported.
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Region checks from the core crate.
    #[error(transparent)]
    Core(#[from] subvolume_core::Error),
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Wrap an I/O error with the path it occurred at.
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StorageError::Io { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_carries_path() {
        let err = StorageError::io("/data/x.n5/0/0")(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.to_string(), "I/O error at /data/x.n5/0/0: denied");
    }

    #[test]
    fn test_core_error_is_transparent() {
        let core = subvolume_core::Error::UnsupportedOperation("x".to_string());
        let err = StorageError::from(core);
        assert_eq!(err.to_string(), "Unsupported operation: x");
    }
}
