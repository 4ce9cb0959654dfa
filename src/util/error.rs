//! Error types for the archive core.

use thiserror::Error;

/// Main error type for archive operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Object not found by name or path
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Property not found by name
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// Wrong property or object kind requested
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Sample index out of bounds
    #[error("Sample index {index} out of bounds (count: {count})")]
    SampleOutOfBounds { index: usize, count: usize },

    /// Child index out of bounds
    #[error("Child index {index} out of bounds (count: {count})")]
    ChildOutOfBounds { index: usize, count: usize },

    /// Time sampling registry index out of bounds
    #[error("Time sampling index {index} out of bounds (count: {count})")]
    TimeSamplingOutOfBounds { index: usize, count: usize },

    /// Attribute-namespace directory decoding failure
    #[error("Malformed property directory: {0}")]
    MalformedDirectory(String),

    /// Time sampling rejected at construction
    #[error("Invalid time sampling: {0}")]
    InvalidTimeSampling(String),

    /// Layering merge found incompatible kinds at the same path
    #[error("Layer type conflict at {path}: {detail}")]
    LayerTypeConflict { path: String, detail: String },

    /// Unsupported archive format version
    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u32),

    /// Structural mutation after the node was closed
    #[error("Node is closed and accepts no further children")]
    Frozen,

    /// Write operation failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// I/O error (surfaced by backend adapters)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a malformed-directory error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDirectory(msg.into())
    }

    /// True for the routine lookup-miss kinds callers probe with.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound(_) | Self::PropertyNotFound(_))
    }
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::SampleOutOfBounds { index: 7, count: 3 };
        assert!(e.to_string().contains("7"));
        assert!(e.to_string().contains("3"));

        let e = Error::LayerTypeConflict {
            path: "/a/b".into(),
            detail: "compound vs leaf".into(),
        };
        assert!(e.to_string().contains("/a/b"));
    }

    #[test]
    fn test_not_found_probe() {
        assert!(Error::PropertyNotFound("x".into()).is_not_found());
        assert!(!Error::Frozen.is_not_found());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
