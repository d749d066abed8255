//! Error types for atmosphere loading and physics evaluation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using SynthError.
pub type Result<T> = std::result::Result<T, SynthError>;

/// Errors raised while loading atmospheres or evaluating a physics model.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed cube {path:?}: expected {expected} bytes, found {actual}")]
    MalformedCube {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("no file configured for quantity {0}")]
    MissingQuantity(&'static str),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("pixel ({x}, {y}) is outside the {nx}x{ny} grid")]
    OutOfBounds { x: usize, y: usize, nx: usize, ny: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("physics model error: {0}")]
    Model(String),
}

impl SynthError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a Model error.
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }
}

impl From<ndarray::ShapeError> for SynthError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::ShapeMismatch(err.to_string())
    }
}
