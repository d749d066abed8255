//! Error types for the output store.

use synth_common::Pixel;
use thiserror::Error;

/// Errors that can occur while creating, writing or closing a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to create the store on disk.
    #[error("failed to create store: {0}")]
    CreateFailed(String),

    /// The output path already holds data and overwriting is disabled.
    #[error("output path {0} already exists")]
    AlreadyExists(String),

    /// Zarr format or storage error.
    #[error("Zarr error: {0}")]
    ZarrError(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Data handed to the store does not match its layout.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The pixel lies outside the region this store was opened for.
    #[error("pixel ({}, {}) is outside the output region", .0.x, .0.y)]
    OutsideRegion(Pixel),

    /// The pixel has already been written.
    #[error("pixel ({}, {}) written twice", .0.x, .0.y)]
    DuplicateWrite(Pixel),

    /// The store was closed before every pixel of the region was written.
    #[error("{missing} pixels never written, first at ({}, {})", .first.x, .first.y)]
    MissingPixels { missing: usize, first: Pixel },

    /// A batch reported a spectral axis different from the one already recorded.
    #[error("spectral axis differs from the recorded one at point {index}")]
    SpectralAxisMismatch { index: usize },

    /// The spectral axis was never reported.
    #[error("spectral axis was never written")]
    MissingSpectralAxis,

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create a ZarrError.
    pub fn zarr(msg: impl ToString) -> Self {
        Self::ZarrError(msg.to_string())
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
