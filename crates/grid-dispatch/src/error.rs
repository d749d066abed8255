//! Error types for the dispatch layer.

use spectral_store::StoreError;
use synth_common::SynthError;
use thiserror::Error;

/// Result type alias using DispatchError.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Every error is terminal for the run.
#[derive(Debug, Error)]
pub enum DispatchError {
    // === Configuration errors ===
    #[error("distributed mode needs at least 2 processes, got {0}")]
    InsufficientProcesses(usize),

    #[error("region {region} is outside the {nx}x{ny} grid")]
    RegionOutOfBounds { region: String, nx: usize, ny: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // === I/O and model errors ===
    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode model configuration: {0}")]
    Codec(#[from] serde_json::Error),

    // === Communication errors ===
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("channel to {0} closed")]
    ChannelClosed(String),

    #[error("worker task failed: {0}")]
    Worker(String),
}

impl DispatchError {
    /// Create a Protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
