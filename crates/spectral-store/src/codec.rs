//! Compression codec construction.

use std::sync::Arc;

use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::codec::BytesToBytesCodecTraits;

use crate::config::{StoreCompression, StoreConfig};
use crate::error::{Result, StoreError};

/// Build the bytes-to-bytes codecs for an array of `typesize`-byte elements.
pub(crate) fn compression_codecs(
    config: &StoreConfig,
    typesize: usize,
) -> Result<Vec<Arc<dyn BytesToBytesCodecTraits>>> {
    let compressor = match config.compression {
        StoreCompression::None => return Ok(Vec::new()),
        StoreCompression::BloscLz4 => BloscCompressor::LZ4,
        StoreCompression::BloscZstd => BloscCompressor::Zstd,
    };

    let level = BloscCompressionLevel::try_from(config.compression_level)
        .map_err(|_| StoreError::ConfigError("Invalid compression level".to_string()))?;

    let shuffle = if config.shuffle {
        BloscShuffleMode::Shuffle
    } else {
        BloscShuffleMode::NoShuffle
    };

    // typesize is required when shuffle is enabled
    let typesize = config.shuffle.then_some(typesize);

    let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
        .map_err(|e| StoreError::ConfigError(e.to_string()))?;

    Ok(vec![Arc::new(codec)])
}
