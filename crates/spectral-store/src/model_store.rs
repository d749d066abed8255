//! Resampled-model output store.

use std::path::Path;
use std::sync::Arc;

use ndarray::{ArrayView2, ArrayView3, Axis};
use synth_common::{GridShape, OutputLayout, Pixel, PixelRegion};
use tracing::info;
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::{ReadableStorageTraits, WritableStorageTraits};
use zarrs_filesystem::FilesystemStore;

use crate::codec::compression_codecs;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::ledger::WriteLedger;
use crate::spectra::{chunk_edge, prepare_directory, StoreSummary};

/// Name of the resampled-model array.
pub const MODEL_ARRAY: &str = "model";

/// Output store for atmospheres resampled onto a fixed depth grid.
///
/// Layout is `(ny, nx, n_model_channels, n_depth_samples)` for both serial and
/// distributed runs.
pub struct ModelStore<S = FilesystemStore> {
    array: Array<S>,
    n_channels: usize,
    n_depth: usize,
    ledger: WriteLedger,
    chunk_shape: Vec<u64>,
    compression: String,
    bytes_written: u64,
}

impl ModelStore<FilesystemStore> {
    /// Create a store in a directory on the local filesystem.
    pub fn create(
        path: impl AsRef<Path>,
        grid: GridShape,
        region: PixelRegion,
        layout: &OutputLayout,
        config: &StoreConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let store = prepare_directory(path, config)?;
        info!(path = %path.display(), "Creating model store");
        Self::create_in(Arc::new(store), grid, region, layout, config)
    }
}

impl<S: ReadableStorageTraits + WritableStorageTraits + 'static> ModelStore<S> {
    /// Create the model array in an existing storage backend.
    pub fn create_in(
        storage: Arc<S>,
        grid: GridShape,
        region: PixelRegion,
        layout: &OutputLayout,
        config: &StoreConfig,
    ) -> Result<Self> {
        config.validate().map_err(StoreError::ConfigError)?;

        if layout.n_model_channels == 0 || layout.n_depth_samples == 0 {
            return Err(StoreError::shape_mismatch(
                "layout has no resampled model channels",
            ));
        }
        if !grid.contains_region(&region) {
            return Err(StoreError::shape_mismatch(format!(
                "region {} does not fit the {}x{} grid",
                region, grid.nx, grid.ny
            )));
        }

        let n_channels = layout.n_model_channels as u64;
        let n_depth = layout.n_depth_samples as u64;
        let shape = vec![grid.ny as u64, grid.nx as u64, n_channels, n_depth];
        let chunk_shape = vec![
            chunk_edge(config, grid.ny),
            chunk_edge(config, grid.nx),
            n_channels,
            n_depth,
        ];

        let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
            .clone()
            .try_into()
            .map_err(|e| StoreError::ConfigError(format!("{:?}", e)))?;

        let mut attrs = serde_json::Map::new();
        attrs.insert(
            "layout".to_string(),
            serde_json::json!(["y", "x", "channel", "depth"]),
        );

        let mut builder = ArrayBuilder::new(
            shape,
            DataType::Float32,
            chunk_grid,
            FillValue::from(f32::NAN),
        );
        builder.attributes(attrs);
        builder.bytes_to_bytes_codecs(compression_codecs(config, 4)?);

        let array = builder
            .build(storage, &format!("/{}", MODEL_ARRAY))
            .map_err(StoreError::zarr)?;
        array.store_metadata().map_err(StoreError::zarr)?;

        Ok(Self {
            array,
            n_channels: layout.n_model_channels,
            n_depth: layout.n_depth_samples,
            ledger: WriteLedger::new(region),
            chunk_shape,
            compression: config.compression.as_str().to_string(),
            bytes_written: 0,
        })
    }

    pub fn ledger(&self) -> &WriteLedger {
        &self.ledger
    }

    /// Write the resampled model of one pixel, shaped `(channel, depth)`.
    pub fn write_pixel(&mut self, pixel: Pixel, model: ArrayView2<'_, f64>) -> Result<()> {
        self.write_segment(pixel, model.insert_axis(Axis(1)))
    }

    /// Write a run of pixels along one row, starting at `start` and shaped
    /// `(channel, pixel, depth)`.
    pub fn write_segment(&mut self, start: Pixel, model: ArrayView3<'_, f64>) -> Result<()> {
        let (n_channels, len, n_depth) = model.dim();
        if n_channels != self.n_channels || n_depth != self.n_depth || len == 0 {
            return Err(StoreError::shape_mismatch(format!(
                "model starting at ({}, {}) has shape {:?}, expected ({}, n, {})",
                start.x,
                start.y,
                model.dim(),
                self.n_channels,
                self.n_depth
            )));
        }

        self.ledger.mark_segment(start, len)?;

        let subset = ArraySubset::new_with_start_shape(
            vec![start.y as u64, start.x as u64, 0, 0],
            vec![1, len as u64, n_channels as u64, n_depth as u64],
        )
        .map_err(StoreError::zarr)?;

        // Stored pixel-major: (pixel, channel, depth).
        let values: Vec<f32> = model
            .permuted_axes([1, 0, 2])
            .iter()
            .map(|&v| v as f32)
            .collect();
        self.array
            .store_array_subset_elements(&subset, &values)
            .map_err(StoreError::zarr)?;
        self.bytes_written += (values.len() * std::mem::size_of::<f32>()) as u64;

        Ok(())
    }

    /// Verify that every pixel was written.
    pub fn close(self) -> Result<StoreSummary> {
        self.ledger.ensure_complete()?;

        let summary = StoreSummary {
            arrays: vec![MODEL_ARRAY.to_string()],
            shape: self.array.shape().to_vec(),
            chunk_shape: self.chunk_shape,
            pixels_written: self.ledger.written_count(),
            bytes_written: self.bytes_written,
            compression: self.compression,
        };

        info!(pixels = summary.pixels_written, "Closed model store");
        Ok(summary)
    }
}
