//! Spectra output store.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use ndarray::{ArrayView1, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use synth_common::{GridShape, OutputLayout, Pixel, PixelRegion};
use tracing::{debug, info};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs::storage::{ReadableStorageTraits, WritableStorageTraits};
use zarrs_filesystem::FilesystemStore;

use crate::codec::compression_codecs;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::ledger::WriteLedger;

/// Name of the spectral axis array.
pub const LAMBDA_ARRAY: &str = "lambda";

/// Summary of a closed store, logged at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSummary {
    /// Arrays written.
    pub arrays: Vec<String>,
    /// Shape of each data array.
    pub shape: Vec<u64>,
    /// Chunk shape of each data array.
    pub chunk_shape: Vec<u64>,
    /// Pixels written.
    pub pixels_written: usize,
    /// Payload bytes handed to the store (before compression).
    pub bytes_written: u64,
    /// Compression codec used.
    pub compression: String,
}

/// Create (or refuse to clobber) the directory backing a filesystem store.
pub(crate) fn prepare_directory(path: &Path, config: &StoreConfig) -> Result<FilesystemStore> {
    if path.exists() {
        let occupied = std::fs::read_dir(path)?.next().is_some();
        if occupied {
            if !config.overwrite {
                return Err(StoreError::AlreadyExists(path.display().to_string()));
            }
            std::fs::remove_dir_all(path)?;
        }
    }
    std::fs::create_dir_all(path)?;

    FilesystemStore::new(path).map_err(|e| StoreError::CreateFailed(e.to_string()))
}

/// Chunk edge clamped to the array extent.
pub(crate) fn chunk_edge(config: &StoreConfig, extent: usize) -> u64 {
    config.chunk_size.min(extent).max(1) as u64
}

/// Output store for the spectra of a run.
///
/// One `(ny, nx, n_lambda)` array per Stokes channel plus the spectral axis.
/// Pixels are written as results arrive, one row segment at a time; the spectral axis is recorded from
/// the first result, checked against every later one, and written at
/// [`SpectraStore::close`].
pub struct SpectraStore<S = FilesystemStore> {
    channels: Vec<Array<S>>,
    lambda: Array<S>,
    layout: OutputLayout,
    ledger: WriteLedger,
    wavelength: Option<Vec<f64>>,
    chunk_shape: Vec<u64>,
    compression: String,
    bytes_written: u64,
}

impl SpectraStore<FilesystemStore> {
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
        info!(path = %path.display(), "Creating spectra store");
        Self::create_in(Arc::new(store), grid, region, layout, config)
    }
}

impl<S: ReadableStorageTraits + WritableStorageTraits + 'static> SpectraStore<S> {
    /// Create the arrays in an existing storage backend.
    pub fn create_in(
        storage: Arc<S>,
        grid: GridShape,
        region: PixelRegion,
        layout: &OutputLayout,
        config: &StoreConfig,
    ) -> Result<Self> {
        config.validate().map_err(StoreError::ConfigError)?;

        if layout.n_lambda == 0 {
            return Err(StoreError::shape_mismatch("layout has no wavelength points"));
        }
        if !grid.contains_region(&region) {
            return Err(StoreError::shape_mismatch(format!(
                "region {} does not fit the {}x{} grid",
                region, grid.nx, grid.ny
            )));
        }

        let channel_names = layout.polarization.channel_names();

        let mut attrs = serde_json::Map::new();
        attrs.insert(
            "lambda_zeropoint".to_string(),
            serde_json::json!(layout.lambda_zeropoint),
        );
        attrs.insert("channels".to_string(), serde_json::json!(channel_names));
        attrs.insert("grid".to_string(), serde_json::json!([grid.ny, grid.nx]));
        attrs.insert(
            "region".to_string(),
            serde_json::json!({
                "x": [region.x.start, region.x.end],
                "y": [region.y.start, region.y.end],
            }),
        );
        attrs.insert(
            "created".to_string(),
            serde_json::json!(Utc::now().to_rfc3339()),
        );

        let mut group_builder = GroupBuilder::new();
        group_builder.attributes(attrs);
        let group = group_builder
            .build(storage.clone(), "/")
            .map_err(StoreError::zarr)?;
        group.store_metadata().map_err(StoreError::zarr)?;

        let n_lambda = layout.n_lambda as u64;
        let shape = vec![grid.ny as u64, grid.nx as u64, n_lambda];
        let chunk_shape = vec![
            chunk_edge(config, grid.ny),
            chunk_edge(config, grid.nx),
            n_lambda,
        ];

        let mut channels = Vec::with_capacity(channel_names.len());
        for name in channel_names {
            let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
                .clone()
                .try_into()
                .map_err(|e| StoreError::ConfigError(format!("{:?}", e)))?;

            let mut builder = ArrayBuilder::new(
                shape.clone(),
                DataType::Float32,
                chunk_grid,
                FillValue::from(f32::NAN),
            );
            builder.bytes_to_bytes_codecs(compression_codecs(config, 4)?);

            let array = builder
                .build(storage.clone(), &format!("/{}", name))
                .map_err(StoreError::zarr)?;
            array.store_metadata().map_err(StoreError::zarr)?;
            debug!(array = %name, shape = ?shape, chunks = ?chunk_shape, "Created channel array");
            channels.push(array);
        }

        let lambda_grid: zarrs::array::ChunkGrid = vec![n_lambda]
            .try_into()
            .map_err(|e| StoreError::ConfigError(format!("{:?}", e)))?;
        let lambda = ArrayBuilder::new(
            vec![n_lambda],
            DataType::Float64,
            lambda_grid,
            FillValue::from(f64::NAN),
        )
        .build(storage, &format!("/{}", LAMBDA_ARRAY))
        .map_err(StoreError::zarr)?;
        lambda.store_metadata().map_err(StoreError::zarr)?;

        Ok(Self {
            channels,
            lambda,
            layout: layout.clone(),
            ledger: WriteLedger::new(region),
            wavelength: None,
            chunk_shape,
            compression: config.compression.as_str().to_string(),
            bytes_written: 0,
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn ledger(&self) -> &WriteLedger {
        &self.ledger
    }

    /// Record the spectral axis reported by a result.
    ///
    /// The first call stores it; later calls must report the identical axis.
    pub fn record_wavelength(&mut self, wavelength: ArrayView1<'_, f64>) -> Result<()> {
        if wavelength.len() != self.layout.n_lambda {
            return Err(StoreError::shape_mismatch(format!(
                "spectral axis has {} points, expected {}",
                wavelength.len(),
                self.layout.n_lambda
            )));
        }

        match &self.wavelength {
            None => {
                self.wavelength = Some(wavelength.to_vec());
                Ok(())
            }
            Some(recorded) => match recorded
                .iter()
                .zip(wavelength.iter())
                .position(|(a, b)| a.to_bits() != b.to_bits())
            {
                None => Ok(()),
                Some(index) => Err(StoreError::SpectralAxisMismatch { index }),
            },
        }
    }

    /// Write the spectrum of one pixel, shaped `(channel, lambda)`.
    pub fn write_pixel(&mut self, pixel: Pixel, stokes: ArrayView2<'_, f64>) -> Result<()> {
        self.write_segment(pixel, stokes.insert_axis(Axis(1)))
    }

    /// Write a run of pixels along one row, starting at `start` and shaped
    /// `(channel, pixel, lambda)`.
    ///
    /// Each channel is stored as a single `[1, len, n_lambda]` subset.
    pub fn write_segment(&mut self, start: Pixel, stokes: ArrayView3<'_, f64>) -> Result<()> {
        let (n_channels, len, n_lambda) = stokes.dim();
        if n_channels != self.channels.len() || n_lambda != self.layout.n_lambda || len == 0 {
            return Err(StoreError::shape_mismatch(format!(
                "spectra starting at ({}, {}) have shape {:?}, expected ({}, n, {})",
                start.x,
                start.y,
                stokes.dim(),
                self.channels.len(),
                self.layout.n_lambda
            )));
        }

        self.ledger.mark_segment(start, len)?;

        let subset = ArraySubset::new_with_start_shape(
            vec![start.y as u64, start.x as u64, 0],
            vec![1, len as u64, n_lambda as u64],
        )
        .map_err(StoreError::zarr)?;

        for (array, channel) in self.channels.iter().zip(stokes.outer_iter()) {
            // Logical (pixel, lambda) order matches the subset layout.
            let values: Vec<f32> = channel.iter().map(|&v| v as f32).collect();
            array
                .store_array_subset_elements(&subset, &values)
                .map_err(StoreError::zarr)?;
            self.bytes_written += (values.len() * std::mem::size_of::<f32>()) as u64;
        }

        Ok(())
    }

    /// Write the spectral axis and verify that every pixel was written.
    pub fn close(self) -> Result<StoreSummary> {
        self.ledger.ensure_complete()?;
        let wavelength = self.wavelength.ok_or(StoreError::MissingSpectralAxis)?;

        let subset = ArraySubset::new_with_shape(vec![wavelength.len() as u64]);
        self.lambda
            .store_array_subset_elements(&subset, &wavelength)
            .map_err(StoreError::zarr)?;

        let mut arrays: Vec<String> = self
            .layout
            .polarization
            .channel_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        arrays.push(LAMBDA_ARRAY.to_string());

        let shape = self
            .channels
            .first()
            .map(|a| a.shape().to_vec())
            .unwrap_or_default();

        let summary = StoreSummary {
            arrays,
            shape,
            chunk_shape: self.chunk_shape,
            pixels_written: self.ledger.written_count(),
            bytes_written: self.bytes_written
                + (wavelength.len() * std::mem::size_of::<f64>()) as u64,
            compression: self.compression,
        };

        info!(
            pixels = summary.pixels_written,
            bytes = summary.bytes_written,
            "Closed spectra store"
        );
        Ok(summary)
    }
}
