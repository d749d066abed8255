//! Read access to a finished spectra store.

use std::path::Path;
use std::sync::Arc;

use ndarray::{Array1, Array2, Array3};
use synth_common::Pixel;
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs::group::Group;
use zarrs_filesystem::FilesystemStore;

use crate::error::{Result, StoreError};
use crate::model_store::MODEL_ARRAY;
use crate::spectra::LAMBDA_ARRAY;

/// Opens the arrays written by [`crate::SpectraStore`] and [`crate::ModelStore`].
pub struct SpectraReader {
    storage: Arc<FilesystemStore>,
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl SpectraReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let storage = Arc::new(
            FilesystemStore::new(path.as_ref()).map_err(|e| StoreError::CreateFailed(e.to_string()))?,
        );
        let group = Group::open(storage.clone(), "/").map_err(StoreError::zarr)?;
        let attributes = group.attributes().clone();
        Ok(Self {
            storage,
            attributes,
        })
    }

    /// Root attributes of the store.
    pub fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    pub fn lambda_zeropoint(&self) -> Option<f64> {
        self.attributes.get("lambda_zeropoint").and_then(|v| v.as_f64())
    }

    /// Names of the Stokes channel arrays.
    pub fn channels(&self) -> Vec<String> {
        self.attributes
            .get("channels")
            .and_then(|v| v.as_array())
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn array(&self, name: &str) -> Result<Array<FilesystemStore>> {
        Array::open(self.storage.clone(), &format!("/{}", name)).map_err(StoreError::zarr)
    }

    pub fn wavelength(&self) -> Result<Array1<f64>> {
        let array = self.array(LAMBDA_ARRAY)?;
        let subset = ArraySubset::new_with_shape(array.shape().to_vec());
        let values: Vec<f64> = array
            .retrieve_array_subset_elements(&subset)
            .map_err(StoreError::zarr)?;
        Ok(Array1::from(values))
    }

    /// Read a full channel array, shaped `(ny, nx, n_lambda)`.
    pub fn channel(&self, name: &str) -> Result<Array3<f32>> {
        let array = self.array(name)?;
        let shape = array.shape().to_vec();
        let subset = ArraySubset::new_with_shape(shape.clone());
        let values: Vec<f32> = array
            .retrieve_array_subset_elements(&subset)
            .map_err(StoreError::zarr)?;
        Array3::from_shape_vec(
            (shape[0] as usize, shape[1] as usize, shape[2] as usize),
            values,
        )
        .map_err(|e| StoreError::shape_mismatch(e.to_string()))
    }

    /// Read the spectrum of one pixel, shaped `(channel, lambda)`.
    pub fn pixel(&self, pixel: Pixel) -> Result<Array2<f32>> {
        let channels = self.channels();
        let mut rows = Vec::new();
        let mut n_lambda = 0;
        for name in &channels {
            let array = self.array(name)?;
            n_lambda = array.shape()[2] as usize;
            let subset = ArraySubset::new_with_start_shape(
                vec![pixel.y as u64, pixel.x as u64, 0],
                vec![1, 1, n_lambda as u64],
            )
            .map_err(StoreError::zarr)?;
            let values: Vec<f32> = array
                .retrieve_array_subset_elements(&subset)
                .map_err(StoreError::zarr)?;
            rows.extend(values);
        }
        Array2::from_shape_vec((channels.len(), n_lambda), rows)
            .map_err(|e| StoreError::shape_mismatch(e.to_string()))
    }

    /// Open the model array of a model store, shaped
    /// `(ny, nx, n_channels, n_depth)`.
    pub fn read_model(path: impl AsRef<Path>) -> Result<ndarray::Array4<f32>> {
        let storage = Arc::new(
            FilesystemStore::new(path.as_ref()).map_err(|e| StoreError::CreateFailed(e.to_string()))?,
        );
        let array = Array::open(storage, &format!("/{}", MODEL_ARRAY)).map_err(StoreError::zarr)?;
        let shape: Vec<usize> = array.shape().iter().map(|&n| n as usize).collect();
        let subset = ArraySubset::new_with_shape(array.shape().to_vec());
        let values: Vec<f32> = array
            .retrieve_array_subset_elements(&subset)
            .map_err(StoreError::zarr)?;
        ndarray::Array4::from_shape_vec((shape[0], shape[1], shape[2], shape[3]), values)
            .map_err(|e| StoreError::shape_mismatch(e.to_string()))
    }
}
