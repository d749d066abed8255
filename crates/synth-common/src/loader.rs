//! Array loading capability.
//!
//! Simulation snapshots store each quantity as a flat binary array in the
//! code's native axis order. [`RawCubeLoader`] reads such files and permutes
//! them into the canonical `(depth, y, x)` order.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SynthError};
use crate::quantity::Quantity;

/// Produces a `(depth, y, x)` cube for a quantity.
pub trait CubeLoader: Send + Sync {
    fn load(&self, quantity: Quantity) -> Result<Array3<f32>>;
}

/// Location and layout of the raw quantity files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtmosphereConfig {
    /// One native-endian `float32` file per quantity.
    pub files: BTreeMap<Quantity, PathBuf>,

    /// Shape of each file as written by the simulation.
    pub raw_shape: [usize; 3],

    /// Which raw axes become `(depth, y, x)`.
    #[serde(default = "default_axes")]
    pub axes: [usize; 3],
}

fn default_axes() -> [usize; 3] {
    [0, 1, 2]
}

impl AtmosphereConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        for quantity in Quantity::ALL {
            if !self.files.contains_key(&quantity) {
                return Err(SynthError::MissingQuantity(quantity.as_str()));
            }
        }

        if self.raw_shape.iter().any(|&n| n == 0) {
            return Err(SynthError::invalid_config(format!(
                "raw_shape must be positive, got {:?}",
                self.raw_shape
            )));
        }

        let mut sorted = self.axes;
        sorted.sort_unstable();
        if sorted != [0, 1, 2] {
            return Err(SynthError::invalid_config(format!(
                "axes must be a permutation of [0, 1, 2], got {:?}",
                self.axes
            )));
        }

        Ok(())
    }

    /// Expected size in bytes of every raw file.
    pub fn expected_bytes(&self) -> usize {
        self.raw_shape.iter().product::<usize>() * std::mem::size_of::<f32>()
    }
}

/// Loads raw `float32` cubes from disk.
pub struct RawCubeLoader {
    config: AtmosphereConfig,
}

impl RawCubeLoader {
    pub fn new(config: AtmosphereConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl CubeLoader for RawCubeLoader {
    fn load(&self, quantity: Quantity) -> Result<Array3<f32>> {
        let path = self
            .config
            .files
            .get(&quantity)
            .ok_or(SynthError::MissingQuantity(quantity.as_str()))?;

        let bytes = std::fs::read(path).map_err(|source| SynthError::Io {
            path: path.clone(),
            source,
        })?;

        let expected = self.config.expected_bytes();
        if bytes.len() != expected {
            return Err(SynthError::MalformedCube {
                path: path.clone(),
                expected,
                actual: bytes.len(),
            });
        }

        // The byte buffer has no alignment guarantee, so copy into f32s.
        let values: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
        let raw = Array3::from_shape_vec(self.config.raw_shape, values)?;
        let cube = raw
            .permuted_axes(self.config.axes)
            .as_standard_layout()
            .into_owned();

        info!(quantity = %quantity, path = ?path, shape = ?cube.dim(), "Loaded raw cube");
        Ok(cube)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_raw(dir: &std::path::Path, name: &str, values: &[f32]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytemuck::cast_slice(values)).unwrap();
        path
    }

    fn config_for(dir: &std::path::Path, values: &[f32], raw_shape: [usize; 3], axes: [usize; 3]) -> AtmosphereConfig {
        let files = Quantity::ALL
            .iter()
            .map(|q| (*q, write_raw(dir, &format!("{}.bin", q), values)))
            .collect();
        AtmosphereConfig {
            files,
            raw_shape,
            axes,
        }
    }

    #[test]
    fn test_load_permutes_axes() {
        let dir = tempfile::tempdir().unwrap();
        // Raw layout (x, depth, y) with shape (2, 3, 4).
        let values: Vec<f32> = (0..24).map(|i| i as f32).collect();
        let config = config_for(dir.path(), &values, [2, 3, 4], [1, 2, 0]);
        let loader = RawCubeLoader::new(config).unwrap();

        let cube = loader.load(Quantity::Temperature).unwrap();
        assert_eq!(cube.dim(), (3, 4, 2));
        // raw[x][d][y] = x*12 + d*4 + y
        assert_eq!(cube[[2, 1, 1]], (12 + 8 + 1) as f32);
        assert_eq!(cube[[0, 3, 0]], 3.0);
    }

    #[test]
    fn test_malformed_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let values: Vec<f32> = vec![1.0; 23];
        let config = config_for(dir.path(), &values, [2, 3, 4], [0, 1, 2]);
        let loader = RawCubeLoader::new(config).unwrap();

        match loader.load(Quantity::Pressure) {
            Err(SynthError::MalformedCube { expected, actual, .. }) => {
                assert_eq!(expected, 96);
                assert_eq!(actual, 92);
            }
            other => panic!("expected MalformedCube, got {:?}", other.map(|c| c.dim())),
        }
    }

    #[test]
    fn test_invalid_axes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), &[0.0; 8], [2, 2, 2], [0, 0, 2]);
        assert!(matches!(
            RawCubeLoader::new(config),
            Err(SynthError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_quantity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path(), &[0.0; 8], [2, 2, 2], [0, 1, 2]);
        config.files.remove(&Quantity::ElectronDensity);
        assert!(matches!(
            config.validate(),
            Err(SynthError::MissingQuantity("ne"))
        ));
    }
}
