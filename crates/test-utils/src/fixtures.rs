//! Common test fixtures: loaders and output locations.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use synth_common::{
    AtmosphereConfig, CubeLoader, CubeShape, Quantity, QuantityCubes, Result, SynthError,
};
use tempfile::TempDir;

use crate::generators::synthetic_cube;

/// Serves cubes from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    cubes: BTreeMap<Quantity, Array3<f32>>,
}

impl MemoryLoader {
    /// A loader holding a full synthetic atmosphere.
    pub fn synthetic(shape: CubeShape) -> Self {
        let cubes = Quantity::ALL
            .iter()
            .map(|&q| (q, synthetic_cube(q, shape)))
            .collect();
        Self { cubes }
    }

    pub fn from_cubes(cubes: &QuantityCubes) -> Self {
        let cubes = Quantity::ALL
            .iter()
            .map(|&q| (q, cubes.get(q).clone()))
            .collect();
        Self { cubes }
    }

    /// Replace (or add) one quantity.
    pub fn with(mut self, quantity: Quantity, cube: Array3<f32>) -> Self {
        self.cubes.insert(quantity, cube);
        self
    }

    /// Drop one quantity, so that loading it fails.
    pub fn without(mut self, quantity: Quantity) -> Self {
        self.cubes.remove(&quantity);
        self
    }
}

impl CubeLoader for MemoryLoader {
    fn load(&self, quantity: Quantity) -> Result<Array3<f32>> {
        self.cubes
            .get(&quantity)
            .cloned()
            .ok_or(SynthError::MissingQuantity(quantity.as_str()))
    }
}

/// Write every quantity of a synthetic atmosphere as raw little-endian `f32`
/// files under `dir`, in `(depth, y, x)` order.
///
/// Returns a configuration that loads them back with identity axes.
pub fn write_raw_atmosphere(dir: &Path, shape: CubeShape) -> std::io::Result<AtmosphereConfig> {
    let mut files = BTreeMap::new();
    for &quantity in Quantity::ALL.iter() {
        let cube = synthetic_cube(quantity, shape);
        let values: Vec<f32> = cube.iter().copied().collect();

        let path = dir.join(format!("{}.raw", quantity.as_str()));
        let mut file = std::fs::File::create(&path)?;
        file.write_all(bytemuck::cast_slice(&values))?;
        files.insert(quantity, path);
    }

    Ok(AtmosphereConfig {
        files,
        raw_shape: [shape.depth, shape.ny, shape.nx],
        axes: [0, 1, 2],
    })
}

/// A temporary directory with predictable output locations inside it.
///
/// The directory and everything in it is removed on drop.
pub struct OutputDir {
    dir: TempDir,
}

impl OutputDir {
    pub fn new() -> Self {
        match tempfile::tempdir() {
            Ok(dir) => Self { dir },
            Err(e) => panic!("failed to create temp dir: {}", e),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Location of the spectra store. Not created.
    pub fn spectra(&self) -> PathBuf {
        self.dir.path().join("spectra.zarr")
    }

    /// Location of the resampled model store. Not created.
    pub fn model(&self) -> PathBuf {
        self.dir.path().join("model.zarr")
    }
}

impl Default for OutputDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPE: CubeShape = CubeShape {
        depth: 6,
        ny: 2,
        nx: 3,
    };

    #[test]
    fn test_memory_loader_serves_all_quantities() {
        let loader = MemoryLoader::synthetic(SHAPE);
        let cubes = QuantityCubes::load(&loader).unwrap();
        assert_eq!(cubes.shape(), SHAPE);
    }

    #[test]
    fn test_memory_loader_missing_quantity() {
        let loader = MemoryLoader::synthetic(SHAPE).without(Quantity::Pressure);
        assert!(matches!(
            QuantityCubes::load(&loader),
            Err(SynthError::MissingQuantity("P"))
        ));
    }

    #[test]
    fn test_raw_atmosphere_roundtrip() {
        let out = OutputDir::new();
        let config = write_raw_atmosphere(out.path(), SHAPE).unwrap();
        assert_eq!(config.files.len(), Quantity::COUNT);

        let loader = synth_common::RawCubeLoader::new(config).unwrap();
        let cubes = QuantityCubes::load(&loader).unwrap();
        assert_eq!(
            cubes.get(Quantity::Temperature),
            &synthetic_cube(Quantity::Temperature, SHAPE)
        );
    }

    #[test]
    fn test_output_paths_are_inside_dir() {
        let out = OutputDir::new();
        assert!(out.spectra().starts_with(out.path()));
        assert!(!out.spectra().exists());
        assert_ne!(out.spectra(), out.model());
    }
}
