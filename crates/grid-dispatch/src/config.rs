//! Run parameters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use spectral_store::StoreConfig;
use synth_common::{GridShape, PixelRegion, VelocityKind};

use crate::error::{DispatchError, Result};

/// How the pixels of a run are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// The coordinator evaluates every pixel itself, in raster order.
    #[default]
    Serial,
    /// Batches are handed to worker participants.
    Distributed,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
            Self::Distributed => write!(f, "distributed"),
        }
    }
}

/// Optional restriction of a run to a sub-rectangle, `[start, end)` per axis.
///
/// An axis left unset covers the full grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    #[serde(default)]
    pub x: Option<[usize; 2]>,
    #[serde(default)]
    pub y: Option<[usize; 2]>,
}

impl RegionConfig {
    /// Resolve against a grid, rejecting rectangles that leave it or are empty.
    pub fn resolve(&self, grid: GridShape) -> Result<PixelRegion> {
        let x = self.x.map(|[a, b]| a..b).unwrap_or(0..grid.nx);
        let y = self.y.map(|[a, b]| a..b).unwrap_or(0..grid.ny);
        let region = PixelRegion::new(x, y);

        if !grid.contains_region(&region) {
            return Err(DispatchError::RegionOutOfBounds {
                region: region.to_string(),
                nx: grid.nx,
                ny: grid.ny,
            });
        }
        Ok(region)
    }
}

/// Parameters of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Sub-rectangle to compute; the whole grid when unset.
    pub region: Option<RegionConfig>,

    /// Target number of pixels per batch.
    pub batch_size: usize,

    /// Also resample the atmosphere onto the model's fixed depth grid.
    pub interpolate: bool,

    pub mode: ExecutionMode,

    /// Participants in the run, coordinator included.
    pub processes: usize,

    pub velocity: VelocityKind,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            region: None,
            batch_size: 1,
            interpolate: false,
            mode: ExecutionMode::Serial,
            processes: 1,
            velocity: VelocityKind::Velocity,
        }
    }
}

impl RunConfig {
    /// Checks that need no input data. Run before any I/O.
    pub fn validate(&self) -> Result<()> {
        if self.mode == ExecutionMode::Distributed && self.processes < 2 {
            return Err(DispatchError::InsufficientProcesses(self.processes));
        }

        if self.batch_size == 0 {
            return Err(DispatchError::invalid_config("batch_size must be > 0"));
        }

        if let Some(region) = &self.region {
            for (axis, range) in [("x", region.x), ("y", region.y)] {
                if let Some([start, end]) = range {
                    if start >= end {
                        return Err(DispatchError::invalid_config(format!(
                            "region {} range [{}, {}) is empty",
                            axis, start, end
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Number of worker participants.
    pub fn workers(&self) -> usize {
        match self.mode {
            ExecutionMode::Serial => 0,
            ExecutionMode::Distributed => self.processes.saturating_sub(1),
        }
    }

    /// The pixel region of this run on the given grid.
    pub fn resolve_region(&self, grid: GridShape) -> Result<PixelRegion> {
        self.region.clone().unwrap_or_default().resolve(grid)
    }
}

/// Where the output stores are created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputPaths {
    pub spectra: PathBuf,
    /// Resampled model store; required when `interpolate` is set.
    #[serde(default)]
    pub model: Option<PathBuf>,
}

/// Everything needed to execute a run besides the input data and the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPlan {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub outputs: OutputPaths,
}

impl RunPlan {
    /// Checks that need no input data. Run before any I/O.
    pub fn validate(&self) -> Result<()> {
        self.run.validate()?;
        self.store
            .validate()
            .map_err(DispatchError::InvalidConfig)?;

        if self.run.interpolate && self.outputs.model.is_none() {
            return Err(DispatchError::invalid_config(
                "interpolate requires an output path for the model store",
            ));
        }

        // Creating one store would wipe or nest inside the other.
        if let Some(model) = &self.outputs.model {
            let spectra = &self.outputs.spectra;
            if model.starts_with(spectra) || spectra.starts_with(model) {
                return Err(DispatchError::invalid_config(format!(
                    "spectra output {} and model output {} overlap",
                    spectra.display(),
                    model.display()
                )));
            }
        }

        Ok(())
    }
}
