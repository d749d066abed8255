//! Per-pixel depth profiles handed to a physics model.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};
use crate::quantity::Quantity;

/// What the velocity cube stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityKind {
    /// Line-of-sight velocity, passed through unchanged.
    #[default]
    Velocity,
    /// Momentum density; velocity is recovered as `vz / rho`.
    Momentum,
}

/// Depth profiles of every quantity at one pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    profiles: [Array1<f64>; Quantity::COUNT],
}

impl Column {
    pub fn new(profiles: [Array1<f64>; Quantity::COUNT]) -> Self {
        Self { profiles }
    }

    pub fn get(&self, quantity: Quantity) -> ArrayView1<'_, f64> {
        self.profiles[quantity.index()].view()
    }

    /// Number of depth points.
    pub fn depth(&self) -> usize {
        self.profiles[0].len()
    }
}

/// Depth profiles for a batch of pixels, each quantity as a `(depth, pixel)`
/// array.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBatch {
    profiles: [Array2<f64>; Quantity::COUNT],
}

impl ColumnBatch {
    pub fn new(profiles: [Array2<f64>; Quantity::COUNT]) -> Result<Self> {
        let dim = profiles[0].dim();
        if profiles.iter().any(|p| p.dim() != dim) {
            return Err(SynthError::shape_mismatch(
                "column batch profiles differ in shape",
            ));
        }
        Ok(Self { profiles })
    }

    pub fn get(&self, quantity: Quantity) -> ArrayView2<'_, f64> {
        self.profiles[quantity.index()].view()
    }

    pub fn depth(&self) -> usize {
        self.profiles[0].nrows()
    }

    pub fn pixel_count(&self) -> usize {
        self.profiles[0].ncols()
    }

    /// The profiles of the `i`-th pixel of the batch.
    pub fn column(&self, i: usize) -> Column {
        Column::new(std::array::from_fn(|qi| {
            self.profiles[qi].index_axis(Axis(1), i).to_owned()
        }))
    }
}
