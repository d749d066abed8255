//! Physics model capability.
//!
//! A physics model turns the depth profiles of a pixel into an emergent
//! spectrum, optionally also resampling the atmosphere onto a fixed optical
//! depth grid. It exposes a single-pixel entry point ([`PhysicsModel::synth`])
//! and a batched one ([`PhysicsModel::synth2d`]).

use ndarray::{s, Array1, Array2, Array3};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnBatch};
use crate::error::{Result, SynthError};

/// Which Stokes parameters a model produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarization {
    /// Intensity only.
    Intensity,
    /// Stokes I, Q, U and V.
    #[default]
    Full,
}

impl Polarization {
    /// Dataset names of the output channels.
    pub fn channel_names(&self) -> &'static [&'static str] {
        match self {
            Self::Intensity => &["I"],
            Self::Full => &["I", "Q", "U", "V"],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channel_names().len()
    }
}

/// Sizes of everything a model writes, needed to create the output stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputLayout {
    pub polarization: Polarization,
    /// Number of wavelength points.
    pub n_lambda: usize,
    /// Reference wavelength the spectral axis is relative to.
    pub lambda_zeropoint: f64,
    /// Physical channels of a resampled model.
    pub n_model_channels: usize,
    /// Depth samples of a resampled model.
    pub n_depth_samples: usize,
}

/// Output of a single-pixel evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Spectral axis, `n_lambda` points.
    pub wavelength: Array1<f64>,
    /// `(channel, lambda)`.
    pub stokes: Array2<f64>,
    /// `(model_channel, depth_sample)`, present when resampling was requested.
    pub model: Option<Array2<f64>>,
}

/// Output of a batched evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSynthesis {
    /// Spectral axis, shared by every pixel of the batch.
    pub wavelength: Array1<f64>,
    /// `(channel, pixel, lambda)`.
    pub stokes: Array3<f64>,
    /// `(model_channel, pixel, depth_sample)`.
    pub model: Option<Array3<f64>>,
}

impl BatchSynthesis {
    pub fn pixel_count(&self) -> usize {
        self.stokes.dim().1
    }
}

/// A synthesis or inversion code evaluated per pixel.
///
/// A model is rebuilt from its [`PhysicsModel::Config`] on every participant of
/// a distributed run, so any derived state (wavelength tables, line data) must
/// be computed in [`PhysicsModel::from_config`].
pub trait PhysicsModel: Send + Sync + Sized + 'static {
    type Config: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Build the model and its derived state.
    fn from_config(config: Self::Config) -> Result<Self>;

    /// The canonical configuration this model was built from.
    fn config(&self) -> &Self::Config;

    fn layout(&self) -> OutputLayout;

    /// Evaluate one pixel.
    fn synth(&self, column: &Column, interpolate: bool) -> Result<Synthesis>;

    /// Evaluate a batch of pixels.
    ///
    /// The default evaluates each pixel with [`PhysicsModel::synth`] and stacks
    /// the results.
    fn synth2d(&self, batch: &ColumnBatch, interpolate: bool) -> Result<BatchSynthesis> {
        let n = batch.pixel_count();
        if n == 0 {
            return Err(SynthError::model("empty batch"));
        }

        let first = self.synth(&batch.column(0), interpolate)?;
        let (n_channels, n_lambda) = first.stokes.dim();
        let mut stokes = Array3::zeros((n_channels, n, n_lambda));
        let mut model = first
            .model
            .as_ref()
            .map(|m| Array3::zeros((m.nrows(), n, m.ncols())));

        let wavelength = first.wavelength.clone();
        let mut pending = Some(first);

        for i in 0..n {
            let out = match pending.take() {
                Some(out) => out,
                None => self.synth(&batch.column(i), interpolate)?,
            };

            if out.stokes.dim() != (n_channels, n_lambda) {
                return Err(SynthError::shape_mismatch(format!(
                    "pixel {} produced stokes {:?}, expected {:?}",
                    i,
                    out.stokes.dim(),
                    (n_channels, n_lambda)
                )));
            }
            stokes.slice_mut(s![.., i, ..]).assign(&out.stokes);

            match (model.as_mut(), out.model.as_ref()) {
                (Some(dst), Some(src)) if (dst.dim().0, dst.dim().2) == src.dim() => {
                    dst.slice_mut(s![.., i, ..]).assign(src);
                }
                (None, None) => {}
                _ => {
                    return Err(SynthError::shape_mismatch(format!(
                        "pixel {} produced an inconsistent resampled model",
                        i
                    )))
                }
            }
        }

        Ok(BatchSynthesis {
            wavelength,
            stokes,
            model,
        })
    }
}
