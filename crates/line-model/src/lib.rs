//! Reference physics model: a single Gaussian absorption line per spectral
//! region, formed at unit optical depth, with weak-field polarization.
//!
//! The model is cheap and deterministic, which makes it suitable for driving
//! the dispatch machinery end to end without an external radiative transfer
//! code.

mod config;
mod interp;
mod model;

pub use config::{LineModelConfig, SpectralRegion};
pub use interp::interp_linear;
pub use model::{LineModel, MODEL_CHANNELS};
