//! Common types shared by the spectral synthesis crates.
//!
//! - [`Quantity`] and [`QuantityCubes`]: full-grid physical quantities laid out
//!   as `(depth, y, x)`.
//! - [`CubeLoader`] / [`RawCubeLoader`]: the array loading capability.
//! - [`Column`] / [`ColumnBatch`]: the depth profiles for one pixel or a batch
//!   of pixels, as handed to a physics model.
//! - [`PhysicsModel`]: the synthesis/inversion capability.

pub mod column;
pub mod cube;
pub mod error;
pub mod grid;
pub mod loader;
pub mod physics;
pub mod quantity;

pub use column::{Column, ColumnBatch, VelocityKind};
pub use cube::{CubeShape, QuantityCubes};
pub use error::{Result, SynthError};
pub use grid::{GridShape, Pixel, PixelRegion};
pub use loader::{AtmosphereConfig, CubeLoader, RawCubeLoader};
pub use physics::{BatchSynthesis, OutputLayout, PhysicsModel, Polarization, Synthesis};
pub use quantity::Quantity;
