//! Synthetic atmosphere generators.
//!
//! The atmospheres are smooth, physically plausible and vary across the grid
//! so that every pixel produces a distinct spectrum. Values are deterministic:
//! the same shape always gives the same cubes.

use ndarray::Array3;
use synth_common::{CubeShape, Quantity, QuantityCubes};

/// Optical depth range of the generated columns, in log10.
pub const LOG_TAU_TOP: f64 = -4.0;
pub const LOG_TAU_BOTTOM: f64 = 2.0;

/// Value of `quantity` at depth index `d`, row `y`, column `x`.
///
/// Depth index 0 is the top of the atmosphere. Temperature increases with
/// depth and with `x`; the line-of-sight velocity changes sign across the
/// grid; the field strength grows with `y`.
pub fn atmosphere_value(quantity: Quantity, shape: CubeShape, d: usize, y: usize, x: usize) -> f32 {
    let depth_frac = if shape.depth > 1 {
        d as f64 / (shape.depth - 1) as f64
    } else {
        0.5
    };
    let log_tau = LOG_TAU_TOP + (LOG_TAU_BOTTOM - LOG_TAU_TOP) * depth_frac;
    let xf = x as f64 / shape.nx.max(1) as f64;
    let yf = y as f64 / shape.ny.max(1) as f64;

    let value = match quantity {
        Quantity::Tau => 10f64.powf(log_tau),
        Quantity::Temperature => 4200.0 + 1100.0 * depth_frac + 800.0 * xf + 10.0 * y as f64,
        Quantity::Pressure => 10f64.powf(4.0 + 0.4 * log_tau + 0.2 * yf),
        Quantity::Density => 1.0e-7 * (1.0 + 4.0 * depth_frac) * (1.0 + 0.1 * xf),
        Quantity::Velocity => (xf - 0.5) * 4.0e5 + 2.0e4 * yf,
        Quantity::FieldX => 200.0 * yf,
        Quantity::FieldY => 50.0 + 100.0 * xf,
        Quantity::FieldZ => 500.0 * (yf - 0.3) + 300.0 * depth_frac,
        Quantity::ElectronDensity => 1.0e12 * (1.0 + 9.0 * depth_frac),
    };
    value as f32
}

/// One synthetic `(depth, y, x)` cube.
pub fn synthetic_cube(quantity: Quantity, shape: CubeShape) -> Array3<f32> {
    Array3::from_shape_fn((shape.depth, shape.ny, shape.nx), |(d, y, x)| {
        atmosphere_value(quantity, shape, d, y, x)
    })
}

/// Every quantity of a synthetic atmosphere, as loaded cubes.
///
/// # Example
///
/// ```
/// use synth_common::CubeShape;
/// use test_utils::synthetic_cubes;
///
/// let cubes = synthetic_cubes(CubeShape { depth: 12, ny: 4, nx: 5 });
/// assert_eq!(cubes.grid().nx, 5);
/// assert_eq!(cubes.grid().ny, 4);
/// ```
pub fn synthetic_cubes(shape: CubeShape) -> QuantityCubes {
    let cubes = std::array::from_fn(|i| synthetic_cube(Quantity::ALL[i], shape));
    match QuantityCubes::new(cubes) {
        Ok(cubes) => cubes,
        Err(e) => panic!("synthetic cubes of shape {:?} rejected: {}", shape, e),
    }
}
