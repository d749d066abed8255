//! Full-grid quantity cubes.

use ndarray::{Array1, Array2, Array3, Axis};
use tracing::debug;

use crate::column::{Column, ColumnBatch, VelocityKind};
use crate::error::{Result, SynthError};
use crate::grid::{GridShape, Pixel};
use crate::loader::CubeLoader;
use crate::quantity::Quantity;

/// Dimensions of a `(depth, y, x)` cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeShape {
    pub depth: usize,
    pub ny: usize,
    pub nx: usize,
}

impl CubeShape {
    pub fn grid(&self) -> GridShape {
        GridShape::new(self.nx, self.ny)
    }
}

/// All physical quantities of an atmosphere, each as a `(depth, y, x)` cube.
///
/// Loaded once per run and read-only afterwards.
#[derive(Debug, Clone)]
pub struct QuantityCubes {
    cubes: [Array3<f32>; Quantity::COUNT],
    shape: CubeShape,
}

impl QuantityCubes {
    /// Wrap a set of cubes, indexed like [`Quantity::ALL`]. All cubes must share
    /// one shape.
    pub fn new(cubes: [Array3<f32>; Quantity::COUNT]) -> Result<Self> {
        let (depth, ny, nx) = cubes[0].dim();
        for (q, cube) in Quantity::ALL.iter().zip(cubes.iter()) {
            if cube.dim() != (depth, ny, nx) {
                return Err(SynthError::shape_mismatch(format!(
                    "cube {} has shape {:?}, expected {:?}",
                    q,
                    cube.dim(),
                    (depth, ny, nx)
                )));
            }
        }
        if depth == 0 || ny == 0 || nx == 0 {
            return Err(SynthError::shape_mismatch(format!(
                "cubes must be non-empty, got {:?}",
                (depth, ny, nx)
            )));
        }

        Ok(Self {
            cubes,
            shape: CubeShape { depth, ny, nx },
        })
    }

    /// Load every quantity through a loader.
    pub fn load(loader: &dyn CubeLoader) -> Result<Self> {
        let mut cubes = Vec::with_capacity(Quantity::COUNT);
        for quantity in Quantity::ALL {
            let cube = loader.load(quantity)?;
            debug!(quantity = %quantity, shape = ?cube.dim(), "Loaded cube");
            cubes.push(cube);
        }

        let cubes: [Array3<f32>; Quantity::COUNT] = cubes
            .try_into()
            .map_err(|_| SynthError::shape_mismatch("loader returned wrong cube count"))?;
        Self::new(cubes)
    }

    pub fn shape(&self) -> CubeShape {
        self.shape
    }

    pub fn grid(&self) -> GridShape {
        self.shape.grid()
    }

    pub fn get(&self, quantity: Quantity) -> &Array3<f32> {
        &self.cubes[quantity.index()]
    }

    fn check_pixel(&self, pixel: Pixel) -> Result<()> {
        if pixel.x >= self.shape.nx || pixel.y >= self.shape.ny {
            return Err(SynthError::OutOfBounds {
                x: pixel.x,
                y: pixel.y,
                nx: self.shape.nx,
                ny: self.shape.ny,
            });
        }
        Ok(())
    }

    fn profile(&self, quantity: Quantity, pixel: Pixel) -> Array1<f64> {
        self.get(quantity)
            .slice(ndarray::s![.., pixel.y, pixel.x])
            .mapv(f64::from)
    }

    /// Depth profiles of every quantity at one pixel, widened to `f64`.
    pub fn column(&self, pixel: Pixel, velocity: VelocityKind) -> Result<Column> {
        self.check_pixel(pixel)?;

        let mut profiles: [Array1<f64>; Quantity::COUNT] =
            std::array::from_fn(|i| self.profile(Quantity::ALL[i], pixel));

        if velocity == VelocityKind::Momentum {
            let rho = &profiles[Quantity::Density.index()];
            let vz = &profiles[Quantity::Velocity.index()] / rho;
            profiles[Quantity::Velocity.index()] = vz;
        }

        Ok(Column::new(profiles))
    }

    /// Depth profiles for a list of pixels, as `(depth, pixel)` arrays.
    pub fn columns(&self, pixels: &[Pixel], velocity: VelocityKind) -> Result<ColumnBatch> {
        for &pixel in pixels {
            self.check_pixel(pixel)?;
        }

        let depth = self.shape.depth;
        let mut profiles: [Array2<f64>; Quantity::COUNT] =
            std::array::from_fn(|_| Array2::zeros((depth, pixels.len())));

        for (qi, quantity) in Quantity::ALL.iter().enumerate() {
            for (i, &pixel) in pixels.iter().enumerate() {
                profiles[qi]
                    .index_axis_mut(Axis(1), i)
                    .assign(&self.profile(*quantity, pixel));
            }
        }

        if velocity == VelocityKind::Momentum {
            let vz = &profiles[Quantity::Velocity.index()] / &profiles[Quantity::Density.index()];
            profiles[Quantity::Velocity.index()] = vz;
        }

        ColumnBatch::new(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubes(depth: usize, ny: usize, nx: usize) -> QuantityCubes {
        let cubes = std::array::from_fn(|qi| {
            Array3::from_shape_fn((depth, ny, nx), |(d, y, x)| {
                (qi * 1000 + d * 100 + y * 10 + x) as f32 + 1.0
            })
        });
        QuantityCubes::new(cubes).unwrap()
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut arrays: [Array3<f32>; Quantity::COUNT] =
            std::array::from_fn(|_| Array3::zeros((4, 3, 2)));
        arrays[5] = Array3::zeros((4, 2, 3));
        assert!(matches!(
            QuantityCubes::new(arrays),
            Err(SynthError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_column_extracts_depth_profile() {
        let cubes = cubes(3, 4, 5);
        let column = cubes.column(Pixel::new(2, 1), VelocityKind::Velocity).unwrap();
        let t = column.get(Quantity::Temperature);
        assert_eq!(t.to_vec(), vec![13.0, 113.0, 213.0]);
        assert_eq!(column.depth(), 3);
    }

    #[test]
    fn test_column_momentum_divides_by_density() {
        let cubes = cubes(2, 2, 2);
        let column = cubes.column(Pixel::new(1, 1), VelocityKind::Momentum).unwrap();
        let vz = column.get(Quantity::Velocity);
        assert!((vz[0] - 3012.0 / 2012.0).abs() < 1e-12);
        assert!((vz[1] - 3112.0 / 2112.0).abs() < 1e-12);
    }

    #[test]
    fn test_columns_match_single_columns() {
        let cubes = cubes(3, 4, 5);
        let pixels = [Pixel::new(0, 0), Pixel::new(4, 3), Pixel::new(2, 1)];
        let batch = cubes.columns(&pixels, VelocityKind::Momentum).unwrap();
        assert_eq!(batch.pixel_count(), 3);
        for (i, &pixel) in pixels.iter().enumerate() {
            let single = cubes.column(pixel, VelocityKind::Momentum).unwrap();
            assert_eq!(batch.column(i), single);
        }
    }

    #[test]
    fn test_column_out_of_bounds() {
        let cubes = cubes(1, 2, 2);
        assert!(matches!(
            cubes.column(Pixel::new(2, 0), VelocityKind::Velocity),
            Err(SynthError::OutOfBounds { .. })
        ));
    }
}
