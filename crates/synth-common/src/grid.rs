//! Pixel grid geometry.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Horizontal extent of an atmosphere grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    pub nx: usize,
    pub ny: usize,
}

impl GridShape {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self { nx, ny }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.nx * self.ny
    }

    /// The region covering the whole grid.
    pub fn full_region(&self) -> PixelRegion {
        PixelRegion::new(0..self.nx, 0..self.ny)
    }

    /// Check that a region lies inside the grid and is not empty.
    pub fn contains_region(&self, region: &PixelRegion) -> bool {
        !region.is_empty() && region.x.end <= self.nx && region.y.end <= self.ny
    }
}

/// A single `(x, y)` grid location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pixel {
    pub x: usize,
    pub y: usize,
}

impl Pixel {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// A rectangular sub-range of the grid, half-open on both axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRegion {
    pub x: Range<usize>,
    pub y: Range<usize>,
}

impl PixelRegion {
    pub fn new(x: Range<usize>, y: Range<usize>) -> Self {
        Self { x, y }
    }

    pub fn width(&self) -> usize {
        self.x.len()
    }

    pub fn height(&self) -> usize {
        self.y.len()
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    pub fn contains(&self, pixel: Pixel) -> bool {
        self.x.contains(&pixel.x) && self.y.contains(&pixel.y)
    }

    /// Row-major offset of a pixel inside the region.
    pub fn offset(&self, pixel: Pixel) -> Option<usize> {
        if !self.contains(pixel) {
            return None;
        }
        Some((pixel.y - self.y.start) * self.width() + (pixel.x - self.x.start))
    }

    /// Pixels in raster order: rows outer, columns inner.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.y
            .clone()
            .flat_map(move |y| self.x.clone().map(move |x| Pixel::new(x, y)))
    }
}

impl std::fmt::Display for PixelRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "x=[{}, {}) y=[{}, {})",
            self.x.start, self.x.end, self.y.start, self.y.end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_raster_order() {
        let region = PixelRegion::new(1..3, 5..7);
        let pixels: Vec<_> = region.pixels().collect();
        assert_eq!(
            pixels,
            vec![
                Pixel::new(1, 5),
                Pixel::new(2, 5),
                Pixel::new(1, 6),
                Pixel::new(2, 6)
            ]
        );
    }

    #[test]
    fn test_region_offset() {
        let region = PixelRegion::new(2..5, 0..10);
        assert_eq!(region.offset(Pixel::new(2, 0)), Some(0));
        assert_eq!(region.offset(Pixel::new(4, 1)), Some(5));
        assert_eq!(region.offset(Pixel::new(5, 1)), None);
    }

    #[test]
    fn test_grid_contains_region() {
        let grid = GridShape::new(10, 10);
        assert!(grid.contains_region(&PixelRegion::new(2..5, 0..10)));
        assert!(!grid.contains_region(&PixelRegion::new(2..11, 0..10)));
        assert!(!grid.contains_region(&PixelRegion::new(3..3, 0..10)));
    }
}
