//! Grid partitioning.
//!
//! The region is flattened in raster order (rows outer, columns inner) and
//! split into `max(1, floor(n / batch_size))` contiguous batches whose sizes
//! differ by at most one. The first `n % k` batches carry the extra pixel.

use serde::{Deserialize, Serialize};
use synth_common::{GridShape, Pixel, PixelRegion};

use crate::error::{DispatchError, Result};

/// A contiguous run of pixels handed to one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Position in the partition.
    pub index: usize,
    /// Column coordinates, parallel to `ys`.
    pub xs: Vec<usize>,
    /// Row coordinates, parallel to `xs`.
    pub ys: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn pixels(&self) -> Vec<Pixel> {
        self.xs
            .iter()
            .zip(&self.ys)
            .map(|(&x, &y)| Pixel::new(x, y))
            .collect()
    }
}

/// Number of batches a region of `pixels` pixels is split into.
///
/// Never more batches than pixels, so every batch is non-empty.
pub fn batch_count(pixels: usize, batch_size: usize) -> usize {
    (pixels / batch_size.max(1)).max(1).min(pixels)
}

/// Split `region` of `grid` into batches.
pub fn partition(grid: GridShape, region: &PixelRegion, batch_size: usize) -> Result<Vec<Batch>> {
    if batch_size == 0 {
        return Err(DispatchError::invalid_config("batch_size must be > 0"));
    }
    if !grid.contains_region(region) {
        return Err(DispatchError::RegionOutOfBounds {
            region: region.to_string(),
            nx: grid.nx,
            ny: grid.ny,
        });
    }

    let pixels: Vec<Pixel> = region.pixels().collect();
    let n = pixels.len();
    let k = batch_count(n, batch_size);
    let base = n / k;
    let extra = n % k;

    let mut batches = Vec::with_capacity(k);
    let mut start = 0;
    for index in 0..k {
        let len = base + usize::from(index < extra);
        let slice = &pixels[start..start + len];
        batches.push(Batch {
            index,
            xs: slice.iter().map(|p| p.x).collect(),
            ys: slice.iter().map(|p| p.y).collect(),
        });
        start += len;
    }

    Ok(batches)
}
