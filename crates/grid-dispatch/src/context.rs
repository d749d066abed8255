//! State owned by the coordinator for the lifetime of a run.

use std::ops::Range;

use ndarray::s;
use spectral_store::{ModelStore, SpectraStore, StoreSummary};
use synth_common::{
    BatchSynthesis, Column, GridShape, OutputLayout, Pixel, PixelRegion, QuantityCubes,
    Synthesis, VelocityKind,
};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::block_in_place;
use tracing::info;

use crate::config::RunPlan;
use crate::error::{DispatchError, Result};
use crate::partition::Batch;
use crate::protocol::{BatchResult, Task};

/// Run a blocking closure without stalling the other tasks of a
/// multi-threaded runtime. Elsewhere it runs in place.
pub(crate) fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => block_in_place(f),
        _ => f(),
    }
}

/// Split raster-ordered coordinates into maximal runs of adjacent pixels on
/// one row.
pub(crate) fn row_segments(xs: &[usize], ys: &[usize]) -> Vec<Range<usize>> {
    let n = xs.len().min(ys.len());
    let mut segments = Vec::new();
    let mut start = 0;
    for i in 1..n {
        if ys[i] != ys[i - 1] || xs[i] != xs[i - 1] + 1 {
            segments.push(start..i);
            start = i;
        }
    }
    if start < n {
        segments.push(start..n);
    }
    segments
}

/// Summaries of the stores closed at the end of a run.
#[derive(Debug, Clone)]
pub struct RunOutputs {
    pub spectra: StoreSummary,
    pub model: Option<StoreSummary>,
}

/// The input cubes and open output stores of a run.
///
/// Only the coordinator touches the stores; workers see nothing but the
/// tasks built here.
pub struct RunContext {
    grid: GridShape,
    region: PixelRegion,
    cubes: QuantityCubes,
    spectra: SpectraStore,
    model: Option<ModelStore>,
    velocity: VelocityKind,
}

impl RunContext {
    pub fn new(
        region: PixelRegion,
        cubes: QuantityCubes,
        spectra: SpectraStore,
        model: Option<ModelStore>,
        velocity: VelocityKind,
    ) -> Self {
        Self {
            grid: cubes.grid(),
            region,
            cubes,
            spectra,
            model,
            velocity,
        }
    }

    /// Create the output stores described by `plan` for a model with `layout`.
    pub fn create(
        plan: &RunPlan,
        cubes: QuantityCubes,
        region: PixelRegion,
        layout: &OutputLayout,
    ) -> Result<Self> {
        let grid = cubes.grid();

        let spectra = SpectraStore::create(
            &plan.outputs.spectra,
            grid,
            region.clone(),
            layout,
            &plan.store,
        )?;

        let model = match (&plan.outputs.model, plan.run.interpolate) {
            (Some(path), true) => Some(ModelStore::create(
                path,
                grid,
                region.clone(),
                layout,
                &plan.store,
            )?),
            _ => None,
        };

        info!(
            region = %region,
            pixels = region.pixel_count(),
            interpolate = model.is_some(),
            "Run context created"
        );

        Ok(Self::new(region, cubes, spectra, model, plan.run.velocity))
    }

    pub fn grid(&self) -> GridShape {
        self.grid
    }

    pub fn region(&self) -> &PixelRegion {
        &self.region
    }

    /// Whether a resampled model is written alongside the spectra.
    pub fn interpolate(&self) -> bool {
        self.model.is_some()
    }

    pub fn pixels_written(&self) -> usize {
        self.spectra.ledger().written_count()
    }

    /// Gather the depth profiles of a batch.
    pub fn task_for(&self, batch: &Batch) -> Result<Task> {
        let columns = self.cubes.columns(&batch.pixels(), self.velocity)?;
        Ok(Task {
            index: batch.index,
            xs: batch.xs.clone(),
            ys: batch.ys.clone(),
            columns,
            interpolate: self.interpolate(),
        })
    }

    /// Evaluate-ready profiles of one pixel.
    pub fn column(&self, pixel: Pixel) -> Result<Column> {
        Ok(self.cubes.column(pixel, self.velocity)?)
    }

    /// Write a completed batch. Returns the number of pixels written.
    pub fn record_result(&mut self, result: &BatchResult) -> Result<usize> {
        let synthesis = &result.synthesis;
        let n = result.xs.len();

        if result.ys.len() != n || synthesis.pixel_count() != n {
            return Err(DispatchError::protocol(format!(
                "batch {} carries {} xs, {} ys and {} spectra",
                result.index,
                n,
                result.ys.len(),
                synthesis.pixel_count()
            )));
        }
        self.check_model(result.index, synthesis)?;

        self.spectra.record_wavelength(synthesis.wavelength.view())?;

        for run in row_segments(&result.xs, &result.ys) {
            let start = Pixel::new(result.xs[run.start], result.ys[run.start]);
            self.spectra
                .write_segment(start, synthesis.stokes.slice(s![.., run.clone(), ..]))?;

            if let (Some(store), Some(model)) = (self.model.as_mut(), synthesis.model.as_ref()) {
                store.write_segment(start, model.slice(s![.., run, ..]))?;
            }
        }

        Ok(n)
    }

    /// Write a single evaluated pixel.
    pub fn record_pixel(&mut self, pixel: Pixel, synthesis: &Synthesis) -> Result<()> {
        if self.model.is_some() && synthesis.model.is_none() {
            return Err(DispatchError::protocol(format!(
                "pixel ({}, {}) returned no resampled model",
                pixel.x, pixel.y
            )));
        }

        self.spectra.record_wavelength(synthesis.wavelength.view())?;
        self.spectra.write_pixel(pixel, synthesis.stokes.view())?;

        if let (Some(store), Some(model)) = (self.model.as_mut(), synthesis.model.as_ref()) {
            store.write_pixel(pixel, model.view())?;
        }
        Ok(())
    }

    /// Close the stores, failing if any pixel of the region was never written.
    pub fn finish(self) -> Result<RunOutputs> {
        let spectra = self.spectra.close()?;
        let model = self.model.map(ModelStore::close).transpose()?;
        Ok(RunOutputs { spectra, model })
    }

    fn check_model(&self, index: usize, synthesis: &BatchSynthesis) -> Result<()> {
        if self.model.is_some() && synthesis.model.is_none() {
            return Err(DispatchError::protocol(format!(
                "batch {} returned no resampled model",
                index
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_segments_split_at_row_ends() {
        // A 3-wide region x in 2..5, batch covering (3,0)..(3,2).
        let xs = [3, 4, 2, 3, 4, 2, 3];
        let ys = [0, 0, 1, 1, 1, 2, 2];
        assert_eq!(row_segments(&xs, &ys), vec![0..2, 2..5, 5..7]);
    }

    #[test]
    fn test_row_segments_split_on_gaps() {
        assert_eq!(row_segments(&[0, 1, 3], &[0, 0, 0]), vec![0..2, 2..3]);
        assert_eq!(row_segments(&[5], &[1]), vec![0..1]);
        assert!(row_segments(&[], &[]).is_empty());
    }

    #[test]
    fn test_blocking_runs_outside_runtime() {
        assert_eq!(blocking(|| 7), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_on_multi_thread_runtime() {
        let mut written = 0;
        blocking(|| written += 3);
        assert_eq!(written, 3);
    }

    #[tokio::test]
    async fn test_blocking_on_current_thread_runtime() {
        assert_eq!(blocking(|| "inline"), "inline");
    }
}
