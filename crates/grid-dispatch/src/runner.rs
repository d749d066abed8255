//! Top-level run execution.

use std::time::{Duration, Instant};

use futures::future::{try_join, try_join_all};
use serde::Serialize;
use spectral_store::StoreSummary;
use synth_common::{CubeLoader, PhysicsModel, QuantityCubes};
use tracing::{info, warn};

use crate::config::{ExecutionMode, RunPlan};
use crate::context::{blocking, RunContext};
use crate::coordinator::{run_coordinator, DispatchReport};
use crate::error::{DispatchError, Result};
use crate::partition::{partition, Batch};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::serial::run_serial;
use crate::transport::LocalCluster;
use crate::worker::{run_worker, WorkerReport};

/// Outcome of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: ExecutionMode,
    pub pixels: usize,
    pub batches: usize,
    pub workers: usize,
    pub starts_sent: usize,
    pub exits_sent: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    pub spectra: StoreSummary,
    pub model: Option<StoreSummary>,
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Run the coordinator and `workers` in-process workers until every worker
/// has exited.
///
/// A failing worker fails the run.
pub async fn run_distributed<M: PhysicsModel>(
    ctx: &mut RunContext,
    batches: &[Batch],
    workers: usize,
    model: &M,
    sink: &dyn ProgressSink,
) -> Result<DispatchReport> {
    let (mut coordinator, links) = LocalCluster::new(workers)?;

    let tasks: Vec<_> = links
        .into_iter()
        .map(|mut link| tokio::spawn(async move { run_worker::<M, _>(&mut link).await }))
        .collect();
    let aborts: Vec<_> = tasks.iter().map(|task| task.abort_handle()).collect();

    let joined = try_join(
        run_coordinator(ctx, batches, &mut coordinator, model, sink),
        try_join_all(tasks.into_iter().map(|task| async move {
            task.await
                .unwrap_or_else(|e| Err(DispatchError::Worker(e.to_string())))
        })),
    )
    .await;

    if joined.is_err() {
        for abort in &aborts {
            abort.abort();
        }
    }
    let (report, worker_reports): (DispatchReport, Vec<WorkerReport>) = joined?;

    for worker in &worker_reports {
        if worker.batches == 0 {
            warn!(worker = %worker.worker, "Worker received no batches");
        }
    }

    Ok(report)
}

/// Execute a run: load the atmosphere, create the stores, evaluate every
/// pixel of the region and close the stores.
///
/// Configuration is checked before any input is read or output created.
pub async fn execute<M: PhysicsModel>(
    plan: &RunPlan,
    loader: &dyn CubeLoader,
    model: &M,
    sink: &dyn ProgressSink,
) -> Result<RunReport> {
    plan.validate()?;
    let started = Instant::now();

    let cubes = QuantityCubes::load(loader)?;
    let grid = cubes.grid();
    let region = plan.run.resolve_region(grid)?;
    let pixels = region.pixel_count();

    // Partition before creating stores so a bad region leaves no output behind.
    let batches = match plan.run.mode {
        ExecutionMode::Serial => Vec::new(),
        ExecutionMode::Distributed => partition(grid, &region, plan.run.batch_size)?,
    };

    let mut ctx = RunContext::create(plan, cubes, region, &model.layout())?;

    let dispatch = match plan.run.mode {
        ExecutionMode::Serial => {
            blocking(|| run_serial(&mut ctx, model, sink))?;
            None
        }
        ExecutionMode::Distributed => Some(
            run_distributed(&mut ctx, &batches, plan.run.workers(), model, sink).await?,
        ),
    };

    let written = ctx.pixels_written();
    let outputs = blocking(|| ctx.finish())?;
    let elapsed = started.elapsed();

    sink.emit(ProgressEvent::Finished {
        pixels: written,
        elapsed,
    });

    let report = RunReport {
        mode: plan.run.mode,
        pixels,
        batches: batches.len(),
        workers: plan.run.workers(),
        starts_sent: dispatch.map(|d| d.starts_sent).unwrap_or(0),
        exits_sent: dispatch.map(|d| d.exits_sent).unwrap_or(0),
        elapsed,
        spectra: outputs.spectra,
        model: outputs.model,
    };

    info!(
        mode = %report.mode,
        pixels = report.pixels,
        batches = report.batches,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Run complete"
    );
    Ok(report)
}
