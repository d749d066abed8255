//! Coordinator side of a distributed run.

use synth_common::PhysicsModel;
use tracing::{debug, info};

use crate::broadcast::distribute_config;
use crate::context::{blocking, RunContext};
use crate::dispatcher::{Dispatcher, Reply};
use crate::error::{DispatchError, Result};
use crate::partition::Batch;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::protocol::{BatchResult, FromWorker, ToWorker};
use crate::transport::CoordinatorLink;

/// Message counts of a finished dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub workers: usize,
    pub batches: usize,
    pub starts_sent: usize,
    pub exits_sent: usize,
    pub results_received: usize,
}

/// Distribute the model configuration, then serve batches until every
/// worker has acknowledged its exit.
///
/// Results are written through `ctx` as they arrive. Any protocol violation
/// or write failure aborts the run.
pub async fn run_coordinator<M, L>(
    ctx: &mut RunContext,
    batches: &[Batch],
    link: &mut L,
    model: &M,
    sink: &dyn ProgressSink,
) -> Result<DispatchReport>
where
    M: PhysicsModel,
    L: CoordinatorLink,
{
    let workers = distribute_config(link, model).await?;
    sink.emit(ProgressEvent::ConfigDistributed { workers });

    let pixels: usize = batches.iter().map(Batch::len).sum();
    sink.emit(ProgressEvent::DispatchStarted {
        workers,
        batches: batches.len(),
        pixels,
    });
    info!(
        workers = workers,
        batches = batches.len(),
        pixels = pixels,
        "Dispatching batches"
    );

    let mut dispatcher = Dispatcher::new(batches.len(), workers);

    while !dispatcher.is_done() {
        let envelope = link.recv().await?;
        let source = envelope.source;

        match envelope.message {
            FromWorker::Ready => match dispatcher.on_ready(source)? {
                Reply::Start(index) => {
                    let batch = &batches[index];
                    let task = ctx.task_for(batch)?;
                    link.send(source, ToWorker::Start(Box::new(task))).await?;
                    sink.emit(ProgressEvent::BatchSent {
                        index,
                        worker: source,
                        pixels: batch.len(),
                    });
                }
                Reply::Exit => {
                    link.send(source, ToWorker::Exit).await?;
                    sink.emit(ProgressEvent::WorkerReleased { worker: source });
                }
            },
            FromWorker::Done(result) => {
                dispatcher.on_done(source, result.index)?;
                check_echo(&batches[result.index], &result)?;
                let written = blocking(|| ctx.record_result(&result))?;
                sink.emit(ProgressEvent::BatchReceived {
                    index: result.index,
                    worker: source,
                    pixels: written,
                });
            }
            FromWorker::Exit => {
                dispatcher.on_exit(source)?;
                sink.emit(ProgressEvent::WorkerClosed { worker: source });
            }
            FromWorker::Configured => {
                return Err(DispatchError::protocol(format!(
                    "CONFIGURED from {} after configuration finished",
                    source
                )));
            }
        }
    }

    let report = DispatchReport {
        workers,
        batches: batches.len(),
        starts_sent: dispatcher.starts_sent(),
        exits_sent: dispatcher.exits_sent(),
        results_received: dispatcher.results_received(),
    };
    debug!(report = ?report, "Dispatch complete");
    Ok(report)
}

/// A result must carry back exactly the coordinates of the batch it answers.
fn check_echo(batch: &Batch, result: &BatchResult) -> Result<()> {
    if result.xs != batch.xs || result.ys != batch.ys {
        return Err(DispatchError::protocol(format!(
            "result for batch {} does not match the issued pixels",
            result.index
        )));
    }
    Ok(())
}
