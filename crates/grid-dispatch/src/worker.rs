//! Worker side of a distributed run.

use std::sync::Arc;

use synth_common::PhysicsModel;
use tracing::{debug, info};

use crate::broadcast::receive_config;
use crate::error::{DispatchError, Result};
use crate::protocol::{BatchResult, FromWorker, Task, ToWorker, WorkerId};
use crate::transport::WorkerLink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: WorkerId,
    /// Batches evaluated by this worker.
    pub batches: usize,
}

/// Rebuild the model from the broadcast configuration, then request and
/// evaluate batches until told to exit.
///
/// A worker never touches the output stores.
pub async fn run_worker<M, L>(link: &mut L) -> Result<WorkerReport>
where
    M: PhysicsModel,
    L: WorkerLink,
{
    let model = Arc::new(receive_config::<M, L>(link).await?);
    let id = link.id();
    let mut batches = 0;

    loop {
        link.send(FromWorker::Ready).await?;

        match link.recv().await? {
            ToWorker::Start(task) => {
                let result = evaluate(model.clone(), *task).await?;
                debug!(worker = %id, batch = result.index, "Batch evaluated");
                link.send(FromWorker::Done(Box::new(result))).await?;
                batches += 1;
            }
            ToWorker::Exit => break,
            ToWorker::Configure(_) => {
                return Err(DispatchError::protocol(format!(
                    "{} received CONFIGURE during dispatch",
                    id
                )));
            }
        }
    }

    link.send(FromWorker::Exit).await?;
    info!(worker = %id, batches = batches, "Worker finished");

    Ok(WorkerReport {
        worker: id,
        batches,
    })
}

/// Run the model off the async runtime.
async fn evaluate<M: PhysicsModel>(model: Arc<M>, task: Task) -> Result<BatchResult> {
    tokio::task::spawn_blocking(move || -> Result<BatchResult> {
        let synthesis = model.synth2d(&task.columns, task.interpolate)?;
        Ok(BatchResult {
            index: task.index,
            xs: task.xs,
            ys: task.ys,
            synthesis,
        })
    })
    .await
    .map_err(|e| DispatchError::Worker(e.to_string()))?
}
