//! One-shot distribution of the model configuration.
//!
//! Both sides meet at a barrier, the coordinator sends the serialized
//! configuration to every worker, each worker rebuilds its model and
//! acknowledges, and all participants meet at a second barrier. No batch is
//! dispatched before the second barrier, so every worker evaluates with a
//! fully built model.

use std::collections::BTreeSet;

use bytes::Bytes;
use synth_common::PhysicsModel;
use tracing::{debug, info};

use crate::error::{DispatchError, Result};
use crate::protocol::{FromWorker, ToWorker};
use crate::transport::{CoordinatorLink, WorkerLink};

/// Coordinator side. Returns once every worker holds a rebuilt model.
pub async fn distribute_config<M, L>(link: &mut L, model: &M) -> Result<usize>
where
    M: PhysicsModel,
    L: CoordinatorLink,
{
    let payload = Bytes::from(serde_json::to_vec(model.config())?);
    let workers = link.worker_ids();

    link.barrier().await;

    for &id in &workers {
        link.send(id, ToWorker::Configure(payload.clone())).await?;
    }

    let mut pending: BTreeSet<_> = workers.iter().copied().collect();
    while !pending.is_empty() {
        let envelope = link.recv().await?;
        match envelope.message {
            FromWorker::Configured if pending.remove(&envelope.source) => {
                debug!(worker = %envelope.source, "Worker configured");
            }
            other => {
                return Err(DispatchError::protocol(format!(
                    "unexpected {} from {} during configuration",
                    other.kind(),
                    envelope.source
                )));
            }
        }
    }

    link.barrier().await;

    info!(
        workers = workers.len(),
        bytes = payload.len(),
        "Model configuration distributed"
    );
    Ok(workers.len())
}

/// Worker side. Returns the model rebuilt from the broadcast configuration.
pub async fn receive_config<M, L>(link: &mut L) -> Result<M>
where
    M: PhysicsModel,
    L: WorkerLink,
{
    link.barrier().await;

    let payload = match link.recv().await? {
        ToWorker::Configure(payload) => payload,
        other => {
            return Err(DispatchError::protocol(format!(
                "{} expected CONFIGURE, got {}",
                link.id(),
                other.kind()
            )));
        }
    };

    let config: M::Config = serde_json::from_slice(&payload)?;
    let model = M::from_config(config)?;
    link.send(FromWorker::Configured).await?;

    link.barrier().await;

    debug!(worker = %link.id(), "Model rebuilt from broadcast configuration");
    Ok(model)
}
