//! Message transport between participants.
//!
//! The dispatch logic only talks to [`CoordinatorLink`] and [`WorkerLink`].
//! [`LocalCluster`] implements both over tokio channels so that a run on one
//! machine uses the same protocol as a multi-host deployment.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Barrier};
use tracing::debug;

use crate::error::{DispatchError, Result};
use crate::protocol::{Envelope, FromWorker, ToWorker, WorkerId};

/// The coordinator's view of the run.
#[async_trait]
pub trait CoordinatorLink: Send {
    /// Ranks of all worker participants.
    fn worker_ids(&self) -> Vec<WorkerId>;

    async fn send(&self, to: WorkerId, message: ToWorker) -> Result<()>;

    /// Receive the next message from any worker.
    async fn recv(&mut self) -> Result<Envelope>;

    /// Block until every participant reaches the barrier.
    async fn barrier(&self);
}

/// A worker's view of the run.
#[async_trait]
pub trait WorkerLink: Send {
    fn id(&self) -> WorkerId;

    async fn send(&self, message: FromWorker) -> Result<()>;

    async fn recv(&mut self) -> Result<ToWorker>;

    async fn barrier(&self);
}

/// In-process cluster of one coordinator and `workers` workers.
pub struct LocalCluster;

impl LocalCluster {
    /// Wire up a coordinator and its workers.
    pub fn new(workers: usize) -> Result<(LocalCoordinator, Vec<LocalWorker>)> {
        if workers == 0 {
            return Err(DispatchError::InsufficientProcesses(1));
        }

        let barrier = Arc::new(Barrier::new(workers + 1));
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        let mut outboxes = BTreeMap::new();
        let mut links = Vec::with_capacity(workers);
        for rank in 1..=workers {
            let id = WorkerId(rank);
            let (tx, rx) = mpsc::unbounded_channel();
            outboxes.insert(id, tx);
            links.push(LocalWorker {
                id,
                inbox: rx,
                outbox: inbox_tx.clone(),
                barrier: barrier.clone(),
            });
        }

        debug!(workers = workers, "Local cluster created");

        let coordinator = LocalCoordinator {
            outboxes,
            inbox: inbox_rx,
            barrier,
        };
        Ok((coordinator, links))
    }
}

pub struct LocalCoordinator {
    outboxes: BTreeMap<WorkerId, mpsc::UnboundedSender<ToWorker>>,
    inbox: mpsc::UnboundedReceiver<Envelope>,
    barrier: Arc<Barrier>,
}

#[async_trait]
impl CoordinatorLink for LocalCoordinator {
    fn worker_ids(&self) -> Vec<WorkerId> {
        self.outboxes.keys().copied().collect()
    }

    async fn send(&self, to: WorkerId, message: ToWorker) -> Result<()> {
        let outbox = self
            .outboxes
            .get(&to)
            .ok_or_else(|| DispatchError::protocol(format!("unknown {}", to)))?;
        outbox
            .send(message)
            .map_err(|_| DispatchError::ChannelClosed(to.to_string()))
    }

    async fn recv(&mut self) -> Result<Envelope> {
        self.inbox
            .recv()
            .await
            .ok_or_else(|| DispatchError::ChannelClosed("all workers".to_string()))
    }

    async fn barrier(&self) {
        self.barrier.wait().await;
    }
}

pub struct LocalWorker {
    id: WorkerId,
    inbox: mpsc::UnboundedReceiver<ToWorker>,
    outbox: mpsc::UnboundedSender<Envelope>,
    barrier: Arc<Barrier>,
}

#[async_trait]
impl WorkerLink for LocalWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    async fn send(&self, message: FromWorker) -> Result<()> {
        self.outbox
            .send(Envelope {
                source: self.id,
                message,
            })
            .map_err(|_| DispatchError::ChannelClosed("coordinator".to_string()))
    }

    async fn recv(&mut self) -> Result<ToWorker> {
        self.inbox
            .recv()
            .await
            .ok_or_else(|| DispatchError::ChannelClosed("coordinator".to_string()))
    }

    async fn barrier(&self) {
        self.barrier.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_are_tagged_with_sender() {
        let (mut coordinator, workers) = LocalCluster::new(2).unwrap();
        assert_eq!(coordinator.worker_ids(), vec![WorkerId(1), WorkerId(2)]);

        workers[1].send(FromWorker::Ready).await.unwrap();
        let envelope = coordinator.recv().await.unwrap();
        assert_eq!(envelope.source, WorkerId(2));
        assert!(matches!(envelope.message, FromWorker::Ready));
    }

    #[tokio::test]
    async fn test_send_reaches_addressed_worker_only() {
        let (coordinator, mut workers) = LocalCluster::new(2).unwrap();
        coordinator.send(WorkerId(1), ToWorker::Exit).await.unwrap();

        assert!(matches!(workers[0].recv().await.unwrap(), ToWorker::Exit));
        assert!(workers[1].inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_worker_rejected() {
        let (coordinator, _workers) = LocalCluster::new(1).unwrap();
        let err = coordinator.send(WorkerId(5), ToWorker::Exit).await;
        assert!(matches!(err, Err(DispatchError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_dropped_workers_close_inbox() {
        let (mut coordinator, workers) = LocalCluster::new(2).unwrap();
        drop(workers);
        assert!(matches!(
            coordinator.recv().await,
            Err(DispatchError::ChannelClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_barrier_releases_all_participants() {
        let (coordinator, workers) = LocalCluster::new(3).unwrap();
        let handles: Vec<_> = workers
            .into_iter()
            .map(|w| tokio::spawn(async move { w.barrier().await }))
            .collect();

        coordinator.barrier().await;
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(LocalCluster::new(0).is_err());
    }
}
