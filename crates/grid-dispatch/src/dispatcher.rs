//! Coordinator dispatch state machine.
//!
//! Pure bookkeeping: it decides how to answer each worker message and
//! verifies the message sequence, but performs no I/O. The async loop in
//! [`crate::coordinator`] drives it.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{DispatchError, Result};
use crate::protocol::WorkerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// No message handled yet.
    Idle,
    /// Batches remain unsent.
    Dispatching,
    /// Every batch was sent; workers are being released.
    Draining,
    /// Every worker acknowledged its exit.
    Done,
}

/// The answer to a `READY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Send the batch with this index.
    Start(usize),
    Exit,
}

#[derive(Debug)]
pub struct Dispatcher {
    batches: usize,
    workers: usize,
    next: usize,
    /// Issued and not yet returned, by batch index.
    outstanding: BTreeMap<usize, WorkerId>,
    received: BTreeSet<usize>,
    released: BTreeSet<WorkerId>,
    closed: BTreeSet<WorkerId>,
    state: DispatchState,
}

impl Dispatcher {
    pub fn new(batches: usize, workers: usize) -> Self {
        Self {
            batches,
            workers,
            next: 0,
            outstanding: BTreeMap::new(),
            received: BTreeSet::new(),
            released: BTreeSet::new(),
            closed: BTreeSet::new(),
            state: DispatchState::Idle,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == DispatchState::Done
    }

    pub fn starts_sent(&self) -> usize {
        self.next
    }

    pub fn exits_sent(&self) -> usize {
        self.released.len()
    }

    pub fn results_received(&self) -> usize {
        self.received.len()
    }

    /// A worker asked for work.
    pub fn on_ready(&mut self, worker: WorkerId) -> Result<Reply> {
        self.check_open(worker, "READY")?;

        if self.next < self.batches {
            let index = self.next;
            self.next += 1;
            self.outstanding.insert(index, worker);
            self.state = if self.next < self.batches {
                DispatchState::Dispatching
            } else {
                DispatchState::Draining
            };
            return Ok(Reply::Start(index));
        }

        self.state = DispatchState::Draining;
        self.released.insert(worker);
        Ok(Reply::Exit)
    }

    /// A worker returned the result of batch `index`.
    pub fn on_done(&mut self, worker: WorkerId, index: usize) -> Result<()> {
        self.check_open(worker, "DONE")?;

        match self.outstanding.get(&index) {
            Some(&owner) if owner == worker => {
                self.outstanding.remove(&index);
                self.received.insert(index);
                Ok(())
            }
            Some(&owner) => Err(DispatchError::protocol(format!(
                "{} returned batch {} issued to {}",
                worker, index, owner
            ))),
            None if self.received.contains(&index) => Err(DispatchError::protocol(format!(
                "batch {} returned twice",
                index
            ))),
            None => Err(DispatchError::protocol(format!(
                "{} returned batch {} that was never issued",
                worker, index
            ))),
        }
    }

    /// A worker acknowledged its exit.
    pub fn on_exit(&mut self, worker: WorkerId) -> Result<()> {
        if !self.released.contains(&worker) {
            return Err(DispatchError::protocol(format!(
                "{} exited before being released",
                worker
            )));
        }
        if !self.closed.insert(worker) {
            return Err(DispatchError::protocol(format!("{} exited twice", worker)));
        }

        if self.closed.len() == self.workers {
            if self.received.len() != self.batches {
                return Err(DispatchError::protocol(format!(
                    "all workers closed with {} of {} batches returned",
                    self.received.len(),
                    self.batches
                )));
            }
            self.state = DispatchState::Done;
        }
        Ok(())
    }

    fn check_open(&self, worker: WorkerId, kind: &str) -> Result<()> {
        if worker.0 == 0 || worker.0 > self.workers {
            return Err(DispatchError::protocol(format!("{} from unknown {}", kind, worker)));
        }
        if self.released.contains(&worker) {
            return Err(DispatchError::protocol(format!(
                "{} from {} after it was released",
                kind, worker
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_run() {
        let workers = [WorkerId(1), WorkerId(2), WorkerId(3)];
        let mut dispatcher = Dispatcher::new(7, 3);
        assert_eq!(dispatcher.state(), DispatchState::Idle);

        // Round-robin READY/DONE until every worker is released.
        let mut pending: Vec<Option<usize>> = vec![None; 3];
        while dispatcher.exits_sent() < 3 {
            for (slot, &worker) in workers.iter().enumerate() {
                if dispatcher.released.contains(&worker) {
                    continue;
                }
                if let Some(index) = pending[slot].take() {
                    dispatcher.on_done(worker, index).unwrap();
                }
                match dispatcher.on_ready(worker).unwrap() {
                    Reply::Start(index) => pending[slot] = Some(index),
                    Reply::Exit => {}
                }
            }
        }

        for worker in workers {
            assert!(!dispatcher.is_done());
            dispatcher.on_exit(worker).unwrap();
        }

        assert!(dispatcher.is_done());
        assert_eq!(dispatcher.starts_sent(), 7);
        assert_eq!(dispatcher.exits_sent(), 3);
        assert_eq!(dispatcher.results_received(), 7);
    }

    #[test]
    fn test_batches_issued_in_order() {
        let mut dispatcher = Dispatcher::new(3, 2);
        assert_eq!(dispatcher.on_ready(WorkerId(2)).unwrap(), Reply::Start(0));
        assert_eq!(dispatcher.state(), DispatchState::Dispatching);
        assert_eq!(dispatcher.on_ready(WorkerId(1)).unwrap(), Reply::Start(1));
        dispatcher.on_done(WorkerId(2), 0).unwrap();
        assert_eq!(dispatcher.on_ready(WorkerId(2)).unwrap(), Reply::Start(2));
        assert_eq!(dispatcher.state(), DispatchState::Draining);
        assert_eq!(dispatcher.on_ready(WorkerId(2)).unwrap(), Reply::Exit);
    }

    #[test]
    fn test_more_workers_than_batches() {
        let mut dispatcher = Dispatcher::new(1, 3);
        assert_eq!(dispatcher.on_ready(WorkerId(1)).unwrap(), Reply::Start(0));
        assert_eq!(dispatcher.on_ready(WorkerId(2)).unwrap(), Reply::Exit);
        assert_eq!(dispatcher.on_ready(WorkerId(3)).unwrap(), Reply::Exit);
        dispatcher.on_done(WorkerId(1), 0).unwrap();
        assert_eq!(dispatcher.on_ready(WorkerId(1)).unwrap(), Reply::Exit);

        for rank in 1..=3 {
            dispatcher.on_exit(WorkerId(rank)).unwrap();
        }
        assert!(dispatcher.is_done());
        assert_eq!(dispatcher.starts_sent(), 1);
    }

    #[test]
    fn test_unissued_batch_rejected() {
        let mut dispatcher = Dispatcher::new(2, 1);
        assert!(matches!(
            dispatcher.on_done(WorkerId(1), 1),
            Err(DispatchError::Protocol(_))
        ));
    }

    #[test]
    fn test_duplicate_result_rejected() {
        let mut dispatcher = Dispatcher::new(2, 1);
        dispatcher.on_ready(WorkerId(1)).unwrap();
        dispatcher.on_done(WorkerId(1), 0).unwrap();
        assert!(dispatcher.on_done(WorkerId(1), 0).is_err());
    }

    #[test]
    fn test_result_from_wrong_worker_rejected() {
        let mut dispatcher = Dispatcher::new(2, 2);
        dispatcher.on_ready(WorkerId(1)).unwrap();
        assert!(dispatcher.on_done(WorkerId(2), 0).is_err());
    }

    #[test]
    fn test_exit_before_release_rejected() {
        let mut dispatcher = Dispatcher::new(2, 2);
        assert!(dispatcher.on_exit(WorkerId(1)).is_err());
    }

    #[test]
    fn test_message_after_release_rejected() {
        let mut dispatcher = Dispatcher::new(0, 1);
        assert_eq!(dispatcher.on_ready(WorkerId(1)).unwrap(), Reply::Exit);
        assert!(dispatcher.on_ready(WorkerId(1)).is_err());
    }

    #[test]
    fn test_unknown_worker_rejected() {
        let mut dispatcher = Dispatcher::new(2, 2);
        assert!(dispatcher.on_ready(WorkerId(0)).is_err());
        assert!(dispatcher.on_ready(WorkerId(3)).is_err());
    }
}
