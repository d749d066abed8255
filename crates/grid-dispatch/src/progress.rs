//! Run progress telemetry.
//!
//! The dispatch loop reports what it does through a [`ProgressSink`]. The
//! binary uses [`TracingSink`]; tests record events with [`MemorySink`].

use std::sync::Mutex;
use std::time::Duration;

use metrics::{counter, histogram};
use tracing::{debug, info};

use crate::protocol::WorkerId;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    ConfigDistributed { workers: usize },
    DispatchStarted { workers: usize, batches: usize, pixels: usize },
    BatchSent { index: usize, worker: WorkerId, pixels: usize },
    BatchReceived { index: usize, worker: WorkerId, pixels: usize },
    /// The coordinator told a worker to exit.
    WorkerReleased { worker: WorkerId },
    /// A worker acknowledged its exit.
    WorkerClosed { worker: WorkerId },
    SerialStarted { pixels: usize },
    RowCompleted { y: usize, pixels: usize },
    Finished { pixels: usize, elapsed: Duration },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Logs events and updates the run counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ConfigDistributed { workers } => {
                info!(workers = workers, "Workers configured");
            }
            ProgressEvent::DispatchStarted {
                workers,
                batches,
                pixels,
            } => {
                info!(
                    workers = workers,
                    batches = batches,
                    pixels = pixels,
                    "Dispatch started"
                );
            }
            ProgressEvent::BatchSent {
                index,
                worker,
                pixels,
            } => {
                counter!("synth_batches_sent_total").increment(1);
                debug!(batch = index, worker = %worker, pixels = pixels, "Batch sent");
            }
            ProgressEvent::BatchReceived {
                index,
                worker,
                pixels,
            } => {
                counter!("synth_batches_received_total").increment(1);
                counter!("synth_pixels_written_total").increment(pixels as u64);
                info!(batch = index, worker = %worker, pixels = pixels, "Batch received");
            }
            ProgressEvent::WorkerReleased { worker } => {
                debug!(worker = %worker, "Worker released");
            }
            ProgressEvent::WorkerClosed { worker } => {
                counter!("synth_workers_closed_total").increment(1);
                info!(worker = %worker, "Worker closed");
            }
            ProgressEvent::SerialStarted { pixels } => {
                info!(pixels = pixels, "Serial synthesis started");
            }
            ProgressEvent::RowCompleted { y, pixels } => {
                counter!("synth_pixels_written_total").increment(pixels as u64);
                debug!(row = y, pixels = pixels, "Row completed");
            }
            ProgressEvent::Finished { pixels, elapsed } => {
                histogram!("synth_run_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
                info!(
                    pixels = pixels,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Synthesis finished"
                );
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }

    pub fn batches_sent(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::BatchSent { .. }))
    }

    pub fn batches_received(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::BatchReceived { .. }))
    }

    pub fn workers_released(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::WorkerReleased { .. }))
    }
}

impl ProgressSink for MemorySink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
