//! Messages exchanged between the coordinator and workers.

use bytes::Bytes;
use synth_common::{BatchSynthesis, ColumnBatch};

/// Rank of a worker participant. The coordinator is rank 0, workers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// A batch of work: the pixel coordinates and their depth profiles.
#[derive(Debug, Clone)]
pub struct Task {
    pub index: usize,
    pub xs: Vec<usize>,
    pub ys: Vec<usize>,
    /// `(depth, pixel)` profiles, pixel order matching `xs`/`ys`.
    pub columns: ColumnBatch,
    pub interpolate: bool,
}

/// A completed batch, echoing the coordinates it was issued with.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub index: usize,
    pub xs: Vec<usize>,
    pub ys: Vec<usize>,
    pub synthesis: BatchSynthesis,
}

/// Coordinator to worker.
#[derive(Debug, Clone)]
pub enum ToWorker {
    /// Serialized model configuration, sent once before dispatch.
    Configure(Bytes),
    Start(Box<Task>),
    Exit,
}

impl ToWorker {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configure(_) => "CONFIGURE",
            Self::Start(_) => "START",
            Self::Exit => "EXIT",
        }
    }
}

/// Worker to coordinator.
#[derive(Debug, Clone)]
pub enum FromWorker {
    /// The model was rebuilt from the broadcast configuration.
    Configured,
    Ready,
    Done(Box<BatchResult>),
    /// Acknowledges an `Exit`; the worker sends nothing after this.
    Exit,
}

impl FromWorker {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configured => "CONFIGURED",
            Self::Ready => "READY",
            Self::Done(_) => "DONE",
            Self::Exit => "EXIT",
        }
    }
}

/// A worker message tagged with its sender.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub source: WorkerId,
    pub message: FromWorker,
}
