//! Distributed dispatch of per-pixel spectral synthesis.
//!
//! A coordinator partitions the requested pixel region into batches and
//! hands them to workers on request. Workers evaluate the physics model and
//! send the spectra back; the coordinator writes every pixel into the output
//! store at its own `(y, x)` location. Without workers the coordinator walks
//! the region in raster order and evaluates each pixel itself.
//!
//! # Protocol
//!
//! ```text
//!  Coordinator                               Worker (one per participant)
//!      │                                          │
//!      │◄────────── barrier ─────────────────────►│
//!      │── Configure(model config) ──────────────►│ rebuild model
//!      │◄───────────────────────────── Configured │
//!      │◄────────── barrier ─────────────────────►│
//!      │                                          │
//!      │◄────────────────────────────────── Ready │
//!      │── Start(task) ──────────────────────────►│ synth2d
//!      │◄──────────────────────────── Done(result)│
//!      │◄────────────────────────────────── Ready │
//!      │── Exit ─────────────────────────────────►│
//!      │◄─────────────────────────────────── Exit │
//! ```
//!
//! The coordinator stops once every worker has acknowledged its `Exit`.
//!
//! # Example
//!
//! ```ignore
//! let plan = RunPlan { run, store, outputs };
//! let report = grid_dispatch::execute(&plan, &loader, &model, &TracingSink).await?;
//! ```

pub mod broadcast;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod partition;
pub mod progress;
pub mod protocol;
pub mod runner;
pub mod serial;
pub mod transport;
pub mod worker;

pub use config::{ExecutionMode, OutputPaths, RegionConfig, RunConfig, RunPlan};
pub use context::{RunContext, RunOutputs};
pub use coordinator::{run_coordinator, DispatchReport};
pub use dispatcher::{DispatchState, Dispatcher, Reply};
pub use error::{DispatchError, Result};
pub use partition::{batch_count, partition, Batch};
pub use progress::{MemorySink, NullSink, ProgressEvent, ProgressSink, TracingSink};
pub use protocol::{BatchResult, Envelope, FromWorker, Task, ToWorker, WorkerId};
pub use runner::{execute, run_distributed, RunReport};
pub use serial::run_serial;
pub use transport::{CoordinatorLink, LocalCluster, LocalCoordinator, LocalWorker, WorkerLink};
pub use worker::{run_worker, WorkerReport};
