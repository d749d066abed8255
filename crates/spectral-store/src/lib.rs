//! Chunked output store for spectral synthesis runs.
//!
//! Results are streamed into Zarr V3 arrays one pixel at a time, so a run
//! never holds the full output in memory:
//!
//! ```text
//! spectra.zarr/
//!   I, Q, U, V    (ny, nx, n_lambda)      chunked (c, c, n_lambda)
//!   lambda        (n_lambda,)             written once at close
//!   zarr.json     attributes: lambda_zeropoint, channels, region
//!
//! model.zarr/
//!   model         (ny, nx, n_channels, n_depth)
//! ```
//!
//! Every store keeps a [`WriteLedger`] over the requested region. Writing a
//! pixel twice, or closing a store with pixels still missing, is an error.

pub mod config;
pub mod error;
pub mod ledger;
pub mod model_store;
pub mod reader;
pub mod spectra;

mod codec;

pub use config::{StoreCompression, StoreConfig};
pub use error::{Result, StoreError};
pub use ledger::WriteLedger;
pub use model_store::ModelStore;
pub use reader::SpectraReader;
pub use spectra::{SpectraStore, StoreSummary};
