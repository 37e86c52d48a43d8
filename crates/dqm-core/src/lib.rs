//! # dqm-core
//!
//! Shared vocabulary for the DQM monitors: binning and measurement types,
//! the collaborator traits a monitor is wired against (event source,
//! geometry, trigger gate, histogram backend) and the common error type.
//!
//! Nothing in here knows about a concrete histogram store or host event
//! loop; see `dqm-hist` and `dqm-monitor` for those.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{AccumulatorHandle, GeometryProvider, HistogramBackend, ObjectSource, TriggerGate};
pub use types::{
    Binning, ChamberKey, EtaPartition, EventContext, FillPhase, JetCandidate, Measurement, RecHit,
};

/// Crate version, shared by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
