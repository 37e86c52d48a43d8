//! # dqm-monitor
//!
//! Jet trigger-efficiency and GEM strip-occupancy monitors.
//!
//! - [`region`]: (η, φ) predicates and the read-only [`RegionCatalogue`]
//! - [`histogram_set`] / [`aggregator`]: seven numerator/denominator slot
//!   pairs per region, and the fan-out of one measurement into every
//!   matching region
//! - [`efficiency`]: the denominator-then-numerator fill protocol
//! - [`strips`] / [`vfat`]: per-chamber strip × roll and VFAT occupancy
//! - [`driver`]: run/lumi lifecycle loop and the chunked parallel mode
//!
//! ## Example
//!
//! ```
//! use dqm_core::{EventContext, JetCandidate};
//! use dqm_hist::Booker;
//! use dqm_monitor::{Event, JetMonitor, JetMonitorConfig};
//!
//! let mut monitor: JetMonitor = JetMonitor::new(JetMonitorConfig::default()).unwrap();
//! let mut booker = Booker::new();
//! monitor.on_run_start(1, &mut booker).unwrap();
//!
//! let mut event = Event {
//!     context: EventContext { run: 1, lumi: 1, event: 1, trigger_results: None },
//!     ..Default::default()
//! };
//! event.jets.insert("ak4PFJetsCHS".into(), vec![JetCandidate { pt: 55.0, eta: 2.0, phi: -0.6 }]);
//! let outcome = monitor.analyze(&event).unwrap();
//! assert_eq!(outcome.regions.len(), 2); // HE_p and HEP17
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod config;
pub mod driver;
pub mod efficiency;
pub mod event;
pub mod geometry;
pub mod histogram_set;
pub mod jet_monitor;
pub mod region;
pub mod selection;
pub mod strips;
pub mod trigger;
pub mod vfat;

pub use aggregator::RegionalAggregator;
pub use config::{
    BinningPSet, HistoConfig, JetMonitorConfig, LsPSet, MetricBinning, RegionBinningConfig,
    StripMonitorConfig, TriggerGateConfig, read_config,
};
pub use driver::{LoopSummary, Monitor, StripMonitor, run_events, run_parallel};
pub use efficiency::{
    ControllerStats, EfficiencyRatioController, EventOutcome, FillState, JetCollection,
    RejectReason,
};
pub use event::{Event, read_events};
pub use geometry::StaticGeometry;
pub use histogram_set::{HistogramSet, MetricSlot};
pub use jet_monitor::{EfficiencyCurve, JetMonitor};
pub use region::{Region, RegionCatalogue};
pub use selection::ObjectSelection;
pub use strips::{RecHitStripAggregator, StripOutcome};
pub use trigger::PathTriggerGate;
pub use vfat::vfat_bucket;
