//! # dqm-hist
//!
//! In-memory histogram backend for the DQM monitors.
//!
//! A [`Booker`] hands out [`MonitorElement`]s (1-D, 2-D and profile
//! accumulators) during the booking phase. After that the elements are
//! owned by whoever booked them and only ever filled or merged.
//!
//! ## Example
//!
//! ```
//! use dqm_core::{AccumulatorHandle, Binning, HistogramBackend};
//! use dqm_hist::Booker;
//!
//! let mut booker = Booker::new();
//! booker.set_current_folder("HLT/Jet");
//! let mut h = booker.book_1d("pfjetpT", "PFJet pT", &Binning::uniform(10, 0.0, 100.0)).unwrap();
//! h.fill(&[42.0]);
//! assert_eq!(h.entries(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod booker;
pub mod efficiency;
pub mod element;

pub use booker::Booker;
pub use efficiency::{EfficiencyPoint, efficiency};
pub use element::{ElementData, Hist1D, Hist2D, MonitorElement, Profile};
