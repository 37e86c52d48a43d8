//! Common data types for the DQM monitors

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Axis binning of an accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binning {
    /// `nbins` equal-width bins covering `[min, max)`.
    Uniform {
        /// Number of bins (excluding under/overflow).
        nbins: usize,
        /// Lower edge of the first bin.
        min: f64,
        /// Upper edge of the last bin.
        max: f64,
    },
    /// Variable-width bins given by their sorted edges (length = n_bins + 1).
    Variable {
        /// Bin edges.
        edges: Vec<f64>,
    },
}

/// Where a coordinate lands on an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinIndex {
    /// Below the lower edge.
    Underflow,
    /// In-range bin (0-based).
    Bin(usize),
    /// At or above the upper edge, or NaN.
    Overflow,
}

impl Binning {
    /// Equal-width binning.
    pub fn uniform(nbins: usize, min: f64, max: f64) -> Self {
        Binning::Uniform { nbins, min, max }
    }

    /// Variable-width binning from edges.
    pub fn variable(edges: Vec<f64>) -> Self {
        Binning::Variable { edges }
    }

    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        match self {
            Binning::Uniform { nbins, .. } => *nbins,
            Binning::Variable { edges } => edges.len().saturating_sub(1),
        }
    }

    /// Lower edge of the axis.
    pub fn low(&self) -> f64 {
        match self {
            Binning::Uniform { min, .. } => *min,
            Binning::Variable { edges } => edges.first().copied().unwrap_or(f64::NAN),
        }
    }

    /// Upper edge of the axis.
    pub fn high(&self) -> f64 {
        match self {
            Binning::Uniform { max, .. } => *max,
            Binning::Variable { edges } => edges.last().copied().unwrap_or(f64::NAN),
        }
    }

    /// All bin edges (length = n_bins + 1).
    pub fn edges(&self) -> Vec<f64> {
        match self {
            Binning::Uniform { nbins, min, max } => {
                let width = (max - min) / *nbins as f64;
                (0..=*nbins).map(|i| if i == *nbins { *max } else { min + width * i as f64 }).collect()
            }
            Binning::Variable { edges } => edges.clone(),
        }
    }

    /// Check that the binning can be booked.
    pub fn validate(&self) -> Result<()> {
        match self {
            Binning::Uniform { nbins, min, max } => {
                if *nbins == 0 {
                    return Err(Error::Booking("uniform binning needs nbins > 0".into()));
                }
                if !(min.is_finite() && max.is_finite()) || min >= max {
                    return Err(Error::Booking(format!(
                        "uniform binning needs finite min < max (min={min}, max={max})"
                    )));
                }
            }
            Binning::Variable { edges } => {
                if edges.len() < 2 {
                    return Err(Error::Booking(format!(
                        "variable binning needs at least 2 edges, got {}",
                        edges.len()
                    )));
                }
                if edges.iter().any(|e| !e.is_finite()) {
                    return Err(Error::Booking("variable binning has non-finite edge".into()));
                }
                if edges.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(Error::Booking("variable binning edges must increase strictly".into()));
                }
            }
        }
        Ok(())
    }

    /// Locate `x` on the axis. Lower edges are inclusive, the upper edge exclusive.
    pub fn find_bin(&self, x: f64) -> BinIndex {
        if x.is_nan() {
            return BinIndex::Overflow;
        }
        if x < self.low() {
            return BinIndex::Underflow;
        }
        if x >= self.high() {
            return BinIndex::Overflow;
        }
        match self {
            Binning::Uniform { nbins, min, max } => {
                let idx = ((x - min) / (max - min) * *nbins as f64) as usize;
                // Rounding right below `max` can land one past the end.
                BinIndex::Bin(idx.min(nbins - 1))
            }
            Binning::Variable { edges } => {
                // First edge strictly greater than x, minus one.
                let upper = edges.partition_point(|e| *e <= x);
                upper.checked_sub(1).map_or(BinIndex::Overflow, BinIndex::Bin)
            }
        }
    }
}

/// Kinematic measurement extracted from the leading selected object of an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Transverse momentum.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuth.
    pub phi: f64,
    /// Luminosity section the event belongs to.
    pub lumi_section: u32,
}

impl Measurement {
    /// Build a measurement from a candidate and the event's luminosity section.
    pub fn from_candidate(jet: &JetCandidate, lumi_section: u32) -> Self {
        Self { pt: jet.pt, eta: jet.eta, phi: jet.phi, lumi_section }
    }
}

/// A reconstructed jet as seen by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JetCandidate {
    /// Transverse momentum.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuth.
    pub phi: f64,
}

/// A GEM rec-hit cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecHit {
    /// Eta-partition the cluster was reconstructed in.
    pub partition_id: u32,
    /// First fired strip of the cluster.
    pub first_strip: i32,
    /// Number of contiguous strips in the cluster.
    pub cluster_size: u32,
}

impl RecHit {
    /// Strip indices covered by the cluster. Computed in `i64`, so no
    /// (first strip, size) pair can wrap.
    pub fn strips(&self) -> std::ops::Range<i64> {
        let first = i64::from(self.first_strip);
        first..first + i64::from(self.cluster_size)
    }
}

/// One GEM eta-partition (roll) of a chamber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtaPartition {
    /// Geometric id referenced by [`RecHit::partition_id`].
    pub id: u32,
    /// Chamber number.
    pub chamber: i32,
    /// Layer within the super-chamber.
    pub layer: i32,
    /// Roll number within the chamber (1-based).
    pub roll: i32,
    /// Number of readout strips in the partition.
    pub n_strips: u32,
}

impl EtaPartition {
    /// The chamber/layer this partition belongs to.
    pub fn chamber_key(&self) -> ChamberKey {
        ChamberKey { chamber: self.chamber, layer: self.layer }
    }
}

/// (chamber, layer) key of the per-chamber occupancy accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChamberKey {
    /// Chamber number.
    pub chamber: i32,
    /// Layer number.
    pub layer: i32,
}

/// Run/event bookkeeping handed to trigger gates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Run number.
    pub run: u32,
    /// Luminosity section.
    pub lumi: u32,
    /// Event number.
    pub event: u64,
    /// Names of the trigger paths that fired. `None` when trigger results are missing.
    #[serde(default)]
    pub trigger_results: Option<BTreeSet<String>>,
}

/// Which member of a numerator/denominator pair a fill goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPhase {
    /// Events passing the reference and the studied selection.
    Numerator,
    /// Events passing the reference selection.
    Denominator,
}

impl FillPhase {
    /// Both phases, denominator first.
    pub const ALL: [FillPhase; 2] = [FillPhase::Denominator, FillPhase::Numerator];

    /// Name suffix used when booking (`_numerator` / `_denominator`).
    pub fn as_str(self) -> &'static str {
        match self {
            FillPhase::Numerator => "numerator",
            FillPhase::Denominator => "denominator",
        }
    }
}
