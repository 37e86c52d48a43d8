//! Monitor configuration (YAML or JSON).
//!
//! Every field has a default, so an empty document yields the standard
//! `HLT/Jet` PF-jet monitor and the standard `GEM/recHit` strip monitor.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use dqm_core::{Binning, Error, Result};

use crate::selection::ObjectSelection;

/// Read a config file. `.json` is parsed as JSON, anything else as YAML.
pub fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    if ext == "json" {
        Ok(serde_json::from_slice(&bytes)?)
    } else {
        parse_yaml(&bytes).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

/// Parse a YAML (or JSON, which YAML accepts) document.
pub fn parse_yaml<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_yaml_ng::from_slice(bytes).map_err(|e| Error::Config(e.to_string()))
}

/// Uniform binning block (`nbins`, `xmin`, `xmax`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinningPSet {
    /// Number of bins.
    pub nbins: usize,
    /// Lower edge.
    pub xmin: f64,
    /// Upper edge.
    pub xmax: f64,
}

impl BinningPSet {
    /// Shorthand constructor.
    pub const fn new(nbins: usize, xmin: f64, xmax: f64) -> Self {
        Self { nbins, xmin, xmax }
    }

    /// As an axis binning.
    pub fn to_binning(&self) -> Binning {
        Binning::uniform(self.nbins, self.xmin, self.xmax)
    }
}

/// Binning of one metric: a uniform block or explicit variable-width edges.
///
/// In YAML a map (`{ nbins: 50, xmin: 0, xmax: 500 }`) is uniform and a
/// list (`[0, 20, 50, 100, 1000]`) gives the edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricBinning {
    /// `nbins` equal bins over `[xmin, xmax)`.
    Uniform(BinningPSet),
    /// Sorted bin edges.
    Edges(Vec<f64>),
}

impl MetricBinning {
    /// As an axis binning.
    pub fn to_binning(&self) -> Binning {
        match self {
            MetricBinning::Uniform(p) => p.to_binning(),
            MetricBinning::Edges(edges) => Binning::variable(edges.clone()),
        }
    }
}

impl From<BinningPSet> for MetricBinning {
    fn from(p: BinningPSet) -> Self {
        MetricBinning::Uniform(p)
    }
}

/// Luminosity-section axis: `nbins` bins covering `[0, nbins]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LsPSet {
    /// Number of luminosity sections on the axis.
    #[serde(default = "default_ls_nbins")]
    pub nbins: usize,
}

impl Default for LsPSet {
    fn default() -> Self {
        Self { nbins: default_ls_nbins() }
    }
}

impl LsPSet {
    /// As an axis binning.
    pub fn to_binning(&self) -> Binning {
        Binning::uniform(self.nbins, 0.0, self.nbins as f64)
    }
}

fn default_ls_nbins() -> usize {
    2500
}

/// Slot binnings shared by every region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoConfig {
    /// pT axis (also the η×pT y axis and the pT-vs-LS y range).
    pub met_pset: MetricBinning,
    /// pT axis of the threshold slot when `jetpt_binning` is empty.
    pub jet_pt_thr_pset: MetricBinning,
    /// Variable-width pT edges of the threshold slot.
    pub jetpt_binning: Vec<f64>,
    /// Luminosity-section axis.
    pub ls_pset: LsPSet,
}

impl HistoConfig {
    /// Axis of the threshold slot: the `jetpt_binning` edges, or
    /// `jet_pt_thr_pset` when no edges are given.
    pub fn pt_threshold_binning(&self) -> Binning {
        if self.jetpt_binning.is_empty() {
            self.jet_pt_thr_pset.to_binning()
        } else {
            Binning::variable(self.jetpt_binning.clone())
        }
    }
}

impl Default for HistoConfig {
    fn default() -> Self {
        Self {
            met_pset: BinningPSet::new(200, 0.0, 1000.0).into(),
            jet_pt_thr_pset: BinningPSet::new(100, 0.0, 1000.0).into(),
            jetpt_binning: vec![
                0., 20., 40., 60., 80., 90., 100., 110., 120., 130., 140., 150., 160., 170., 180.,
                190., 200., 220., 240., 260., 280., 300., 350., 400., 450., 1000.,
            ],
            ls_pset: LsPSet::default(),
        }
    }
}

/// η/φ binning of the global set and the per-sector overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionBinningConfig {
    /// Default η axis.
    pub eta: BinningPSet,
    /// Default φ axis.
    pub phi: BinningPSet,
    /// η axis of HEP17 and HEP18.
    pub hep17_eta: BinningPSet,
    /// η axis of HEM17.
    pub hem17_eta: BinningPSet,
    /// φ axis of HEP17 and HEM17.
    pub hep17_phi: BinningPSet,
    /// φ axis of HEP18.
    pub hep18_phi: BinningPSet,
    /// Also book a combined HE region covering both end-caps.
    pub combined_endcap: bool,
}

impl Default for RegionBinningConfig {
    fn default() -> Self {
        Self {
            eta: BinningPSet::new(50, -5.0, 5.0),
            phi: BinningPSet::new(64, -3.2, 3.2),
            hep17_eta: BinningPSet::new(6, 1.3, 3.0),
            hem17_eta: BinningPSet::new(6, -3.0, -1.3),
            hep17_phi: BinningPSet::new(7, -0.87, -0.52),
            hep18_phi: BinningPSet::new(7, -0.52, -0.17),
            combined_endcap: false,
        }
    }
}

/// Trigger-path gate. No paths means the gate is off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerGateConfig {
    /// Path names; a trailing `*` matches by prefix.
    pub hlt_paths: Vec<String>,
    /// `true`: any listed path suffices. `false`: all must fire.
    pub and_or: bool,
    /// Decision returned when the event carries no trigger results.
    pub error_reply_hlt: bool,
}

impl Default for TriggerGateConfig {
    fn default() -> Self {
        Self { hlt_paths: Vec::new(), and_or: true, error_reply_hlt: false }
    }
}

/// Jet trigger-efficiency monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JetMonitorConfig {
    /// Folder histograms are booked in.
    pub folder_name: String,
    /// Input tag of the PF jet collection.
    pub pfjets: String,
    /// Input tag of the calo jet collection.
    pub calojets: String,
    /// Selection applied to PF jets.
    pub jet_selection: String,
    /// Selection applied to calo jets.
    pub calojet_selection: String,
    /// Minimum size of the jet collection before selection.
    pub min_objects: usize,
    /// Monitor PF jets.
    pub is_pf_jet_trigger: bool,
    /// Monitor calo jets (used only if `is_pf_jet_trigger` is off).
    pub is_calo_jet_trigger: bool,
    /// Numerator gate.
    pub num_trigger: TriggerGateConfig,
    /// Denominator gate.
    pub den_trigger: TriggerGateConfig,
    /// Slot binnings.
    pub histos: HistoConfig,
    /// Region binnings.
    pub regions: RegionBinningConfig,
}

impl Default for JetMonitorConfig {
    fn default() -> Self {
        Self {
            folder_name: "HLT/Jet".into(),
            pfjets: "ak4PFJetsCHS".into(),
            calojets: "ak4CaloJets".into(),
            jet_selection: "pt > 20".into(),
            calojet_selection: "pt > 20".into(),
            min_objects: 0,
            is_pf_jet_trigger: true,
            is_calo_jet_trigger: false,
            num_trigger: TriggerGateConfig::default(),
            den_trigger: TriggerGateConfig::default(),
            histos: HistoConfig::default(),
            regions: RegionBinningConfig::default(),
        }
    }
}

impl JetMonitorConfig {
    /// Check binnings and selections before anything is booked.
    pub fn validate(&self) -> Result<()> {
        let h = &self.histos;
        for (what, b) in [
            ("met_pset", h.met_pset.to_binning()),
            ("jet_pt_thr_pset", h.jet_pt_thr_pset.to_binning()),
            ("ls_pset", h.ls_pset.to_binning()),
            ("jetpt_binning", h.pt_threshold_binning()),
        ] {
            b.validate().map_err(|e| Error::Config(format!("histos.{what}: {e}")))?;
        }
        ObjectSelection::compile(&self.jet_selection)?;
        ObjectSelection::compile(&self.calojet_selection)?;
        Ok(())
    }
}

/// GEM rec-hit strip occupancy monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripMonitorConfig {
    /// Folder histograms are booked in.
    pub folder_name: String,
    /// Input tag of the rec-hit collection.
    pub rec_hits: String,
    /// Strip axis.
    pub strip_binning: BinningPSet,
    /// Roll axis.
    pub roll_binning: BinningPSet,
    /// Also book per-chamber VFAT occupancy.
    pub vfat_occupancy: bool,
}

impl Default for StripMonitorConfig {
    fn default() -> Self {
        Self {
            folder_name: "GEM/recHit".into(),
            rec_hits: "gemRecHits".into(),
            strip_binning: BinningPSet::new(384, 1.0, 385.0),
            roll_binning: BinningPSet::new(8, 1.0, 9.0),
            vfat_occupancy: true,
        }
    }
}
