//! Calorimeter region classification over (η, φ).
//!
//! Every predicate is independent: a jet can sit in several regions at once
//! (HE+ and HEP17, say), and callers test each region separately. Windows
//! are open at the lower edge and closed at the upper edge. The φ sectors
//! take their windows from the configured sector axes.

use serde::{Deserialize, Serialize};

use dqm_core::{Binning, Error, Result};

use crate::config::RegionBinningConfig;

/// Outer |η| edge of the barrel (inclusive).
pub const BARREL_MAX_ABS_ETA: f64 = 1.3;
/// Outer |η| edge of the end-caps (inclusive).
pub const ENDCAP_MAX_ABS_ETA: f64 = 3.0;

/// `|η| <= 1.3`
pub fn is_barrel(eta: f64) -> bool {
    eta.abs() <= BARREL_MAX_ABS_ETA
}

/// `1.3 < |η| <= 3.0`, either side.
pub fn is_endcap(eta: f64) -> bool {
    let a = eta.abs();
    a > BARREL_MAX_ABS_ETA && a <= ENDCAP_MAX_ABS_ETA
}

/// End-cap, positive η.
pub fn is_endcap_plus(eta: f64) -> bool {
    is_endcap(eta) && eta > 0.0
}

/// End-cap, negative η.
pub fn is_endcap_minus(eta: f64) -> bool {
    is_endcap(eta) && eta < 0.0
}

/// `|η| > 3.0`
pub fn is_forward(eta: f64) -> bool {
    eta.abs() > ENDCAP_MAX_ABS_ETA
}

/// Side of the detector a region accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtaSide {
    /// Both signs of η.
    Both,
    /// η > 0
    Plus,
    /// η < 0
    Minus,
}

/// Where a region accepts jets: a `(low, high]` band on |η| on one or both
/// sides, optionally cut to a `(low, high]` φ window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acceptance {
    /// `(low, high]` band on |η|.
    pub abs_eta: (f64, f64),
    /// Accepted side.
    pub side: EtaSide,
    /// `(low, high]` φ window, `None` for the full azimuth.
    pub phi: Option<(f64, f64)>,
}

impl Acceptance {
    const fn band(low: f64, high: f64, side: EtaSide) -> Self {
        Self { abs_eta: (low, high), side, phi: None }
    }

    /// Acceptance of a φ sector on one end-cap, taken from the range of the
    /// sector's booked η and φ axes.
    fn sector(region: Region, side: EtaSide, eta: &Binning, phi: &Binning) -> Result<Self> {
        let (lo, hi) = (eta.low(), eta.high());
        let on_side = match side {
            EtaSide::Plus => lo >= 0.0,
            EtaSide::Minus => hi <= 0.0,
            EtaSide::Both => true,
        };
        if !on_side {
            return Err(Error::Config(format!(
                "{} η axis [{lo}, {hi}] extends past η = 0",
                region.suffix()
            )));
        }
        let abs_eta = (lo.abs().min(hi.abs()), lo.abs().max(hi.abs()));
        Ok(Self { abs_eta, side, phi: Some((phi.low(), phi.high())) })
    }

    /// Whether (η, φ) is accepted.
    pub fn contains(&self, eta: f64, phi: f64) -> bool {
        let a = eta.abs();
        let side = match self.side {
            EtaSide::Both => true,
            EtaSide::Plus => eta > 0.0,
            EtaSide::Minus => eta < 0.0,
        };
        side && a > self.abs_eta.0
            && a <= self.abs_eta.1
            && self.phi.is_none_or(|(low, high)| phi > low && phi <= high)
    }
}

/// Named detector region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    /// HB
    Barrel,
    /// HE, both sides
    EndCap,
    /// HE+
    EndCapPlus,
    /// HE-
    EndCapMinus,
    /// HF
    Forward,
    /// HEP17
    Hep17,
    /// HEM17
    Hem17,
    /// HEP18
    Hep18,
}

impl Region {
    /// Histogram name suffix (`HB`, `HE_p`, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            Region::Barrel => "HB",
            Region::EndCap => "HE",
            Region::EndCapPlus => "HE_p",
            Region::EndCapMinus => "HE_m",
            Region::Forward => "HF",
            Region::Hep17 => "HEP17",
            Region::Hem17 => "HEM17",
            Region::Hep18 => "HEP18",
        }
    }

    /// Histogram title tag (`(HB)`, `(HE+)`, ...).
    pub fn title(self) -> &'static str {
        match self {
            Region::Barrel => "(HB)",
            Region::EndCap => "(HE)",
            Region::EndCapPlus => "(HE+)",
            Region::EndCapMinus => "(HE-)",
            Region::Forward => "(HF)",
            Region::Hep17 => "(HEP17)",
            Region::Hem17 => "(HEM17)",
            Region::Hep18 => "(HEP18)",
        }
    }
}

/// A region with the η/φ binning its histograms are booked with and the
/// acceptance jets are routed by.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDefinition {
    /// Region.
    pub region: Region,
    /// η axis for the η, η×φ and η×pT slots.
    pub eta: Binning,
    /// φ axis for the φ and η×φ slots.
    pub phi: Binning,
    /// Routing window.
    pub acceptance: Acceptance,
}

impl RegionDefinition {
    /// Whether (η, φ) is routed to this region.
    pub fn contains(&self, eta: f64, phi: f64) -> bool {
        self.acceptance.contains(eta, phi)
    }
}

/// Read-only table of booked regions, built once per job.
///
/// Booking and routing both read the same entries, so a sector's φ window
/// is always the range of its booked φ axis.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCatalogue {
    global_eta: Binning,
    global_phi: Binning,
    regions: Vec<RegionDefinition>,
}

impl RegionCatalogue {
    /// Build the catalogue from configuration. The combined HE region is
    /// only included when `combined_endcap` is set.
    pub fn from_config(cfg: &RegionBinningConfig) -> Result<Self> {
        let eta = cfg.eta.to_binning();
        let phi = cfg.phi.to_binning();
        let hep17_eta = cfg.hep17_eta.to_binning();
        let hem17_eta = cfg.hem17_eta.to_binning();
        let hep17_phi = cfg.hep17_phi.to_binning();
        let hep18_phi = cfg.hep18_phi.to_binning();
        for b in [&eta, &phi, &hep17_eta, &hem17_eta, &hep17_phi, &hep18_phi] {
            b.validate()?;
        }

        let mut regions = Vec::with_capacity(8);
        let mut push = |region: Region, eta: &Binning, phi: &Binning, acceptance: Acceptance| {
            regions.push(RegionDefinition { region, eta: eta.clone(), phi: phi.clone(), acceptance });
        };
        let b = BARREL_MAX_ABS_ETA;
        let e = ENDCAP_MAX_ABS_ETA;
        push(Region::Barrel, &eta, &phi, Acceptance::band(f64::NEG_INFINITY, b, EtaSide::Both));
        if cfg.combined_endcap {
            push(Region::EndCap, &eta, &phi, Acceptance::band(b, e, EtaSide::Both));
        }
        push(Region::Forward, &eta, &phi, Acceptance::band(e, f64::INFINITY, EtaSide::Both));
        push(Region::EndCapPlus, &eta, &phi, Acceptance::band(b, e, EtaSide::Plus));
        push(Region::EndCapMinus, &eta, &phi, Acceptance::band(b, e, EtaSide::Minus));
        for (region, side, sector_eta, sector_phi) in [
            (Region::Hep17, EtaSide::Plus, &hep17_eta, &hep17_phi),
            (Region::Hem17, EtaSide::Minus, &hem17_eta, &hep17_phi),
            (Region::Hep18, EtaSide::Plus, &hep17_eta, &hep18_phi),
        ] {
            let acceptance = Acceptance::sector(region, side, sector_eta, sector_phi)?;
            push(region, sector_eta, sector_phi, acceptance);
        }
        Ok(Self { global_eta: eta, global_phi: phi, regions })
    }

    /// η binning of the global set.
    pub fn global_eta(&self) -> &Binning {
        &self.global_eta
    }

    /// φ binning of the global set.
    pub fn global_phi(&self) -> &Binning {
        &self.global_phi
    }

    /// Booked regions in booking order.
    pub fn regions(&self) -> &[RegionDefinition] {
        &self.regions
    }

    /// Definition of `region`, if booked.
    pub fn get(&self, region: Region) -> Option<&RegionDefinition> {
        self.regions.iter().find(|d| d.region == region)
    }

    /// Booked regions containing (η, φ).
    pub fn matching(&self, eta: f64, phi: f64) -> impl Iterator<Item = Region> + '_ {
        self.regions.iter().filter(move |d| d.contains(eta, phi)).map(|d| d.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinningPSet;

    fn default_catalogue() -> RegionCatalogue {
        RegionCatalogue::from_config(&RegionBinningConfig::default()).unwrap()
    }

    #[test]
    fn barrel_owns_eta_1p3() {
        for eta in [1.3, -1.3] {
            assert!(is_barrel(eta));
            assert!(!is_endcap_plus(eta));
            assert!(!is_endcap_minus(eta));
        }
    }

    #[test]
    fn endcap_owns_eta_3p0() {
        assert!(is_endcap_plus(3.0));
        assert!(!is_forward(3.0));
        assert!(is_endcap_minus(-3.0));
        assert!(!is_forward(-3.0));
        assert!(is_forward(3.0001));
    }

    #[test]
    fn phi_minus_0p52_belongs_to_hep17_only() {
        let cat = default_catalogue();
        let hep17 = cat.get(Region::Hep17).unwrap();
        let hem17 = cat.get(Region::Hem17).unwrap();
        let hep18 = cat.get(Region::Hep18).unwrap();
        assert!(hep17.contains(2.0, -0.52));
        assert!(!hep18.contains(2.0, -0.52));
        assert!(hem17.contains(-2.0, -0.52));
        assert!(!hep17.contains(2.0, -0.87));
        assert!(hep18.contains(2.0, -0.17));
        assert!(!hep18.contains(2.0, -0.1699));
    }

    #[test]
    fn sector_regions_need_the_right_endcap() {
        let cat = default_catalogue();
        assert!(!cat.get(Region::Hep17).unwrap().contains(-2.0, -0.6));
        assert!(!cat.get(Region::Hem17).unwrap().contains(2.0, -0.6));
        assert!(!cat.get(Region::Hep18).unwrap().contains(1.0, -0.3));
        assert!(!cat.get(Region::Hep18).unwrap().contains(3.2, -0.3));
    }

    #[test]
    fn fixed_bands_agree_with_the_predicates() {
        let cat = default_catalogue();
        for eta in [-4.0, -3.0, -2.0, -1.3, -0.5, 0.0, 0.5, 1.3, 1.31, 2.9, 3.0, 3.01, 5.0] {
            let hits: Vec<_> = cat.matching(eta, 1.0).collect();
            assert_eq!(hits.contains(&Region::Barrel), is_barrel(eta), "{eta}");
            assert_eq!(hits.contains(&Region::Forward), is_forward(eta), "{eta}");
            assert_eq!(hits.contains(&Region::EndCapPlus), is_endcap_plus(eta), "{eta}");
            assert_eq!(hits.contains(&Region::EndCapMinus), is_endcap_minus(eta), "{eta}");
        }
    }

    #[test]
    fn routing_follows_configured_sector_windows() {
        let cfg = RegionBinningConfig {
            hep18_phi: BinningPSet::new(7, -0.60, -0.17),
            hep17_eta: BinningPSet::new(4, 2.0, 3.0),
            ..Default::default()
        };
        let cat = RegionCatalogue::from_config(&cfg).unwrap();
        let hep18 = cat.get(Region::Hep18).unwrap();
        assert_eq!(hep18.phi, Binning::uniform(7, -0.60, -0.17));
        assert_eq!(hep18.acceptance.phi, Some((-0.60, -0.17)));

        let hits: Vec<_> = cat.matching(2.5, -0.55).collect();
        assert_eq!(hits, vec![Region::EndCapPlus, Region::Hep17, Region::Hep18]);
        // HE+ still starts at 1.3, the narrowed sectors at 2.0
        let hits: Vec<_> = cat.matching(1.8, -0.55).collect();
        assert_eq!(hits, vec![Region::EndCapPlus]);
    }

    #[test]
    fn sector_eta_axis_must_stay_on_its_side() {
        let cfg = RegionBinningConfig { hem17_eta: BinningPSet::new(6, -3.0, 1.0), ..Default::default() };
        let err = RegionCatalogue::from_config(&cfg).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("HEM17"));
    }

    #[test]
    fn zero_eta_is_barrel_only() {
        let cat = default_catalogue();
        assert_eq!(cat.matching(0.0, 0.0).collect::<Vec<_>>(), vec![Region::Barrel]);
    }

    #[test]
    fn catalogue_overrides_sector_binning() {
        let cat = default_catalogue();
        assert_eq!(cat.regions().len(), 7);
        assert!(cat.get(Region::EndCap).is_none());
        let hem = cat.get(Region::Hem17).unwrap();
        assert_eq!(hem.eta, Binning::uniform(6, -3.0, -1.3));
        assert_eq!(hem.phi, Binning::uniform(7, -0.87, -0.52));
        let hep18 = cat.get(Region::Hep18).unwrap();
        assert_eq!(hep18.phi, Binning::uniform(7, -0.52, -0.17));
        assert_eq!(cat.get(Region::Barrel).unwrap().eta, Binning::uniform(50, -5.0, 5.0));
    }

    #[test]
    fn combined_endcap_is_opt_in() {
        let cfg = RegionBinningConfig { combined_endcap: true, ..Default::default() };
        let cat = RegionCatalogue::from_config(&cfg).unwrap();
        let hits: Vec<_> = cat.matching(-2.0, 1.0).collect();
        assert_eq!(hits, vec![Region::EndCap, Region::EndCapMinus]);
    }
}
