//! Fan-out of one measurement into the global set and every matching region.

use std::collections::BTreeMap;
use std::sync::Arc;

use dqm_core::{AccumulatorHandle, Error, FillPhase, HistogramBackend, Measurement, Result};

use crate::histogram_set::{HistogramSet, SetBinning, SetNaming};
use crate::region::{Region, RegionCatalogue};

/// Owns one [`HistogramSet`] for the global view and one per catalogue region.
#[derive(Debug, Clone)]
pub struct RegionalAggregator<H> {
    catalogue: Arc<RegionCatalogue>,
    global: HistogramSet<H>,
    regions: BTreeMap<Region, HistogramSet<H>>,
}

impl<H: AccumulatorHandle> RegionalAggregator<H> {
    /// Book the global set and one set per catalogue region.
    ///
    /// `base` supplies the pT and LS axes; η/φ come from the catalogue.
    pub fn book<B>(
        backend: &mut B,
        catalogue: Arc<RegionCatalogue>,
        obj_tag: &str,
        obj_title: &str,
        base: &SetBinning,
    ) -> Result<Self>
    where
        B: HistogramBackend<Handle = H>,
    {
        let global_bins = SetBinning {
            eta: catalogue.global_eta().clone(),
            phi: catalogue.global_phi().clone(),
            ..base.clone()
        };
        let naming = SetNaming { obj_tag, obj_title, suffix: "", title_suffix: "" };
        let global = HistogramSet::book(backend, &naming, &global_bins)?;

        let mut regions = BTreeMap::new();
        for def in catalogue.regions() {
            let bins = SetBinning { eta: def.eta.clone(), phi: def.phi.clone(), ..base.clone() };
            let naming = SetNaming {
                obj_tag,
                obj_title,
                suffix: def.region.suffix(),
                title_suffix: def.region.title(),
            };
            regions.insert(def.region, HistogramSet::book(backend, &naming, &bins)?);
        }
        log::debug!("booked {} region sets for {obj_tag}", regions.len() + 1);
        Ok(Self { catalogue, global, regions })
    }

    /// Fill the global set and every region containing (η, φ) of `m`.
    ///
    /// Returns the regions filled, global excluded.
    pub fn route(&mut self, phase: FillPhase, m: &Measurement) -> Vec<Region> {
        self.global.fill(phase, m);
        let mut routed = Vec::new();
        for region in self.catalogue.matching(m.eta, m.phi) {
            if let Some(set) = self.regions.get_mut(&region) {
                set.fill(phase, m);
                routed.push(region);
            }
        }
        routed
    }

    /// Global set.
    pub fn global(&self) -> &HistogramSet<H> {
        &self.global
    }

    /// Set booked for `region`.
    pub fn region(&self, region: Region) -> Option<&HistogramSet<H>> {
        self.regions.get(&region)
    }

    /// Region catalogue the aggregator was booked with.
    pub fn catalogue(&self) -> &RegionCatalogue {
        &self.catalogue
    }

    /// Global set followed by the region sets (`None` marks the global set).
    pub fn sets(&self) -> impl Iterator<Item = (Option<Region>, &HistogramSet<H>)> {
        std::iter::once((None, &self.global)).chain(self.regions.iter().map(|(r, s)| (Some(*r), s)))
    }

    /// Every accumulator owned by the aggregator.
    pub fn handles(&self) -> impl Iterator<Item = &H> {
        self.sets().flat_map(|(_, s)| s.handles())
    }

    /// Check that `other` was booked like `self` without changing anything.
    pub fn check_mergeable(&self, other: &Self) -> Result<()> {
        if self.regions.len() != other.regions.len()
            || self.regions.keys().zip(other.regions.keys()).any(|(a, b)| a != b)
        {
            return Err(Error::Merge("aggregators were booked with different regions".into()));
        }
        self.global.check_mergeable(&other.global)?;
        for (mine, theirs) in self.regions.values().zip(other.regions.values()) {
            mine.check_mergeable(theirs)?;
        }
        Ok(())
    }

    /// Add another aggregator's contents. Both must have been booked alike;
    /// otherwise nothing is added.
    pub fn merge_from(&mut self, other: &Self) -> Result<()> {
        self.check_mergeable(other)?;
        self.global.merge_from(&other.global)?;
        for (region, set) in self.regions.iter_mut() {
            if let Some(theirs) = other.regions.get(region) {
                set.merge_from(theirs)?;
            }
        }
        Ok(())
    }
}
