//! Jet trigger-efficiency monitor.

use std::sync::Arc;

use serde::Serialize;

use dqm_core::{AccumulatorHandle, Error, FillPhase, HistogramBackend, ObjectSource, Result};
use dqm_hist::{EfficiencyPoint, MonitorElement, efficiency};

use crate::aggregator::RegionalAggregator;
use crate::config::JetMonitorConfig;
use crate::efficiency::{
    ControllerStats, EfficiencyRatioController, EventOutcome, JetCollection, LeadingJetSelector,
};
use crate::histogram_set::{MetricSlot, SetBinning};
use crate::region::RegionCatalogue;
use crate::selection::ObjectSelection;
use crate::trigger::PathTriggerGate;

/// Efficiency curve of one 1-D slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyCurve {
    /// Slot name without the `_numerator`/`_denominator` suffix.
    pub name: String,
    /// Per-bin efficiency.
    pub points: Vec<EfficiencyPoint>,
}

/// Books and fills the numerator/denominator histograms of one jet trigger.
pub struct JetMonitor<H = MonitorElement> {
    config: JetMonitorConfig,
    collection: Option<JetCollection>,
    selection: ObjectSelection,
    catalogue: Arc<RegionCatalogue>,
    controller: Option<EfficiencyRatioController<H>>,
}

impl<H: AccumulatorHandle> JetMonitor<H> {
    /// Validate `config` and compile its selection. Nothing is booked yet.
    pub fn new(config: JetMonitorConfig) -> Result<Self> {
        config.validate()?;
        let collection =
            JetCollection::from_flags(config.is_pf_jet_trigger, config.is_calo_jet_trigger);
        let selection = match collection {
            Some(JetCollection::CaloJets) => ObjectSelection::compile(&config.calojet_selection)?,
            _ => ObjectSelection::compile(&config.jet_selection)?,
        };
        let catalogue = Arc::new(RegionCatalogue::from_config(&config.regions)?);
        Ok(Self { config, collection, selection, catalogue, controller: None })
    }

    /// Configuration the monitor was built from.
    pub fn config(&self) -> &JetMonitorConfig {
        &self.config
    }

    /// Jet collection, `None` if neither flag is set.
    pub fn collection(&self) -> Option<JetCollection> {
        self.collection
    }

    /// Book on the first run; later runs only re-initialise the gates.
    pub fn on_run_start<B>(&mut self, run: u32, backend: &mut B) -> Result<()>
    where
        B: HistogramBackend<Handle = H>,
    {
        if self.controller.is_none() {
            self.controller = Some(self.book(backend)?);
        }
        if let Some(ctrl) = self.controller.as_mut() {
            ctrl.init_run(run);
        }
        Ok(())
    }

    fn book<B>(&self, backend: &mut B) -> Result<EfficiencyRatioController<H>>
    where
        B: HistogramBackend<Handle = H>,
    {
        if self.collection.is_none() {
            log::warn!(
                "neither is_pf_jet_trigger nor is_calo_jet_trigger is set, booking with PF naming"
            );
        }
        let naming = self.collection.unwrap_or(JetCollection::PfJets);
        let h = &self.config.histos;
        let base = SetBinning {
            pt: h.met_pset.to_binning(),
            pt_threshold: h.pt_threshold_binning(),
            ls: h.ls_pset.to_binning(),
            eta: self.catalogue.global_eta().clone(),
            phi: self.catalogue.global_phi().clone(),
        };
        backend.set_current_folder(&self.config.folder_name);
        let aggregator = RegionalAggregator::book(
            backend,
            Arc::clone(&self.catalogue),
            naming.obj_tag(),
            naming.obj_title(),
            &base,
        )?;
        let tag = match self.collection {
            Some(JetCollection::CaloJets) => self.config.calojets.clone(),
            _ => self.config.pfjets.clone(),
        };
        let selector = LeadingJetSelector {
            collection: self.collection,
            tag,
            selection: self.selection.clone(),
            min_objects: self.config.min_objects,
        };
        Ok(EfficiencyRatioController::new(
            aggregator,
            Box::new(PathTriggerGate::new("denominator", &self.config.den_trigger)),
            Box::new(PathTriggerGate::new("numerator", &self.config.num_trigger)),
            selector,
        ))
    }

    /// Process one event. Fails only if called before [`JetMonitor::on_run_start`].
    pub fn analyze<S: ObjectSource + ?Sized>(&mut self, source: &S) -> Result<EventOutcome> {
        match self.controller.as_mut() {
            Some(ctrl) => Ok(ctrl.process(source)),
            None => Err(Error::Booking("analyze called before on_run_start".into())),
        }
    }

    /// End-of-run hook.
    pub fn on_run_end(&self, run: u32) {
        if let Some(stats) = self.stats() {
            log::info!(
                "run {run}: {} events, {} denominator, {} numerator",
                stats.events,
                stats.denominator,
                stats.numerator
            );
        }
    }

    /// Booked histograms, `None` before the first run.
    pub fn aggregator(&self) -> Option<&RegionalAggregator<H>> {
        self.controller.as_ref().map(|c| c.aggregator())
    }

    /// Event counters, `None` before the first run.
    pub fn stats(&self) -> Option<&ControllerStats> {
        self.controller.as_ref().map(|c| c.stats())
    }

    /// Absorb another monitor's histograms. An unbooked side contributes nothing.
    pub fn merge(&mut self, other: Self) -> Result<()> {
        if self.config != other.config {
            return Err(Error::Merge("jet monitors were configured differently".into()));
        }
        let Some(theirs) = other.controller else {
            return Ok(());
        };
        match self.controller.as_mut() {
            Some(mine) => mine.merge_from(&theirs),
            None => {
                self.controller = Some(theirs);
                Ok(())
            }
        }
    }
}

impl JetMonitor<MonitorElement> {
    /// Efficiency curves of every 1-D slot of every set.
    pub fn efficiencies(&self) -> Result<Vec<EfficiencyCurve>> {
        let Some(agg) = self.aggregator() else {
            return Ok(Vec::new());
        };
        let mut curves = Vec::new();
        for (_, set) in agg.sets() {
            for slot in MetricSlot::ALL.into_iter().filter(|s| s.is_1d()) {
                let pair = set.pair(slot);
                let num = pair.get(FillPhase::Numerator);
                let den = pair.get(FillPhase::Denominator);
                let name = num.name.strip_suffix("_numerator").unwrap_or(&num.name).to_string();
                curves.push(EfficiencyCurve { name, points: efficiency(num, den)? });
            }
        }
        Ok(curves)
    }
}
