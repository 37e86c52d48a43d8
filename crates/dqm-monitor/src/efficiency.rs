//! Numerator/denominator fill protocol for trigger-efficiency histograms.
//!
//! Per event: the denominator gate must pass and a leading jet must survive
//! the object selection, then every matching denominator set is filled. The
//! numerator sets are filled only if the numerator gate passes as well.

use serde::Serialize;

use dqm_core::{
    AccumulatorHandle, Error, FillPhase, JetCandidate, Measurement, ObjectSource, Result,
    TriggerGate,
};

use crate::aggregator::RegionalAggregator;
use crate::region::Region;
use crate::selection::ObjectSelection;

/// Jet collection a monitor runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JetCollection {
    /// Particle-flow jets.
    PfJets,
    /// Calorimeter jets.
    CaloJets,
}

impl JetCollection {
    /// Resolve the two configuration flags; PF wins if both are set.
    pub fn from_flags(is_pf: bool, is_calo: bool) -> Option<Self> {
        if is_pf {
            Some(JetCollection::PfJets)
        } else if is_calo {
            Some(JetCollection::CaloJets)
        } else {
            None
        }
    }

    /// Tag used in histogram names.
    pub fn obj_tag(self) -> &'static str {
        match self {
            JetCollection::PfJets => "pfjet",
            JetCollection::CaloJets => "calojet",
        }
    }

    /// Name used in histogram titles.
    pub fn obj_title(self) -> &'static str {
        match self {
            JetCollection::PfJets => "PFJet",
            JetCollection::CaloJets => "CaloJet",
        }
    }
}

/// Why an event left no trace in any histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// The denominator gate rejected the event.
    DenominatorGate,
    /// The jet collection was missing or invalid.
    DataSourceInvalid,
    /// Neither PF nor calo jets are configured.
    UnknownCollectionMode,
    /// The collection had fewer than `min_objects` jets.
    TooFewObjects,
    /// No jet passed the object selection.
    EmptySelection,
}

/// Protocol state of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FillState {
    /// Waiting for the denominator gate and the leading jet.
    DenominatorPending,
    /// Denominators filled, numerator gate not yet evaluated.
    NumeratorPending,
    /// Finished; `numerator` tells whether the numerator gate passed.
    Done {
        /// Numerator sets were filled.
        numerator: bool,
    },
    /// Nothing was filled.
    Rejected(RejectReason),
}

/// Final state of an event plus the regions its measurement was routed to.
#[derive(Debug, Clone, PartialEq)]
pub struct EventOutcome {
    /// Terminal state (`Done` or `Rejected`).
    pub state: FillState,
    /// Regions filled (global excluded); empty when rejected.
    pub regions: Vec<Region>,
}

impl EventOutcome {
    fn rejected(reason: RejectReason) -> Self {
        Self { state: FillState::Rejected(reason), regions: Vec::new() }
    }
}

/// Event counters, merged along with the histograms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    /// Events seen.
    pub events: u64,
    /// Events that filled the denominators.
    pub denominator: u64,
    /// Events that also filled the numerators.
    pub numerator: u64,
    /// Rejected by the denominator gate.
    pub rejected_gate: u64,
    /// Skipped because the jet collection was invalid.
    pub rejected_invalid: u64,
    /// Skipped because no collection is configured.
    pub rejected_mode: u64,
    /// Skipped because the collection was too small.
    pub rejected_too_few: u64,
    /// Skipped because no jet passed the selection.
    pub rejected_empty: u64,
}

impl ControllerStats {
    fn record(&mut self, state: FillState) {
        self.events += 1;
        match state {
            FillState::Done { numerator } => {
                self.denominator += 1;
                self.numerator += u64::from(numerator);
            }
            FillState::Rejected(RejectReason::DenominatorGate) => self.rejected_gate += 1,
            FillState::Rejected(RejectReason::DataSourceInvalid) => self.rejected_invalid += 1,
            FillState::Rejected(RejectReason::UnknownCollectionMode) => self.rejected_mode += 1,
            FillState::Rejected(RejectReason::TooFewObjects) => self.rejected_too_few += 1,
            FillState::Rejected(RejectReason::EmptySelection) => self.rejected_empty += 1,
            FillState::DenominatorPending | FillState::NumeratorPending => {}
        }
    }

    fn add(&mut self, other: &ControllerStats) {
        self.events += other.events;
        self.denominator += other.denominator;
        self.numerator += other.numerator;
        self.rejected_gate += other.rejected_gate;
        self.rejected_invalid += other.rejected_invalid;
        self.rejected_mode += other.rejected_mode;
        self.rejected_too_few += other.rejected_too_few;
        self.rejected_empty += other.rejected_empty;
    }
}

/// Picks the leading selected jet of the configured collection.
#[derive(Debug, Clone)]
pub struct LeadingJetSelector {
    /// Collection, or `None` when neither flag is set.
    pub collection: Option<JetCollection>,
    /// Input tag of the collection.
    pub tag: String,
    /// Per-jet selection.
    pub selection: ObjectSelection,
    /// Minimum collection size before selection.
    pub min_objects: usize,
}

impl LeadingJetSelector {
    /// First jet of the collection passing the selection.
    pub fn select<S: ObjectSource + ?Sized>(
        &self,
        source: &S,
    ) -> std::result::Result<JetCandidate, RejectReason> {
        let ctx = source.context();
        if self.collection.is_none() {
            log::error!(
                "run {} event {}: neither PF nor calo jets configured, check the jet trigger type",
                ctx.run,
                ctx.event
            );
            return Err(RejectReason::UnknownCollectionMode);
        }
        let jets = match source.jets(&self.tag) {
            Ok(jets) => jets,
            Err(e) => {
                log::warn!("run {} event {}: {e}", ctx.run, ctx.event);
                return Err(RejectReason::DataSourceInvalid);
            }
        };
        if jets.len() < self.min_objects {
            return Err(RejectReason::TooFewObjects);
        }
        jets.iter().find(|j| self.selection.accepts(j)).copied().ok_or(RejectReason::EmptySelection)
    }
}

/// Drives the denominator/numerator protocol over a [`RegionalAggregator`].
pub struct EfficiencyRatioController<H> {
    aggregator: RegionalAggregator<H>,
    den_gate: Box<dyn TriggerGate>,
    num_gate: Box<dyn TriggerGate>,
    selector: LeadingJetSelector,
    stats: ControllerStats,
}

impl<H: AccumulatorHandle> EfficiencyRatioController<H> {
    /// Wrap a booked aggregator.
    pub fn new(
        aggregator: RegionalAggregator<H>,
        den_gate: Box<dyn TriggerGate>,
        num_gate: Box<dyn TriggerGate>,
        selector: LeadingJetSelector,
    ) -> Self {
        Self { aggregator, den_gate, num_gate, selector, stats: ControllerStats::default() }
    }

    /// Run-start hook for the gates.
    pub fn init_run(&mut self, run: u32) {
        if self.den_gate.is_on() {
            self.den_gate.init_run(run);
        }
        if self.num_gate.is_on() {
            self.num_gate.init_run(run);
        }
    }

    /// Process one event.
    pub fn process<S: ObjectSource + ?Sized>(&mut self, source: &S) -> EventOutcome {
        let outcome = self.step_through(source);
        self.stats.record(outcome.state);
        outcome
    }

    fn step_through<S: ObjectSource + ?Sized>(&mut self, source: &S) -> EventOutcome {
        let ctx = source.context();
        let mut state = FillState::DenominatorPending;
        log::trace!("run {} event {}: {state:?}", ctx.run, ctx.event);

        if !self.den_gate.passes(ctx) {
            return EventOutcome::rejected(RejectReason::DenominatorGate);
        }
        let jet = match self.selector.select(source) {
            Ok(jet) => jet,
            Err(reason) => return EventOutcome::rejected(reason),
        };
        let m = Measurement::from_candidate(&jet, ctx.lumi);

        let regions = self.aggregator.route(FillPhase::Denominator, &m);
        state = FillState::NumeratorPending;
        log::trace!("run {} event {}: {state:?}, regions {regions:?}", ctx.run, ctx.event);

        let numerator = self.num_gate.passes(ctx);
        if numerator {
            let again = self.aggregator.route(FillPhase::Numerator, &m);
            debug_assert_eq!(again, regions);
        }
        EventOutcome { state: FillState::Done { numerator }, regions }
    }

    /// The aggregator and its histograms.
    pub fn aggregator(&self) -> &RegionalAggregator<H> {
        &self.aggregator
    }

    /// Object selector in use.
    pub fn selector(&self) -> &LeadingJetSelector {
        &self.selector
    }

    /// Counters so far.
    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Add another controller's histograms and counters.
    pub fn merge_from(&mut self, other: &Self) -> Result<()> {
        if self.selector.collection != other.selector.collection {
            return Err(Error::Merge("controllers monitor different jet collections".into()));
        }
        self.aggregator.merge_from(&other.aggregator)?;
        self.stats.add(&other.stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use dqm_core::{Binning, EventContext, HistogramBackend, RecHit};
    use dqm_hist::{Booker, MonitorElement};

    use crate::config::RegionBinningConfig;
    use crate::histogram_set::SetBinning;
    use crate::region::RegionCatalogue;

    struct Fixed(Option<bool>);

    impl TriggerGate for Fixed {
        fn is_on(&self) -> bool {
            self.0.is_some()
        }

        fn accept(&self, _ctx: &EventContext) -> bool {
            self.0.unwrap_or(true)
        }
    }

    struct Jets {
        ctx: EventContext,
        jets: Option<Vec<JetCandidate>>,
    }

    impl ObjectSource for Jets {
        fn context(&self) -> &EventContext {
            &self.ctx
        }

        fn jets(&self, tag: &str) -> Result<&[JetCandidate]> {
            self.jets.as_deref().ok_or_else(|| Error::DataSourceInvalid(tag.to_string()))
        }

        fn rec_hits(&self, tag: &str) -> Result<&[RecHit]> {
            Err(Error::DataSourceInvalid(tag.to_string()))
        }
    }

    fn controller(
        den: Option<bool>,
        num: Option<bool>,
        collection: Option<JetCollection>,
    ) -> EfficiencyRatioController<MonitorElement> {
        let mut booker = Booker::new();
        booker.set_current_folder("HLT/Jet");
        let cat = Arc::new(RegionCatalogue::from_config(&RegionBinningConfig::default()).unwrap());
        let base = SetBinning {
            pt: Binning::uniform(200, 0.0, 1000.0),
            pt_threshold: Binning::uniform(100, 0.0, 1000.0),
            ls: Binning::uniform(2500, 0.0, 2500.0),
            eta: Binning::uniform(50, -5.0, 5.0),
            phi: Binning::uniform(64, -3.2, 3.2),
        };
        let agg = RegionalAggregator::book(&mut booker, cat, "pfjet", "PFJet", &base).unwrap();
        let selector = LeadingJetSelector {
            collection,
            tag: "ak4PFJetsCHS".into(),
            selection: ObjectSelection::compile("pt > 20").unwrap(),
            min_objects: 0,
        };
        EfficiencyRatioController::new(agg, Box::new(Fixed(den)), Box::new(Fixed(num)), selector)
    }

    fn event(jets: Option<Vec<JetCandidate>>) -> Jets {
        Jets { ctx: EventContext { run: 1, lumi: 5, event: 9, trigger_results: None }, jets }
    }

    fn total(ctrl: &EfficiencyRatioController<MonitorElement>) -> u64 {
        ctrl.aggregator().handles().map(|h| h.entries()).sum()
    }

    #[test]
    fn leading_selected_jet_is_used() {
        let mut ctrl = controller(None, None, Some(JetCollection::PfJets));
        let ev = event(Some(vec![
            JetCandidate { pt: 10.0, eta: 0.0, phi: 0.0 },
            JetCandidate { pt: 80.0, eta: -3.5, phi: 0.0 },
            JetCandidate { pt: 60.0, eta: 0.5, phi: 0.0 },
        ]));
        let out = ctrl.process(&ev);
        assert_eq!(out.state, FillState::Done { numerator: true });
        assert_eq!(out.regions, vec![Region::Forward]);
    }

    #[test]
    fn denominator_gate_rejects_without_fills() {
        let mut ctrl = controller(Some(false), None, Some(JetCollection::PfJets));
        let out = ctrl.process(&event(Some(vec![JetCandidate { pt: 50.0, eta: 0.0, phi: 0.0 }])));
        assert_eq!(out, EventOutcome::rejected(RejectReason::DenominatorGate));
        assert_eq!(total(&ctrl), 0);
        assert_eq!(ctrl.stats().rejected_gate, 1);
    }

    #[test]
    fn invalid_source_and_unset_mode_are_rejections() {
        let mut ctrl = controller(None, None, Some(JetCollection::PfJets));
        assert_eq!(ctrl.process(&event(None)).state, FillState::Rejected(RejectReason::DataSourceInvalid));

        let mut ctrl = controller(None, None, None);
        let out = ctrl.process(&event(Some(vec![JetCandidate { pt: 50.0, eta: 0.0, phi: 0.0 }])));
        assert_eq!(out.state, FillState::Rejected(RejectReason::UnknownCollectionMode));
        assert_eq!(total(&ctrl), 0);
    }

    #[test]
    fn min_objects_checked_before_selection() {
        let mut ctrl = controller(None, None, Some(JetCollection::PfJets));
        ctrl.selector.min_objects = 2;
        let out = ctrl.process(&event(Some(vec![JetCandidate { pt: 50.0, eta: 0.0, phi: 0.0 }])));
        assert_eq!(out.state, FillState::Rejected(RejectReason::TooFewObjects));
    }

    #[test]
    fn from_flags_prefers_pf() {
        assert_eq!(JetCollection::from_flags(true, true), Some(JetCollection::PfJets));
        assert_eq!(JetCollection::from_flags(false, true), Some(JetCollection::CaloJets));
        assert_eq!(JetCollection::from_flags(false, false), None);
    }
}
