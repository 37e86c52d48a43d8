//! Collaborator traits
//!
//! A monitor only talks to the outside world through these seams: where
//! events come from, where the detector geometry comes from, how trigger
//! decisions are made and where histograms are stored. Concrete adapters
//! live in `dqm-hist` (storage) and `dqm-monitor` (events, geometry, gates).

use crate::types::{Binning, EtaPartition, EventContext, JetCandidate, RecHit};
use crate::Result;

/// A booked accumulator owned by the component that booked it.
pub trait AccumulatorHandle: Send {
    /// Name the accumulator was booked under.
    fn name(&self) -> &str;

    /// Fill one entry with unit weight.
    ///
    /// `coords` is `[x]` for 1-D histograms and `[x, y]` for 2-D histograms
    /// and profiles. Passing the wrong number of coordinates is a
    /// programming error and panics.
    fn fill(&mut self, coords: &[f64]);

    /// Set the x and y axis titles.
    fn set_axis_titles(&mut self, x: &str, y: &str);

    /// Check that `other` can be merged into `self` without touching either.
    fn check_mergeable(&self, other: &Self) -> Result<()>
    where
        Self: Sized;

    /// Add the contents of `other` bin by bin.
    ///
    /// Fails, leaving `self` unchanged, if the two accumulators were not
    /// booked identically.
    fn merge_from(&mut self, other: &Self) -> Result<()>
    where
        Self: Sized;
}

/// Histogram storage: books accumulators before any event is processed.
pub trait HistogramBackend {
    /// Accumulator type handed out by this backend.
    type Handle: AccumulatorHandle;

    /// Folder subsequent bookings are placed in.
    fn set_current_folder(&mut self, folder: &str);

    /// Book a 1-D histogram.
    fn book_1d(&mut self, name: &str, title: &str, x: &Binning) -> Result<Self::Handle>;

    /// Book a 2-D histogram.
    fn book_2d(&mut self, name: &str, title: &str, x: &Binning, y: &Binning)
    -> Result<Self::Handle>;

    /// Book a profile of y versus x; fills with y outside `y_range` are ignored.
    fn book_profile(
        &mut self,
        name: &str,
        title: &str,
        x: &Binning,
        y_range: (f64, f64),
    ) -> Result<Self::Handle>;
}

/// Boolean accept/reject decision for an event (HLT path bits and friends).
pub trait TriggerGate: Send + Sync {
    /// Whether the gate is configured at all. A gate that is off accepts everything.
    fn is_on(&self) -> bool;

    /// Called once at the start of each run.
    fn init_run(&mut self, _run: u32) {}

    /// Decision for one event.
    fn accept(&self, ctx: &EventContext) -> bool;

    /// `true` if the gate is off or accepts the event.
    fn passes(&self, ctx: &EventContext) -> bool {
        !self.is_on() || self.accept(ctx)
    }
}

/// Per-event access to reconstructed object collections.
pub trait ObjectSource {
    /// Run/event bookkeeping for the current event.
    fn context(&self) -> &EventContext;

    /// Jet collection stored under `tag`.
    ///
    /// Returns [`crate::Error::DataSourceInvalid`] when the collection is
    /// missing or flagged invalid for this event.
    fn jets(&self, tag: &str) -> Result<&[JetCandidate]>;

    /// Rec-hit cluster collection stored under `tag`.
    fn rec_hits(&self, tag: &str) -> Result<&[RecHit]>;
}

/// Detector geometry lookup.
pub trait GeometryProvider {
    /// Eta-partitions known for `run`, ordered by chamber, layer and roll.
    ///
    /// Returns [`crate::Error::GeometryUnavailable`] when no geometry can be provided.
    fn partitions_for_run(&self, run: u32) -> Result<Vec<EtaPartition>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct FixedGate(Option<bool>);

    impl TriggerGate for FixedGate {
        fn is_on(&self) -> bool {
            self.0.is_some()
        }

        fn accept(&self, _ctx: &EventContext) -> bool {
            self.0.unwrap_or(false)
        }
    }

    struct NoGeometry;

    impl GeometryProvider for NoGeometry {
        fn partitions_for_run(&self, run: u32) -> Result<Vec<EtaPartition>> {
            Err(Error::GeometryUnavailable(format!("no GEM geometry for run {run}")))
        }
    }

    #[test]
    fn gate_off_always_passes() {
        let ctx = EventContext::default();
        assert!(FixedGate(None).passes(&ctx));
        assert!(FixedGate(Some(true)).passes(&ctx));
        assert!(!FixedGate(Some(false)).passes(&ctx));
    }

    #[test]
    fn geometry_failure_is_typed() {
        let err = NoGeometry.partitions_for_run(42).unwrap_err();
        assert!(matches!(err, Error::GeometryUnavailable(_)));
        assert!(err.to_string().contains("42"));
    }
}
