//! Event loop and chunked parallel driver.
//!
//! ```text
//! events ──► par_chunks ──► worker: make() ─► run_events ─► partial
//!                                                              │
//!                          ordered merge of partials ◄─────────┘
//! ```
//!
//! Each worker books its own monitor with its own [`Booker`]; the merge at
//! the end is the only point where results from different workers meet.

use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use dqm_core::{Error, GeometryProvider, Result};
use dqm_hist::Booker;

use crate::event::Event;
use crate::jet_monitor::JetMonitor;
use crate::strips::{RecHitStripAggregator, StripOutcome};

/// Lifecycle of a monitor driven by [`run_events`].
pub trait Monitor: Send + Sized {
    /// Book (first run) and reset per-run state.
    fn on_run_start(&mut self, run: u32, booker: &mut Booker) -> Result<()>;

    /// A new luminosity block begins.
    fn on_lumi_start(&mut self, _run: u32, _lumi: u32) {}

    /// Process one event.
    fn analyze(&mut self, event: &Event) -> Result<()>;

    /// The current luminosity block ends.
    fn on_lumi_end(&mut self, _run: u32, _lumi: u32) {}

    /// The current run ends.
    fn on_run_end(&mut self, _run: u32) {}

    /// Absorb a monitor that processed a different slice of events.
    fn merge(&mut self, other: Self) -> Result<()>;
}

/// What an event loop covered.
///
/// Runs and luminosity blocks are counted as distinct values, so the totals
/// do not depend on how [`run_parallel`] chunks the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    /// Events processed.
    pub events: u64,
    /// Distinct run numbers.
    pub runs: u64,
    /// Distinct (run, lumi) blocks.
    pub lumis: u64,
}

impl LoopSummary {
    /// Summary of `events`.
    pub fn of(events: &[Event]) -> Self {
        let blocks: BTreeSet<(u32, u32)> =
            events.iter().map(|e| (e.context.run, e.context.lumi)).collect();
        let runs: BTreeSet<u32> = blocks.iter().map(|(run, _)| *run).collect();
        Self { events: events.len() as u64, runs: runs.len() as u64, lumis: blocks.len() as u64 }
    }
}

/// Feed `events` in order, calling the run/lumi hooks at every boundary.
pub fn run_events<M: Monitor>(
    monitor: &mut M,
    events: &[Event],
    booker: &mut Booker,
) -> Result<LoopSummary> {
    let mut current: Option<(u32, u32)> = None;
    for event in events {
        let (run, lumi) = (event.context.run, event.context.lumi);
        match current {
            Some((r, l)) if r == run && l == lumi => {}
            Some((r, l)) if r == run => {
                monitor.on_lumi_end(r, l);
                monitor.on_lumi_start(run, lumi);
            }
            previous => {
                if let Some((r, l)) = previous {
                    monitor.on_lumi_end(r, l);
                    monitor.on_run_end(r);
                }
                monitor.on_run_start(run, booker)?;
                monitor.on_lumi_start(run, lumi);
            }
        }
        current = Some((run, lumi));
        monitor.analyze(event)?;
    }
    if let Some((r, l)) = current {
        monitor.on_lumi_end(r, l);
        monitor.on_run_end(r);
    }
    Ok(LoopSummary::of(events))
}

/// Split `events` into `workers` contiguous chunks, run each on a fresh
/// monitor from `make`, and merge the partial monitors in chunk order.
///
/// `workers == 0` uses one chunk per thread of the current rayon pool.
pub fn run_parallel<M, F>(events: &[Event], workers: usize, make: F) -> Result<(M, LoopSummary)>
where
    M: Monitor,
    F: Fn() -> Result<M> + Sync,
{
    let workers = if workers == 0 { rayon::current_num_threads() } else { workers };
    if events.is_empty() {
        return Ok((make()?, LoopSummary::default()));
    }
    let chunk = events.len().div_ceil(workers.max(1));
    let partials: Vec<M> = events
        .par_chunks(chunk)
        .map(|slice| {
            let mut monitor = make()?;
            let mut booker = Booker::new();
            run_events(&mut monitor, slice, &mut booker)?;
            Ok(monitor)
        })
        .collect::<Result<_>>()?;

    let mut iter = partials.into_iter();
    let mut merged = iter.next().ok_or_else(|| Error::Merge("no partial results to merge".into()))?;
    for monitor in iter {
        merged.merge(monitor)?;
    }
    let total = LoopSummary::of(events);
    log::debug!("merged {} events from {} chunks", total.events, events.len().div_ceil(chunk));
    Ok((merged, total))
}

impl Monitor for JetMonitor {
    fn on_run_start(&mut self, run: u32, booker: &mut Booker) -> Result<()> {
        JetMonitor::on_run_start(self, run, booker)
    }

    fn analyze(&mut self, event: &Event) -> Result<()> {
        JetMonitor::analyze(self, event).map(drop)
    }

    fn on_run_end(&mut self, run: u32) {
        JetMonitor::on_run_end(self, run);
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        JetMonitor::merge(self, other)
    }
}

/// Strip aggregator bundled with the geometry it books from.
pub struct StripMonitor {
    aggregator: RecHitStripAggregator,
    geometry: Arc<dyn GeometryProvider + Send + Sync>,
    filled: u64,
    skipped: u64,
}

impl StripMonitor {
    /// Wrap an aggregator.
    pub fn new(
        aggregator: RecHitStripAggregator,
        geometry: Arc<dyn GeometryProvider + Send + Sync>,
    ) -> Self {
        Self { aggregator, geometry, filled: 0, skipped: 0 }
    }

    /// The wrapped aggregator.
    pub fn aggregator(&self) -> &RecHitStripAggregator {
        &self.aggregator
    }

    /// Strips filled so far.
    pub fn strips_filled(&self) -> u64 {
        self.filled
    }

    /// Events skipped because the rec-hit collection was invalid.
    pub fn events_skipped(&self) -> u64 {
        self.skipped
    }
}

impl Monitor for StripMonitor {
    fn on_run_start(&mut self, run: u32, booker: &mut Booker) -> Result<()> {
        self.aggregator.on_run_start(run, self.geometry.as_ref(), booker)
    }

    fn on_lumi_start(&mut self, run: u32, lumi: u32) {
        self.aggregator.on_lumi_start(run, lumi);
    }

    fn analyze(&mut self, event: &Event) -> Result<()> {
        match self.aggregator.analyze(event) {
            StripOutcome::Filled(n) => self.filled += n as u64,
            StripOutcome::Skipped => self.skipped += 1,
            StripOutcome::Inactive => {}
        }
        Ok(())
    }

    fn on_lumi_end(&mut self, run: u32, lumi: u32) {
        self.aggregator.on_lumi_end(run, lumi);
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        self.aggregator.merge(other.aggregator)?;
        self.filled += other.filled;
        self.skipped += other.skipped;
        Ok(())
    }
}
