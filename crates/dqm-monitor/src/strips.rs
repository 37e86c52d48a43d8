//! GEM rec-hit strip occupancy per (chamber, layer).

use std::collections::{BTreeMap, HashMap};

use dqm_core::{
    AccumulatorHandle, Binning, ChamberKey, Error, GeometryProvider, HistogramBackend, ObjectSource,
    Result,
};
use dqm_hist::MonitorElement;

use crate::config::StripMonitorConfig;
use crate::vfat::vfat_bucket;

/// Number of VFAT front-end chips read out per chamber.
pub const VFATS_PER_CHAMBER: usize = 24;

/// Accumulators of one chamber layer.
#[derive(Debug, Clone)]
pub struct ChamberHistograms<H> {
    /// Strip × roll occupancy.
    pub strips: H,
    /// VFAT occupancy, if enabled.
    pub vfat: Option<H>,
}

#[derive(Debug, Clone, Copy)]
struct PartitionInfo {
    key: ChamberKey,
    roll: i32,
    n_strips: u32,
}

/// What [`RecHitStripAggregator::analyze`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripOutcome {
    /// No geometry for the current run; nothing is filled.
    Inactive,
    /// The rec-hit collection was invalid; event skipped.
    Skipped,
    /// Number of strips filled.
    Filled(usize),
}

/// Fills a strip × roll map (and a VFAT histogram) per chamber layer.
#[derive(Debug)]
pub struct RecHitStripAggregator<H = MonitorElement> {
    config: StripMonitorConfig,
    chambers: BTreeMap<ChamberKey, ChamberHistograms<H>>,
    partitions: HashMap<u32, PartitionInfo>,
    active: bool,
}

impl<H: AccumulatorHandle> RecHitStripAggregator<H> {
    /// Aggregator with nothing booked.
    pub fn new(config: StripMonitorConfig) -> Result<Self> {
        config.strip_binning.to_binning().validate()?;
        config.roll_binning.to_binning().validate()?;
        Ok(Self { config, chambers: BTreeMap::new(), partitions: HashMap::new(), active: false })
    }

    /// Configuration in use.
    pub fn config(&self) -> &StripMonitorConfig {
        &self.config
    }

    /// Book every chamber layer the geometry knows for `run`.
    ///
    /// Missing geometry is not fatal: it is logged and the aggregator stays
    /// inert until the next run. Chambers booked in an earlier run are kept.
    pub fn on_run_start<B>(
        &mut self,
        run: u32,
        geometry: &dyn GeometryProvider,
        backend: &mut B,
    ) -> Result<()>
    where
        B: HistogramBackend<Handle = H>,
    {
        self.partitions.clear();
        self.active = false;
        let partitions = match geometry.partitions_for_run(run) {
            Ok(p) => p,
            Err(e @ Error::GeometryUnavailable(_)) => {
                log::error!("run {run}: {e}; strip occupancy disabled for this run");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        backend.set_current_folder(&self.config.folder_name);
        let strip_axis = self.config.strip_binning.to_binning();
        let roll_axis = self.config.roll_binning.to_binning();
        let vfat_axis = Binning::uniform(VFATS_PER_CHAMBER, 0.0, VFATS_PER_CHAMBER as f64);
        for p in &partitions {
            let key = p.chamber_key();
            if !self.chambers.contains_key(&key) {
                let name = format!("StripFired_Gemini_{}_la_{}", key.chamber, key.layer);
                let title =
                    format!("StripsFired Gemini chamber : {}, layer : {}", key.chamber, key.layer);
                let mut strips = backend.book_2d(&name, &title, &strip_axis, &roll_axis)?;
                strips.set_axis_titles("Strip", "Roll (iEta)");
                let vfat = if self.config.vfat_occupancy {
                    let name = format!("VFATFired_Gemini_{}_la_{}", key.chamber, key.layer);
                    let title =
                        format!("VFATsFired Gemini chamber : {}, layer : {}", key.chamber, key.layer);
                    let mut h = backend.book_1d(&name, &title, &vfat_axis)?;
                    h.set_axis_titles("VFAT", "Strips fired");
                    Some(h)
                } else {
                    None
                };
                self.chambers.insert(key, ChamberHistograms { strips, vfat });
            }
            self.partitions.insert(p.id, PartitionInfo { key, roll: p.roll, n_strips: p.n_strips });
        }
        log::debug!(
            "run {run}: {} partitions, {} chamber layers booked",
            self.partitions.len(),
            self.chambers.len()
        );
        self.active = true;
        Ok(())
    }

    /// Lumi-block start hook.
    pub fn on_lumi_start(&self, run: u32, lumi: u32) {
        log::debug!("run {run}: lumi block {lumi} begins");
    }

    /// Lumi-block end hook.
    pub fn on_lumi_end(&self, run: u32, lumi: u32) {
        log::debug!("run {run}: lumi block {lumi} ends");
    }

    /// Fill every strip of every cluster belonging to a booked partition.
    pub fn analyze<S: ObjectSource + ?Sized>(&mut self, source: &S) -> StripOutcome {
        if !self.active {
            return StripOutcome::Inactive;
        }
        let ctx = source.context();
        let hits = match source.rec_hits(&self.config.rec_hits) {
            Ok(hits) => hits,
            Err(e) => {
                log::warn!("run {} event {}: {e}; event skipped", ctx.run, ctx.event);
                return StripOutcome::Skipped;
            }
        };
        let mut filled = 0;
        for hit in hits {
            let Some(info) = self.partitions.get(&hit.partition_id) else {
                continue;
            };
            let Some(histos) = self.chambers.get_mut(&info.key) else {
                continue;
            };
            for strip in hit.strips() {
                let x = strip as f64;
                histos.strips.fill(&[x, f64::from(info.roll)]);
                if let Some(vfat) = histos.vfat.as_mut() {
                    let bucket = vfat_bucket(1.0, f64::from(info.n_strips), x, info.roll);
                    vfat.fill(&[f64::from(bucket)]);
                }
                filled += 1;
            }
        }
        StripOutcome::Filled(filled)
    }

    /// `true` while geometry is available for the current run.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Histograms of one chamber layer.
    pub fn chamber(&self, key: ChamberKey) -> Option<&ChamberHistograms<H>> {
        self.chambers.get(&key)
    }

    /// Booked chamber layers, sorted.
    pub fn chambers(&self) -> impl Iterator<Item = ChamberKey> + '_ {
        self.chambers.keys().copied()
    }

    /// Every accumulator, chamber by chamber.
    pub fn handles(&self) -> impl Iterator<Item = &H> {
        self.chambers.values().flat_map(|c| std::iter::once(&c.strips).chain(c.vfat.as_ref()))
    }

    /// Absorb another aggregator. Chambers only the other side booked are moved over.
    ///
    /// Every shared chamber is checked before anything is added, so a failed
    /// merge leaves `self` as it was.
    pub fn merge(&mut self, other: Self) -> Result<()> {
        if self.config != other.config {
            return Err(Error::Merge("strip aggregators were configured differently".into()));
        }
        for (key, theirs) in &other.chambers {
            if let Some(mine) = self.chambers.get(key) {
                mine.strips.check_mergeable(&theirs.strips)?;
                if let (Some(a), Some(b)) = (mine.vfat.as_ref(), theirs.vfat.as_ref()) {
                    a.check_mergeable(b)?;
                }
            }
        }
        for (key, theirs) in other.chambers {
            match self.chambers.get_mut(&key) {
                Some(mine) => {
                    mine.strips.merge_from(&theirs.strips)?;
                    if let (Some(a), Some(b)) = (mine.vfat.as_mut(), theirs.vfat.as_ref()) {
                        a.merge_from(b)?;
                    }
                }
                None => {
                    self.chambers.insert(key, theirs);
                }
            }
        }
        for (id, info) in other.partitions {
            self.partitions.entry(id).or_insert(info);
        }
        self.active |= other.active;
        Ok(())
    }
}
