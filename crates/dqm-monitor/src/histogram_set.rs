//! The seven numerator/denominator histogram pairs booked for one region.

use dqm_core::{AccumulatorHandle, Binning, FillPhase, HistogramBackend, Measurement, Result};

/// Slot of a [`HistogramSet`], in booking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricSlot {
    /// pT
    Pt,
    /// pT with the threshold binning
    PtThreshold,
    /// pT profile versus luminosity section
    PtVsLs,
    /// φ
    Phi,
    /// η
    Eta,
    /// η × φ
    EtaVsPhi,
    /// η × pT
    EtaVsPt,
}

impl MetricSlot {
    /// All slots in order.
    pub const ALL: [MetricSlot; 7] = [
        MetricSlot::Pt,
        MetricSlot::PtThreshold,
        MetricSlot::PtVsLs,
        MetricSlot::Phi,
        MetricSlot::Eta,
        MetricSlot::EtaVsPhi,
        MetricSlot::EtaVsPt,
    ];

    /// Position in the set.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Metric part of the histogram name.
    pub fn metric(self) -> &'static str {
        match self {
            MetricSlot::Pt => "pT",
            MetricSlot::PtThreshold => "pT_pTThresh",
            MetricSlot::PtVsLs => "pTVsLS",
            MetricSlot::Phi => "phi",
            MetricSlot::Eta => "eta",
            MetricSlot::EtaVsPhi => "EtaVsPhi",
            MetricSlot::EtaVsPt => "EtaVspT",
        }
    }

    fn title(self) -> &'static str {
        match self {
            MetricSlot::Pt | MetricSlot::PtThreshold => "pT",
            MetricSlot::PtVsLs => "pT vs LS",
            MetricSlot::Phi => "phi",
            MetricSlot::Eta => "eta",
            MetricSlot::EtaVsPhi => "eta Vs phi",
            MetricSlot::EtaVsPt => "eta Vs pT",
        }
    }

    fn axis_titles(self, obj: &str) -> (String, String) {
        match self {
            MetricSlot::Pt | MetricSlot::PtThreshold => {
                (format!("{obj} pT [GeV]"), "events / [GeV]".into())
            }
            MetricSlot::PtVsLs => ("LS".into(), format!("{obj} pT [GeV]")),
            MetricSlot::Phi => (format!("{obj} #phi"), "events / 0.1 rad".into()),
            MetricSlot::Eta => (format!("{obj} #eta"), "events / #eta".into()),
            MetricSlot::EtaVsPhi => (format!("{obj} #eta"), "#phi".into()),
            MetricSlot::EtaVsPt => (format!("{obj} #eta"), "Leading Jet pT [GeV]".into()),
        }
    }

    /// Whether the slot is a 1D histogram (and so has an efficiency curve).
    pub fn is_1d(self) -> bool {
        matches!(self, MetricSlot::Pt | MetricSlot::PtThreshold | MetricSlot::Phi | MetricSlot::Eta)
    }

    fn fill<H: AccumulatorHandle>(self, h: &mut H, m: &Measurement) {
        match self {
            MetricSlot::Pt | MetricSlot::PtThreshold => h.fill(&[m.pt]),
            MetricSlot::PtVsLs => h.fill(&[f64::from(m.lumi_section), m.pt]),
            MetricSlot::Phi => h.fill(&[m.phi]),
            MetricSlot::Eta => h.fill(&[m.eta]),
            MetricSlot::EtaVsPhi => h.fill(&[m.eta, m.phi]),
            MetricSlot::EtaVsPt => h.fill(&[m.eta, m.pt]),
        }
    }
}

/// Names used when booking one set: `<obj_tag><metric><_suffix>`.
#[derive(Debug, Clone, Copy)]
pub struct SetNaming<'a> {
    /// Object tag in names (`pfjet`).
    pub obj_tag: &'a str,
    /// Object name in titles (`PFJet`).
    pub obj_title: &'a str,
    /// Region suffix without the underscore; empty for the global set.
    pub suffix: &'a str,
    /// Region tag in titles (`(HB)`); empty for the global set.
    pub title_suffix: &'a str,
}

impl SetNaming<'_> {
    fn name(&self, slot: MetricSlot) -> String {
        if self.suffix.is_empty() {
            format!("{}{}", self.obj_tag, slot.metric())
        } else {
            format!("{}{}_{}", self.obj_tag, slot.metric(), self.suffix)
        }
    }

    fn title(&self, slot: MetricSlot) -> String {
        let mut t = format!("{} {}", self.obj_title, slot.title());
        if !self.title_suffix.is_empty() {
            t.push(' ');
            t.push_str(self.title_suffix);
        }
        t
    }
}

/// Axis binnings of one set.
#[derive(Debug, Clone, PartialEq)]
pub struct SetBinning {
    /// pT axis.
    pub pt: Binning,
    /// pT axis of the threshold slot.
    pub pt_threshold: Binning,
    /// Luminosity-section axis.
    pub ls: Binning,
    /// η axis.
    pub eta: Binning,
    /// φ axis.
    pub phi: Binning,
}

/// A numerator and a denominator accumulator with identical binning.
#[derive(Debug, Clone)]
pub struct SlotPair<H> {
    /// Filled when both gates pass.
    pub numerator: H,
    /// Filled when the denominator gate passes.
    pub denominator: H,
}

impl<H> SlotPair<H> {
    /// Member for `phase`.
    pub fn get(&self, phase: FillPhase) -> &H {
        match phase {
            FillPhase::Numerator => &self.numerator,
            FillPhase::Denominator => &self.denominator,
        }
    }

    fn get_mut(&mut self, phase: FillPhase) -> &mut H {
        match phase {
            FillPhase::Numerator => &mut self.numerator,
            FillPhase::Denominator => &mut self.denominator,
        }
    }
}

impl<H: AccumulatorHandle> SlotPair<H> {
    fn book<B>(backend: &mut B, slot: MetricSlot, naming: &SetNaming<'_>, bins: &SetBinning) -> Result<Self>
    where
        B: HistogramBackend<Handle = H>,
    {
        let name = naming.name(slot);
        let title = naming.title(slot);
        let (x_title, y_title) = slot.axis_titles(naming.obj_title);
        let mut book_one = |phase: FillPhase| -> Result<H> {
            let name = format!("{name}_{}", phase.as_str());
            let title = format!("{title} ({})", phase.as_str());
            let mut h = match slot {
                MetricSlot::Pt => backend.book_1d(&name, &title, &bins.pt)?,
                MetricSlot::PtThreshold => backend.book_1d(&name, &title, &bins.pt_threshold)?,
                MetricSlot::PtVsLs => {
                    backend.book_profile(&name, &title, &bins.ls, (bins.pt.low(), bins.pt.high()))?
                }
                MetricSlot::Phi => backend.book_1d(&name, &title, &bins.phi)?,
                MetricSlot::Eta => backend.book_1d(&name, &title, &bins.eta)?,
                MetricSlot::EtaVsPhi => backend.book_2d(&name, &title, &bins.eta, &bins.phi)?,
                MetricSlot::EtaVsPt => backend.book_2d(&name, &title, &bins.eta, &bins.pt)?,
            };
            h.set_axis_titles(&x_title, &y_title);
            Ok(h)
        };
        let numerator = book_one(FillPhase::Numerator)?;
        let denominator = book_one(FillPhase::Denominator)?;
        Ok(Self { numerator, denominator })
    }
}

/// Seven booked slot pairs, indexed by [`MetricSlot`].
#[derive(Debug, Clone)]
pub struct HistogramSet<H> {
    pairs: [SlotPair<H>; 7],
}

impl<H: AccumulatorHandle> HistogramSet<H> {
    /// Book all seven pairs.
    pub fn book<B>(backend: &mut B, naming: &SetNaming<'_>, bins: &SetBinning) -> Result<Self>
    where
        B: HistogramBackend<Handle = H>,
    {
        let mut book = |slot| SlotPair::book(&mut *backend, slot, naming, bins);
        let pairs = [
            book(MetricSlot::Pt)?,
            book(MetricSlot::PtThreshold)?,
            book(MetricSlot::PtVsLs)?,
            book(MetricSlot::Phi)?,
            book(MetricSlot::Eta)?,
            book(MetricSlot::EtaVsPhi)?,
            book(MetricSlot::EtaVsPt)?,
        ];
        Ok(Self { pairs })
    }

    /// Fill the `phase` member of every slot with `m`.
    pub fn fill(&mut self, phase: FillPhase, m: &Measurement) {
        for slot in MetricSlot::ALL {
            slot.fill(self.pairs[slot.index()].get_mut(phase), m);
        }
    }

    /// Pair booked for `slot`.
    pub fn pair(&self, slot: MetricSlot) -> &SlotPair<H> {
        &self.pairs[slot.index()]
    }

    /// Slots and their pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricSlot, &SlotPair<H>)> {
        MetricSlot::ALL.into_iter().zip(self.pairs.iter())
    }

    /// Every accumulator, numerator before denominator per slot.
    pub fn handles(&self) -> impl Iterator<Item = &H> {
        self.pairs.iter().flat_map(|p| [&p.numerator, &p.denominator])
    }

    /// Check every slot of `other` against this set without changing anything.
    pub fn check_mergeable(&self, other: &Self) -> Result<()> {
        for (mine, theirs) in self.pairs.iter().zip(&other.pairs) {
            mine.numerator.check_mergeable(&theirs.numerator)?;
            mine.denominator.check_mergeable(&theirs.denominator)?;
        }
        Ok(())
    }

    /// Add `other` slot by slot. Nothing is added unless every slot matches.
    pub fn merge_from(&mut self, other: &Self) -> Result<()> {
        self.check_mergeable(other)?;
        for (mine, theirs) in self.pairs.iter_mut().zip(&other.pairs) {
            mine.numerator.merge_from(&theirs.numerator)?;
            mine.denominator.merge_from(&theirs.denominator)?;
        }
        Ok(())
    }
}
