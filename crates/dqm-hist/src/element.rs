//! Monitor elements: the accumulators handed out by [`crate::Booker`].

use serde::Serialize;

use dqm_core::types::BinIndex;
use dqm_core::{AccumulatorHandle, Binning, Error, Result};

/// A 1D histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hist1D {
    /// X axis binning.
    pub x: Binning,
    /// Bin contents (length = n_bins, excluding under/overflow).
    pub bin_content: Vec<f64>,
    /// Underflow content.
    pub underflow: f64,
    /// Overflow content.
    pub overflow: f64,
    /// Number of fills, including under/overflow.
    pub entries: u64,
}

impl Hist1D {
    fn new(x: Binning) -> Self {
        let n = x.n_bins();
        Self { x, bin_content: vec![0.0; n], underflow: 0.0, overflow: 0.0, entries: 0 }
    }

    fn fill(&mut self, x: f64) {
        match self.x.find_bin(x) {
            BinIndex::Underflow => self.underflow += 1.0,
            BinIndex::Overflow => self.overflow += 1.0,
            BinIndex::Bin(b) => self.bin_content[b] += 1.0,
        }
        self.entries += 1;
    }

    fn merge(&mut self, other: &Hist1D) -> Result<()> {
        if self.x != other.x {
            return Err(Error::Merge("1D x binning differs".into()));
        }
        add_assign(&mut self.bin_content, &other.bin_content);
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
        Ok(())
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}

/// A 2D histogram. In-range contents are stored row-major in y (`ix + nx * iy`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hist2D {
    /// X axis binning.
    pub x: Binning,
    /// Y axis binning.
    pub y: Binning,
    /// Bin contents (length = nx * ny).
    pub bin_content: Vec<f64>,
    /// Content of fills outside the range on either axis.
    pub out_of_range: f64,
    /// Number of fills, including out-of-range ones.
    pub entries: u64,
}

impl Hist2D {
    fn new(x: Binning, y: Binning) -> Self {
        let n = x.n_bins() * y.n_bins();
        Self { x, y, bin_content: vec![0.0; n], out_of_range: 0.0, entries: 0 }
    }

    fn fill(&mut self, x: f64, y: f64) {
        match (self.x.find_bin(x), self.y.find_bin(y)) {
            (BinIndex::Bin(ix), BinIndex::Bin(iy)) => {
                let nx = self.x.n_bins();
                self.bin_content[ix + nx * iy] += 1.0;
            }
            _ => self.out_of_range += 1.0,
        }
        self.entries += 1;
    }

    fn merge(&mut self, other: &Hist2D) -> Result<()> {
        if self.x != other.x || self.y != other.y {
            return Err(Error::Merge("2D binning differs".into()));
        }
        add_assign(&mut self.bin_content, &other.bin_content);
        self.out_of_range += other.out_of_range;
        self.entries += other.entries;
        Ok(())
    }

    /// Content of in-range bin `(ix, iy)`.
    pub fn get(&self, ix: usize, iy: usize) -> f64 {
        self.bin_content[ix + self.x.n_bins() * iy]
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}

/// Profile of y versus x: per x bin, the mean and spread of y.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    /// X axis binning.
    pub x: Binning,
    /// Lower edge of the accepted y range.
    pub y_min: f64,
    /// Upper edge of the accepted y range.
    pub y_max: f64,
    /// Σw per bin.
    pub sum_w: Vec<f64>,
    /// Σw·y per bin.
    pub sum_wy: Vec<f64>,
    /// Σw·y² per bin.
    pub sum_wy2: Vec<f64>,
    /// Fills with x below the axis.
    pub underflow: f64,
    /// Fills with x at or above the axis.
    pub overflow: f64,
    /// Accepted fills.
    pub entries: u64,
}

impl Profile {
    fn new(x: Binning, y_min: f64, y_max: f64) -> Self {
        let n = x.n_bins();
        Self {
            x,
            y_min,
            y_max,
            sum_w: vec![0.0; n],
            sum_wy: vec![0.0; n],
            sum_wy2: vec![0.0; n],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    fn fill(&mut self, x: f64, y: f64) {
        // A degenerate y range means "no y cut".
        if self.y_min < self.y_max && !(y >= self.y_min && y <= self.y_max) {
            return;
        }
        match self.x.find_bin(x) {
            BinIndex::Underflow => self.underflow += 1.0,
            BinIndex::Overflow => self.overflow += 1.0,
            BinIndex::Bin(b) => {
                self.sum_w[b] += 1.0;
                self.sum_wy[b] += y;
                self.sum_wy2[b] += y * y;
            }
        }
        self.entries += 1;
    }

    fn merge(&mut self, other: &Profile) -> Result<()> {
        if self.x != other.x || self.y_min != other.y_min || self.y_max != other.y_max {
            return Err(Error::Merge("profile binning differs".into()));
        }
        add_assign(&mut self.sum_w, &other.sum_w);
        add_assign(&mut self.sum_wy, &other.sum_wy);
        add_assign(&mut self.sum_wy2, &other.sum_wy2);
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
        Ok(())
    }

    /// Mean y in bin `b`, or `None` if the bin is empty.
    pub fn mean(&self, b: usize) -> Option<f64> {
        let w = self.sum_w[b];
        if w > 0.0 { Some(self.sum_wy[b] / w) } else { None }
    }

    /// Standard deviation of y in bin `b`, or `None` if the bin is empty.
    pub fn spread(&self, b: usize) -> Option<f64> {
        let mean = self.mean(b)?;
        let var = self.sum_wy2[b] / self.sum_w[b] - mean * mean;
        Some(var.max(0.0).sqrt())
    }
}

/// Accumulator payload of a [`MonitorElement`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementData {
    /// 1D histogram.
    H1(Hist1D),
    /// 2D histogram.
    H2(Hist2D),
    /// Profile histogram.
    Profile(Profile),
}

/// A named, booked accumulator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorElement {
    /// Folder the element was booked in.
    pub folder: String,
    /// Element name.
    pub name: String,
    /// Element title.
    pub title: String,
    /// X axis title.
    pub x_title: String,
    /// Y axis title.
    pub y_title: String,
    /// Accumulated data.
    pub data: ElementData,
}

impl MonitorElement {
    pub(crate) fn new(folder: &str, name: &str, title: &str, data: ElementData) -> Self {
        Self {
            folder: folder.to_string(),
            name: name.to_string(),
            title: title.to_string(),
            x_title: String::new(),
            y_title: String::new(),
            data,
        }
    }

    /// `folder/name`, or just `name` at top level.
    pub fn path(&self) -> String {
        if self.folder.is_empty() { self.name.clone() } else { format!("{}/{}", self.folder, self.name) }
    }

    /// Number of fills seen by the element.
    pub fn entries(&self) -> u64 {
        match &self.data {
            ElementData::H1(h) => h.entries,
            ElementData::H2(h) => h.entries,
            ElementData::Profile(p) => p.entries,
        }
    }

    /// The 1D payload, if this is a 1D histogram.
    pub fn as_h1(&self) -> Option<&Hist1D> {
        match &self.data {
            ElementData::H1(h) => Some(h),
            _ => None,
        }
    }

    /// The 2D payload, if this is a 2D histogram.
    pub fn as_h2(&self) -> Option<&Hist2D> {
        match &self.data {
            ElementData::H2(h) => Some(h),
            _ => None,
        }
    }

    /// The profile payload, if this is a profile.
    pub fn as_profile(&self) -> Option<&Profile> {
        match &self.data {
            ElementData::Profile(p) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn h1(folder: &str, name: &str, title: &str, x: Binning) -> Self {
        Self::new(folder, name, title, ElementData::H1(Hist1D::new(x)))
    }

    pub(crate) fn h2(folder: &str, name: &str, title: &str, x: Binning, y: Binning) -> Self {
        Self::new(folder, name, title, ElementData::H2(Hist2D::new(x, y)))
    }

    pub(crate) fn profile(folder: &str, name: &str, title: &str, x: Binning, y: (f64, f64)) -> Self {
        Self::new(folder, name, title, ElementData::Profile(Profile::new(x, y.0, y.1)))
    }
}

impl AccumulatorHandle for MonitorElement {
    fn name(&self) -> &str {
        &self.name
    }

    fn fill(&mut self, coords: &[f64]) {
        match &mut self.data {
            ElementData::H1(h) => {
                assert_eq!(coords.len(), 1, "1D element '{}' filled with {coords:?}", self.name);
                h.fill(coords[0]);
            }
            ElementData::H2(h) => {
                assert_eq!(coords.len(), 2, "2D element '{}' filled with {coords:?}", self.name);
                h.fill(coords[0], coords[1]);
            }
            ElementData::Profile(p) => {
                assert_eq!(coords.len(), 2, "profile '{}' filled with {coords:?}", self.name);
                p.fill(coords[0], coords[1]);
            }
        }
    }

    fn set_axis_titles(&mut self, x: &str, y: &str) {
        self.x_title = x.to_string();
        self.y_title = y.to_string();
    }

    fn check_mergeable(&self, other: &Self) -> Result<()> {
        if self.folder != other.folder || self.name != other.name {
            return Err(Error::Merge(format!("cannot merge '{}' into '{}'", other.path(), self.path())));
        }
        let why = match (&self.data, &other.data) {
            (ElementData::H1(a), ElementData::H1(b)) if a.x != b.x => "1D x binning differs",
            (ElementData::H2(a), ElementData::H2(b)) if a.x != b.x || a.y != b.y => {
                "2D binning differs"
            }
            (ElementData::Profile(a), ElementData::Profile(b))
                if a.x != b.x || a.y_min != b.y_min || a.y_max != b.y_max =>
            {
                "profile binning differs"
            }
            (ElementData::H1(_), ElementData::H1(_))
            | (ElementData::H2(_), ElementData::H2(_))
            | (ElementData::Profile(_), ElementData::Profile(_)) => return Ok(()),
            _ => "element kinds differ",
        };
        Err(Error::Merge(format!("{}: {why}", self.path())))
    }

    fn merge_from(&mut self, other: &Self) -> Result<()> {
        self.check_mergeable(other)?;
        let path = self.path();
        let res = match (&mut self.data, &other.data) {
            (ElementData::H1(a), ElementData::H1(b)) => a.merge(b),
            (ElementData::H2(a), ElementData::H2(b)) => a.merge(b),
            (ElementData::Profile(a), ElementData::Profile(b)) => a.merge(b),
            _ => Err(Error::Merge("element kinds differ".into())),
        };
        res.map_err(|e| Error::Merge(format!("{path}: {e}")))
    }
}

fn add_assign(dst: &mut [f64], src: &[f64]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d += s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_1d_with_flows() {
        let mut me = MonitorElement::h1("", "h", "h", Binning::uniform(3, 0.0, 3.0));
        for x in [0.5, 1.5, 2.5, 0.5, -1.0, 3.0] {
            me.fill(&[x]);
        }
        let h = me.as_h1().unwrap();
        assert_eq!(h.bin_content, vec![2.0, 1.0, 1.0]);
        assert_eq!(h.underflow, 1.0);
        assert_eq!(h.overflow, 1.0);
        assert_eq!(h.entries, 6);
        assert_eq!(h.integral(), 4.0);
    }

    #[test]
    fn fill_2d_layout() {
        let mut me = MonitorElement::h2(
            "",
            "h2",
            "h2",
            Binning::uniform(2, 0.0, 2.0),
            Binning::uniform(3, 0.0, 3.0),
        );
        me.fill(&[1.5, 2.5]);
        me.fill(&[1.5, 2.5]);
        me.fill(&[0.5, 0.5]);
        me.fill(&[5.0, 0.5]);
        let h = me.as_h2().unwrap();
        assert_eq!(h.get(1, 2), 2.0);
        assert_eq!(h.get(0, 0), 1.0);
        assert_eq!(h.out_of_range, 1.0);
        assert_eq!(h.integral(), 3.0);
        assert_eq!(h.entries, 4);
    }

    #[test]
    fn profile_ignores_y_outside_range() {
        let mut me = MonitorElement::profile("", "p", "p", Binning::uniform(10, 0.0, 10.0), (0.0, 100.0));
        me.fill(&[1.0, 10.0]);
        me.fill(&[1.0, 30.0]);
        me.fill(&[1.0, 150.0]);
        me.fill(&[1.0, -1.0]);
        let p = me.as_profile().unwrap();
        assert_eq!(p.entries, 2);
        approx::assert_abs_diff_eq!(p.mean(1).unwrap(), 20.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(p.spread(1).unwrap(), 10.0, epsilon = 1e-12);
        assert_eq!(p.mean(0), None);
    }

    #[test]
    fn profile_degenerate_range_accepts_everything() {
        let mut me = MonitorElement::profile("", "p", "p", Binning::uniform(2, 0.0, 2.0), (0.0, 0.0));
        me.fill(&[0.5, 1e6]);
        assert_eq!(me.entries(), 1);
    }

    #[test]
    #[should_panic(expected = "filled with")]
    fn wrong_arity_panics() {
        let mut me = MonitorElement::h1("", "h", "h", Binning::uniform(3, 0.0, 3.0));
        me.fill(&[1.0, 2.0]);
    }

    #[test]
    fn merge_sums_and_checks_binning() {
        let mut a = MonitorElement::h1("F", "h", "h", Binning::uniform(2, 0.0, 2.0));
        let mut b = a.clone();
        a.fill(&[0.5]);
        b.fill(&[0.5]);
        b.fill(&[5.0]);
        a.merge_from(&b).unwrap();
        let h = a.as_h1().unwrap();
        assert_eq!(h.bin_content, vec![2.0, 0.0]);
        assert_eq!(h.overflow, 1.0);
        assert_eq!(h.entries, 3);

        let c = MonitorElement::h1("F", "h", "h", Binning::uniform(4, 0.0, 2.0));
        let err = a.merge_from(&c).unwrap_err();
        assert!(err.to_string().contains("F/h"));

        let d = MonitorElement::h1("F", "other", "h", Binning::uniform(2, 0.0, 2.0));
        assert!(a.merge_from(&d).is_err());
    }

    #[test]
    fn mergeability_is_checked_without_filling() {
        let a = MonitorElement::h1("F", "h", "h", Binning::uniform(2, 0.0, 2.0));
        let mut p = MonitorElement::profile("F", "h", "h", Binning::uniform(2, 0.0, 2.0), (0.0, 1.0));
        p.fill(&[0.5, 0.5]);
        let err = a.check_mergeable(&p).unwrap_err();
        assert!(err.to_string().contains("kinds differ"));

        let narrower = MonitorElement::profile("F", "h", "h", Binning::uniform(2, 0.0, 2.0), (0.0, 0.5));
        assert!(p.check_mergeable(&narrower).is_err());
        assert!(p.merge_from(&narrower).is_err());
        assert_eq!(p.entries(), 1);
    }

    #[test]
    fn json_summary_is_tagged() {
        let me = MonitorElement::h1("HLT/Jet", "h", "t", Binning::uniform(1, 0.0, 1.0));
        let v = serde_json::to_value(&me).unwrap();
        assert_eq!(v["data"]["kind"], "h1");
        assert_eq!(me.path(), "HLT/Jet/h");
    }
}
