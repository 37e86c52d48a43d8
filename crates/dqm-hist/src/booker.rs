//! Booking-phase histogram factory.

use std::collections::BTreeSet;

use dqm_core::{Binning, Error, HistogramBackend, Result};

use crate::element::MonitorElement;

/// Hands out [`MonitorElement`]s and refuses to book the same path twice.
///
/// The booker only exists during the booking phase; elements it returns are
/// owned by the caller.
#[derive(Debug, Default)]
pub struct Booker {
    folder: String,
    booked: BTreeSet<String>,
}

impl Booker {
    /// Booker positioned at the top-level folder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current folder.
    pub fn current_folder(&self) -> &str {
        &self.folder
    }

    /// Full paths of everything booked so far, sorted.
    pub fn booked_paths(&self) -> impl Iterator<Item = &str> {
        self.booked.iter().map(|s| s.as_str())
    }

    /// Number of elements booked so far.
    pub fn len(&self) -> usize {
        self.booked.len()
    }

    /// `true` if nothing has been booked.
    pub fn is_empty(&self) -> bool {
        self.booked.is_empty()
    }

    fn claim(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Booking("empty histogram name".into()));
        }
        let path = if self.folder.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.folder, name)
        };
        if !self.booked.insert(path.clone()) {
            return Err(Error::Booking(format!("'{path}' is already booked")));
        }
        log::trace!("booked {path}");
        Ok(())
    }
}

impl HistogramBackend for Booker {
    type Handle = MonitorElement;

    fn set_current_folder(&mut self, folder: &str) {
        self.folder = folder.trim_matches('/').to_string();
    }

    fn book_1d(&mut self, name: &str, title: &str, x: &Binning) -> Result<MonitorElement> {
        x.validate().map_err(|e| Error::Booking(format!("{name}: {e}")))?;
        self.claim(name)?;
        Ok(MonitorElement::h1(&self.folder, name, title, x.clone()))
    }

    fn book_2d(
        &mut self,
        name: &str,
        title: &str,
        x: &Binning,
        y: &Binning,
    ) -> Result<MonitorElement> {
        x.validate().map_err(|e| Error::Booking(format!("{name} (x): {e}")))?;
        y.validate().map_err(|e| Error::Booking(format!("{name} (y): {e}")))?;
        self.claim(name)?;
        Ok(MonitorElement::h2(&self.folder, name, title, x.clone(), y.clone()))
    }

    fn book_profile(
        &mut self,
        name: &str,
        title: &str,
        x: &Binning,
        y_range: (f64, f64),
    ) -> Result<MonitorElement> {
        x.validate().map_err(|e| Error::Booking(format!("{name}: {e}")))?;
        if !(y_range.0.is_finite() && y_range.1.is_finite()) || y_range.0 > y_range.1 {
            return Err(Error::Booking(format!(
                "{name}: invalid profile y range [{}, {}]",
                y_range.0, y_range.1
            )));
        }
        self.claim(name)?;
        Ok(MonitorElement::profile(&self.folder, name, title, x.clone(), y_range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqm_core::AccumulatorHandle;

    #[test]
    fn duplicate_names_rejected_per_folder() {
        let mut b = Booker::new();
        let x = Binning::uniform(4, 0.0, 4.0);
        b.set_current_folder("/HLT/Jet/");
        assert_eq!(b.current_folder(), "HLT/Jet");
        let me = b.book_1d("pt", "pt", &x).unwrap();
        assert_eq!(me.path(), "HLT/Jet/pt");
        assert!(matches!(b.book_1d("pt", "pt", &x), Err(Error::Booking(_))));

        b.set_current_folder("GEM/recHit");
        b.book_1d("pt", "pt", &x).unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b.booked_paths().collect::<Vec<_>>(), vec!["GEM/recHit/pt", "HLT/Jet/pt"]);
    }

    #[test]
    fn bad_binning_is_not_claimed() {
        let mut b = Booker::new();
        let err = b.book_1d("h", "h", &Binning::uniform(0, 0.0, 1.0)).unwrap_err();
        assert!(err.to_string().contains("nbins"));
        assert!(b.is_empty());
        assert!(b.book_profile("p", "p", &Binning::uniform(2, 0.0, 2.0), (5.0, 1.0)).is_err());
    }

    #[test]
    fn book_2d_and_fill() {
        let mut b = Booker::new();
        let mut me = b
            .book_2d("strips", "strips", &Binning::uniform(384, 1.0, 385.0), &Binning::uniform(8, 1.0, 9.0))
            .unwrap();
        me.set_axis_titles("strip", "roll");
        me.fill(&[1.0, 1.0]);
        me.fill(&[384.0, 8.0]);
        let h = me.as_h2().unwrap();
        assert_eq!(h.get(0, 0), 1.0);
        assert_eq!(h.get(383, 7), 1.0);
        assert_eq!(me.x_title, "strip");
    }
}
