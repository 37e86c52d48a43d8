//! JSON-lines event records.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use dqm_core::{Error, EventContext, JetCandidate, ObjectSource, RecHit, Result};

/// One recorded event: bookkeeping plus named object collections.
///
/// ```json
/// {"run": 1, "lumi": 3, "event": 7, "trigger_results": ["HLT_PFJet40_v1"],
///  "jets": {"ak4PFJetsCHS": [{"pt": 55.0, "eta": 2.0, "phi": -0.6}]}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Run, lumi, event number and trigger results.
    #[serde(flatten)]
    pub context: EventContext,
    /// Jet collections by input tag.
    #[serde(default)]
    pub jets: BTreeMap<String, Vec<JetCandidate>>,
    /// Rec-hit collections by input tag.
    #[serde(default)]
    pub rec_hits: BTreeMap<String, Vec<RecHit>>,
    /// Tags whose collection is flagged invalid for this event.
    #[serde(default)]
    pub invalid: BTreeSet<String>,
}

impl Event {
    fn collection<'a, T>(
        &self,
        map: &'a BTreeMap<String, Vec<T>>,
        kind: &str,
        tag: &str,
    ) -> Result<&'a [T]> {
        if self.invalid.contains(tag) {
            return Err(Error::DataSourceInvalid(format!(
                "{kind} collection '{tag}' is flagged invalid"
            )));
        }
        map.get(tag)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::DataSourceInvalid(format!("{kind} collection '{tag}' not found")))
    }
}

impl ObjectSource for Event {
    fn context(&self) -> &EventContext {
        &self.context
    }

    fn jets(&self, tag: &str) -> Result<&[JetCandidate]> {
        self.collection(&self.jets, "jet", tag)
    }

    fn rec_hits(&self, tag: &str) -> Result<&[RecHit]> {
        self.collection(&self.rec_hits, "rec-hit", tag)
    }
}

/// Parse JSON-lines text; blank lines and `#` comments are skipped.
pub fn parse_events(text: &str) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let ev: Event = serde_json::from_str(line)
            .map_err(|e| Error::Validation(format!("line {}: {e}", i + 1)))?;
        events.push(ev);
    }
    Ok(events)
}

/// Read a JSON-lines event file.
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    let text = std::fs::read_to_string(path)?;
    parse_events(&text).map_err(|e| match e {
        Error::Validation(msg) => Error::Validation(format!("{}: {msg}", path.display())),
        other => other,
    })
}
