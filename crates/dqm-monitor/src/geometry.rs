//! Static GEM geometry read from a file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use dqm_core::{Error, EtaPartition, GeometryProvider, Result};

use crate::config::read_config;

/// Eta-partition table, optionally restricted to a run range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticGeometry {
    /// Every partition of the detector.
    pub partitions: Vec<EtaPartition>,
    /// Inclusive `[first, last]` run range the table is valid for; all runs if absent.
    #[serde(default)]
    pub valid_runs: Option<[u32; 2]>,
}

impl StaticGeometry {
    /// Load a geometry table (YAML, or JSON for `.json` files).
    pub fn from_path(path: &Path) -> Result<Self> {
        read_config(path)
    }
}

impl GeometryProvider for StaticGeometry {
    fn partitions_for_run(&self, run: u32) -> Result<Vec<EtaPartition>> {
        if let Some([first, last]) = self.valid_runs {
            if run < first || run > last {
                return Err(Error::GeometryUnavailable(format!(
                    "geometry valid for runs {first}-{last}, not {run}"
                )));
            }
        }
        if self.partitions.is_empty() {
            return Err(Error::GeometryUnavailable(format!("no GEM partitions for run {run}")));
        }
        let mut parts = self.partitions.clone();
        parts.sort_by_key(|p| (p.chamber, p.layer, p.roll, p.id));
        Ok(parts)
    }
}
