//! Per-bin efficiency from a numerator/denominator pair of 1D histograms.

use serde::Serialize;

use dqm_core::{Error, Result};

use crate::element::MonitorElement;

/// Efficiency in one bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyPoint {
    /// Lower bin edge.
    pub low: f64,
    /// Upper bin edge.
    pub high: f64,
    /// Numerator count.
    pub passed: f64,
    /// Denominator count.
    pub total: f64,
    /// `passed / total`; `None` for an empty denominator bin.
    pub efficiency: Option<f64>,
    /// Binomial uncertainty `sqrt(eff * (1 - eff) / total)`.
    pub uncertainty: Option<f64>,
}

/// Divide `numerator` by `denominator` bin by bin.
///
/// Both elements must be identically binned 1D histograms.
pub fn efficiency(numerator: &MonitorElement, denominator: &MonitorElement) -> Result<Vec<EfficiencyPoint>> {
    let (num, den) = match (numerator.as_h1(), denominator.as_h1()) {
        (Some(n), Some(d)) => (n, d),
        _ => {
            return Err(Error::Validation(format!(
                "efficiency needs two 1D histograms ('{}', '{}')",
                numerator.name, denominator.name
            )));
        }
    };
    if num.x != den.x {
        return Err(Error::Validation(format!(
            "'{}' and '{}' are binned differently",
            numerator.name, denominator.name
        )));
    }

    let edges = den.x.edges();
    let points = num
        .bin_content
        .iter()
        .zip(&den.bin_content)
        .enumerate()
        .map(|(i, (&passed, &total))| {
            let (efficiency, uncertainty) = if total > 0.0 {
                let eff = passed / total;
                let p = eff.clamp(0.0, 1.0);
                (Some(eff), Some((p * (1.0 - p) / total).sqrt()))
            } else {
                (None, None)
            };
            EfficiencyPoint { low: edges[i], high: edges[i + 1], passed, total, efficiency, uncertainty }
        })
        .collect();
    Ok(points)
}
