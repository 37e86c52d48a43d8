//! Trigger-path gate used for the numerator and denominator selections.

use dqm_core::{EventContext, TriggerGate};

use crate::config::TriggerGateConfig;

/// Accepts events according to which HLT paths fired.
#[derive(Debug, Clone)]
pub struct PathTriggerGate {
    label: &'static str,
    paths: Vec<String>,
    any: bool,
    error_reply: bool,
}

impl PathTriggerGate {
    /// Gate from configuration; `label` only shows up in log messages.
    pub fn new(label: &'static str, cfg: &TriggerGateConfig) -> Self {
        Self {
            label,
            paths: cfg.hlt_paths.iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect(),
            any: cfg.and_or,
            error_reply: cfg.error_reply_hlt,
        }
    }

    fn fired(pattern: &str, fired: &std::collections::BTreeSet<String>) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => fired.iter().any(|p| p.starts_with(prefix)),
            None => fired.contains(pattern),
        }
    }
}

impl TriggerGate for PathTriggerGate {
    fn is_on(&self) -> bool {
        !self.paths.is_empty()
    }

    fn init_run(&mut self, run: u32) {
        if self.is_on() {
            log::debug!("{} gate for run {run}: {:?}", self.label, self.paths);
        }
    }

    fn accept(&self, ctx: &EventContext) -> bool {
        let Some(fired) = &ctx.trigger_results else {
            log::debug!(
                "{} gate: no trigger results in run {} event {}, replying {}",
                self.label,
                ctx.run,
                ctx.event,
                self.error_reply
            );
            return self.error_reply;
        };
        if self.any {
            self.paths.iter().any(|p| Self::fired(p, fired))
        } else {
            self.paths.iter().all(|p| Self::fired(p, fired))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(paths: &[&str]) -> EventContext {
        EventContext {
            trigger_results: Some(paths.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    fn gate(paths: &[&str], and_or: bool) -> PathTriggerGate {
        let cfg = TriggerGateConfig {
            hlt_paths: paths.iter().map(|s| s.to_string()).collect(),
            and_or,
            error_reply_hlt: false,
        };
        PathTriggerGate::new("test", &cfg)
    }

    #[test]
    fn no_paths_means_off() {
        let g = gate(&[" "], true);
        assert!(!g.is_on());
        assert!(g.passes(&ctx(&[])));
    }

    #[test]
    fn or_and_and_modes() {
        let e = ctx(&["HLT_PFJet40_v3", "HLT_IsoMu27_v9"]);
        assert!(gate(&["HLT_PFJet40_v*", "HLT_PFJet500_v*"], true).accept(&e));
        assert!(!gate(&["HLT_PFJet40_v*", "HLT_PFJet500_v*"], false).accept(&e));
        assert!(gate(&["HLT_PFJet40_v3", "HLT_IsoMu27_v*"], false).accept(&e));
        assert!(!gate(&["HLT_PFJet40"], true).accept(&e));
    }

    #[test]
    fn missing_results_use_error_reply() {
        let e = EventContext::default();
        assert!(!gate(&["HLT_PFJet40_v*"], true).accept(&e));
        let cfg = TriggerGateConfig {
            hlt_paths: vec!["HLT_PFJet40_v*".into()],
            and_or: true,
            error_reply_hlt: true,
        };
        assert!(PathTriggerGate::new("num", &cfg).accept(&e));
    }
}
