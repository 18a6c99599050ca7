//! Per-hour reason tags, for explaining why an hour was No-Go.

use crate::classify::{classify, Phase, Reason};
use crate::metrics::extract;
use fable_core::rules::RuleSet;
use fable_core::series::HourlySeries;
use fable_utils::hours::format_local;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourDiagnostic {
    pub time: String,
    pub model_count: usize,
    pub transit: Vec<Reason>,
    pub anchor: Vec<Reason>,
    /// Home port transit reasons; `None` when home has no matching hour
    pub home_transit: Option<Vec<Reason>>,
}

/// Classify every destination hour under both phases, without hysteresis.
pub fn diagnose(home: &HourlySeries, dest: &HourlySeries, rules: &RuleSet) -> Vec<HourDiagnostic> {
    let offset = dest.site().utc_offset;
    dest.times()
        .iter()
        .enumerate()
        .map(|(idx, t)| {
            let m = extract(dest, idx);
            HourDiagnostic {
                time: format_local(t, offset),
                model_count: m.model_count,
                transit: classify(&m, Phase::Transit, rules).reasons,
                anchor: classify(&m, Phase::Anchor, rules).reasons,
                home_transit: home
                    .index_of(t)
                    .map(|h| classify(&extract(home, h), Phase::Transit, rules).reasons),
            }
        })
        .collect()
}
