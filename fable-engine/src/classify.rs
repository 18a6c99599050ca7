//! Per-hour Go/No-Go decision cascade.
//!
//! Each call is evaluated fresh from one [`HourMetrics`]; the only state that
//! crosses hours is the optional [`MetricMemory`] used for hysteresis.

use crate::metrics::HourMetrics;
use fable_core::rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the boat is during an hour of an excursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Under way between the home port and the destination
    Transit,
    /// Moored at the sheltered destination
    Anchor,
}

impl Phase {
    /// Phase of hour `k` in a span of `len` hours: the first and last hours
    /// are transit, everything in between is anchor.
    pub fn in_span(k: usize, len: usize) -> Phase {
        if k == 0 || k + 1 >= len {
            Phase::Transit
        } else {
            Phase::Anchor
        }
    }
}

/// Tag of a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Storm,
    WindUnknown,
    VisBelowMin,
    OnshoreExceeds,
    Squalls,
    GustNoGo,
    WindNoGo,
    WindFamilyMax,
    AnchorGustExceeds,
    AnchorWindExceeds,
    WavesUnknown,
    HsNoGo,
    HsFamilyMax,
    TpShort,
    ShortSteep,
    ShortSteepHard,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Storm => "storm",
            Reason::WindUnknown => "wind_unknown",
            Reason::VisBelowMin => "vis_below_min",
            Reason::OnshoreExceeds => "onshore_exceeds",
            Reason::Squalls => "squalls",
            Reason::GustNoGo => "gust_no_go",
            Reason::WindNoGo => "wind_no_go",
            Reason::WindFamilyMax => "wind_family_max",
            Reason::AnchorGustExceeds => "anchor_gust_exceeds",
            Reason::AnchorWindExceeds => "anchor_wind_exceeds",
            Reason::WavesUnknown => "waves_unknown",
            Reason::HsNoGo => "hs_no_go",
            Reason::HsFamilyMax => "hs_family_max",
            Reason::TpShort => "tp_short",
            Reason::ShortSteep => "short_steep",
            Reason::ShortSteepHard => "short_steep_hard",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks every classification runs through, in evaluation order.
pub const CHECKS: [&str; 7] = [
    "storm",
    "wind_data",
    "visibility",
    "onshore",
    "squalls",
    "wind_ceilings",
    "wave_coupling",
];

/// The hysteresis-tracked values of one hour.
///
/// Raw values rather than pass/fail, since the next hour may be classified
/// in a different phase against different ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricMemory {
    pub max_speed: Option<f64>,
    pub hs: Option<f64>,
}

/// Outcome of classifying one hour.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub ok: bool,
    pub reasons: Vec<Reason>,
    /// This hour's tracked values, to feed the next hour's hysteresis
    pub memory: MetricMemory,
}

impl Verdict {
    pub fn has(&self, reason: Reason) -> bool {
        self.reasons.contains(&reason)
    }
}

/// Classify one hour with no memory of the previous hour.
pub fn classify(metrics: &HourMetrics, phase: Phase, rules: &RuleSet) -> Verdict {
    classify_after(metrics, phase, rules, None)
}

/// Classify one hour, widening each wind and Hs ceiling by its hysteresis
/// margin when the `previous` hour's value was inside that same ceiling.
pub fn classify_after(
    metrics: &HourMetrics,
    phase: Phase,
    rules: &RuleSet,
    previous: Option<MetricMemory>,
) -> Verdict {
    let memory = MetricMemory {
        max_speed: metrics.max_speed,
        hs: metrics.hs,
    };

    // Thunderstorm overrides everything else.
    if metrics
        .weather_codes
        .iter()
        .any(|c| rules.storm.codes.contains(c))
    {
        return Verdict {
            ok: false,
            reasons: vec![Reason::Storm],
            memory,
        };
    }

    let hysteresis = &rules.hysteresis;
    let previous = previous.filter(|_| hysteresis.enabled).unwrap_or_default();
    // wind ceilings fail at `>=`, so "inside" is strictly below
    let wind_ceiling = |ceiling: f64| {
        widen(
            ceiling,
            hysteresis.wind_kmh,
            previous.max_speed.is_some_and(|p| p < ceiling),
        )
    };

    let mut reasons = Vec::new();

    if !metrics.has_wind() {
        reasons.push(Reason::WindUnknown);
    }

    if let Some(vis) = metrics.min_visibility_km {
        if vis < rules.visibility.min_km {
            reasons.push(Reason::VisBelowMin);
        }
    }

    if let Some(speed) = metrics.max_speed {
        if metrics.onshore && speed > rules.wind.onshore_degrade_kmh {
            reasons.push(Reason::OnshoreExceeds);
        }
    }

    if let (Some(gust), Some(min_speed)) = (metrics.max_gust, metrics.min_speed) {
        let squall_limit = match phase {
            Phase::Transit => rules.gusts.squall_delta_kmh,
            Phase::Anchor => rules.anchor.squall_delta_max_kmh,
        };
        if gust - min_speed >= squall_limit {
            reasons.push(Reason::Squalls);
        }
    }

    if let Some(gust) = metrics.max_gust {
        match phase {
            Phase::Transit if gust >= rules.gusts.no_go_min_kmh => reasons.push(Reason::GustNoGo),
            Phase::Anchor if gust >= rules.anchor.gust_max_kmh => {
                reasons.push(Reason::AnchorGustExceeds)
            }
            _ => {}
        }
    }
    if let Some(speed) = metrics.max_speed {
        match phase {
            Phase::Transit => {
                if speed >= wind_ceiling(rules.wind.no_go_min_kmh) {
                    reasons.push(Reason::WindNoGo);
                }
                if speed >= wind_ceiling(rules.wind.family_max_kmh) {
                    reasons.push(Reason::WindFamilyMax);
                }
            }
            Phase::Anchor => {
                if speed >= wind_ceiling(rules.anchor.sustained_max_kmh) {
                    reasons.push(Reason::AnchorWindExceeds);
                }
            }
        }
    }

    match (metrics.hs, metrics.tp) {
        (Some(hs), Some(tp)) => check_waves(hs, tp, phase, rules, previous.hs, &mut reasons),
        _ => reasons.push(Reason::WavesUnknown),
    }

    Verdict {
        ok: reasons.is_empty(),
        reasons,
        memory,
    }
}

fn widen(ceiling: f64, margin: f64, was_inside: bool) -> f64 {
    if was_inside {
        ceiling + margin
    } else {
        ceiling
    }
}

/// Hs/Tp coupling. `previous_hs` is `None` unless hysteresis applies.
fn check_waves(
    hs: f64,
    tp: f64,
    phase: Phase,
    rules: &RuleSet,
    previous_hs: Option<f64>,
    reasons: &mut Vec<Reason>,
) {
    let sea = &rules.sea;
    let margin = rules.hysteresis.hs_m;

    // the no-go ceiling fails at `>`, the family one at `>=`
    let no_go = widen(sea.no_go_hs_m, margin, previous_hs.is_some_and(|p| p <= sea.no_go_hs_m));
    if hs > no_go {
        reasons.push(Reason::HsNoGo);
    }
    let family = widen(
        sea.family_max_hs_m,
        margin,
        previous_hs.is_some_and(|p| p < sea.family_max_hs_m),
    );
    if hs >= family {
        reasons.push(Reason::HsFamilyMax);
    }

    // Very low waves at a sheltered anchorage cannot be dangerously steep.
    if phase == Phase::Anchor && hs <= rules.anchor.ease_max_hs_m {
        if tp < rules.anchor.ease_min_tp_s {
            reasons.push(Reason::TpShort);
        }
        return;
    }

    let matrix = &sea.period_matrix;
    let short_period = if hs < matrix.low_band_max_hs_m {
        tp < matrix.low_band_min_tp_s
    } else if hs < sea.family_max_hs_m {
        tp < matrix.mid_band_min_tp_s
    } else {
        false
    };
    if short_period {
        reasons.push(Reason::TpShort);
    }

    for clause in &sea.short_steep {
        if hs >= clause.min_hs_m && tp <= clause.max_tp_s {
            let reason = if clause.hard {
                Reason::ShortSteepHard
            } else {
                Reason::ShortSteep
            };
            if !reasons.contains(&reason) {
                reasons.push(reason);
            }
        }
    }
}
