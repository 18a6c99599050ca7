use crate::metrics::extract;
use fable_core::rules::RuleSet;
use fable_core::series::HourlySeries;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far the models agree over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(s)
    }
}

/// Grade the destination hours `i0..=i1`.
///
/// Any hour backed by fewer than `confidence.min_models` complete models makes
/// the window `Low`. Otherwise the mean wind spread and the Hs range decide.
/// `High` is capped to `Medium` while only one wave source feeds the series.
pub fn score(dest: &HourlySeries, i0: usize, i1: usize, rules: &RuleSet) -> Confidence {
    let cfg = &rules.confidence;
    let mut spreads = Vec::new();
    let mut hs_values = Vec::new();
    let mut min_models = usize::MAX;

    for idx in i0..=i1 {
        let m = extract(dest, idx);
        min_models = min_models.min(m.model_count);
        if let Some(spread) = m.spread {
            spreads.push(spread);
        }
        if let Some(hs) = m.hs {
            hs_values.push(hs);
        }
    }

    if min_models == usize::MAX || min_models < cfg.min_models {
        return Confidence::Low;
    }

    let mean_spread = if spreads.is_empty() {
        0.0
    } else {
        spreads.iter().sum::<f64>() / spreads.len() as f64
    };
    let hs_spread = match (
        hs_values.iter().copied().reduce(f64::max),
        hs_values.iter().copied().reduce(f64::min),
    ) {
        (Some(hi), Some(lo)) => hi - lo,
        _ => 0.0,
    };

    let graded = if mean_spread < cfg.high_max_wind_spread_kmh && hs_spread < cfg.high_max_hs_spread_m
    {
        Confidence::High
    } else if mean_spread < cfg.medium_max_wind_spread_kmh {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    if graded == Confidence::High && cfg.wave_sources < 2 {
        Confidence::Medium
    } else {
        graded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{calm, calm_models, hours, model, series_with, waves};

    fn two_wave_sources() -> RuleSet {
        let mut rules = RuleSet::default();
        rules.confidence.wave_sources = 2;
        rules
    }

    #[test]
    fn test_single_wave_source_caps_high() {
        let s = calm(6);
        assert_eq!(score(&s, 0, 5, &RuleSet::default()), Confidence::Medium);
        assert_eq!(score(&s, 0, 5, &two_wave_sources()), Confidence::High);
    }

    #[test]
    fn test_single_model_hour_is_low() {
        let mut models = calm_models(6);
        models[1].wind_speed[3] = None;
        let s = series_with(hours(6), models, waves(6, 0.3, 8.0), "");
        assert_eq!(score(&s, 0, 5, &two_wave_sources()), Confidence::Low);
        // the same hour outside the scored range does not matter
        assert_eq!(score(&s, 0, 2, &two_wave_sources()), Confidence::High);
    }

    #[test]
    fn test_wind_spread_bands() {
        let rules = two_wave_sources();
        let medium = series_with(
            hours(4),
            vec![model("a", 4, 10.0, 12.0, 200.0), model("b", 4, 16.0, 18.0, 200.0)],
            waves(4, 0.3, 8.0),
            "",
        );
        assert_eq!(score(&medium, 0, 3, &rules), Confidence::Medium);

        let low = series_with(
            hours(4),
            vec![model("a", 4, 8.0, 10.0, 200.0), model("b", 4, 17.0, 19.0, 200.0)],
            waves(4, 0.3, 8.0),
            "",
        );
        assert_eq!(score(&low, 0, 3, &rules), Confidence::Low);
    }

    #[test]
    fn test_hs_range_blocks_high() {
        let mut w = waves(4, 0.2, 8.0);
        w.hs[2] = Some(0.45);
        let s = series_with(hours(4), calm_models(4), w, "");
        assert_eq!(score(&s, 0, 3, &two_wave_sources()), Confidence::Medium);
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        assert_eq!(Confidence::High.to_string(), "high");
    }
}
