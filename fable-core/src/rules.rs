//! The classification rule set.
//!
//! A [`RuleSet`] is loaded once per run and handed by reference to every
//! classification call. Every key is optional: anything the rules file leaves
//! out, or gets wrong, falls back to the documented default below. Overrides
//! are merged key by key, so one bad value only costs that value.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Sustained wind thresholds, km/h.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindRules {
    /// Baseline "Family" ceiling: sustained wind must stay below this
    pub family_max_kmh: f64,
    /// No-go from this sustained wind upward
    pub no_go_min_kmh: f64,
    /// Onshore wind above this speed fails the hour
    pub onshore_degrade_kmh: f64,
}

impl Default for WindRules {
    fn default() -> Self {
        Self {
            family_max_kmh: 20.0,
            no_go_min_kmh: 25.0,
            onshore_degrade_kmh: 20.0,
        }
    }
}

/// A "short and steep sea" clause: Hs at or above `min_hs_m` with a period
/// at or below `max_tp_s` fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortSteepRule {
    pub min_hs_m: f64,
    pub max_tp_s: f64,
    /// Both kinds fail the hour; `hard` only reports it as
    /// `short_steep_hard` instead of `short_steep`
    #[serde(default)]
    pub hard: bool,
}

/// Minimum wave period by height band, for transit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodMatrix {
    /// Upper bound of the low-height band, m
    pub low_band_max_hs_m: f64,
    /// Minimum period below `low_band_max_hs_m`, s
    pub low_band_min_tp_s: f64,
    /// Minimum period from `low_band_max_hs_m` to the family Hs ceiling, s
    pub mid_band_min_tp_s: f64,
}

impl Default for PeriodMatrix {
    fn default() -> Self {
        Self {
            low_band_max_hs_m: 0.4,
            low_band_min_tp_s: 4.0,
            mid_band_min_tp_s: 4.5,
        }
    }
}

/// Sea-state thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeaRules {
    /// Baseline "Family" ceiling: Hs must stay below this, m
    pub family_max_hs_m: f64,
    /// Absolute no-go above this Hs, m
    pub no_go_hs_m: f64,
    pub period_matrix: PeriodMatrix,
    pub short_steep: Vec<ShortSteepRule>,
}

impl Default for SeaRules {
    fn default() -> Self {
        Self {
            family_max_hs_m: 0.5,
            no_go_hs_m: 0.8,
            period_matrix: PeriodMatrix::default(),
            short_steep: vec![
                ShortSteepRule {
                    min_hs_m: 0.5,
                    max_tp_s: 6.0,
                    hard: false,
                },
                ShortSteepRule {
                    min_hs_m: 0.6,
                    max_tp_s: 5.0,
                    hard: true,
                },
            ],
        }
    }
}

/// Gust and squall overrides, km/h.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GustRules {
    /// Hard no-go from this gust upward
    pub no_go_min_kmh: f64,
    /// Squall when gust minus sustained wind reaches this, in transit
    pub squall_delta_kmh: f64,
}

impl Default for GustRules {
    fn default() -> Self {
        Self {
            no_go_min_kmh: 30.0,
            squall_delta_kmh: 15.0,
        }
    }
}

/// Tolerances while moored at a sheltered destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorRules {
    pub gust_max_kmh: f64,
    pub squall_delta_max_kmh: f64,
    pub sustained_max_kmh: f64,
    /// At or below this Hs the period requirement eases, m
    pub ease_max_hs_m: f64,
    /// Minimum period once eased, s
    pub ease_min_tp_s: f64,
}

impl Default for AnchorRules {
    fn default() -> Self {
        Self {
            gust_max_kmh: 34.0,
            squall_delta_max_kmh: 20.0,
            sustained_max_kmh: 30.0,
            ease_max_hs_m: 0.35,
            ease_min_tp_s: 3.8,
        }
    }
}

/// One-sided threshold widening for metrics that were fine the hour before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HysteresisRules {
    pub enabled: bool,
    pub wind_kmh: f64,
    pub hs_m: f64,
}

impl Default for HysteresisRules {
    fn default() -> Self {
        Self {
            enabled: false,
            wind_kmh: 1.0,
            hs_m: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityRules {
    pub min_km: f64,
}

impl Default for VisibilityRules {
    fn default() -> Self {
        Self { min_km: 5.0 }
    }
}

/// WMO weather codes that force a no-go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StormRules {
    pub codes: Vec<i32>,
}

impl Default for StormRules {
    fn default() -> Self {
        Self {
            codes: vec![95, 96, 99],
        }
    }
}

/// Confidence grading bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceRules {
    /// Fewer contributing models than this in any hour forces Low
    pub min_models: usize,
    pub high_max_wind_spread_kmh: f64,
    pub high_max_hs_spread_m: f64,
    pub medium_max_wind_spread_kmh: f64,
    /// Independent wave providers behind the series; High needs two
    pub wave_sources: usize,
}

impl Default for ConfidenceRules {
    fn default() -> Self {
        Self {
            min_models: 2,
            high_max_wind_spread_kmh: 5.0,
            high_max_hs_spread_m: 0.2,
            medium_max_wind_spread_kmh: 8.0,
            wave_sources: 1,
        }
    }
}

/// Local hours of day `[start, end)` a "family" window must stay within.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyHours {
    pub start: u32,
    pub end: u32,
}

impl Default for FamilyHours {
    fn default() -> Self {
        Self { start: 8, end: 21 }
    }
}

/// Window length bounds, in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowRules {
    pub min_hours: usize,
    pub max_hours: usize,
}

impl Default for WindowRules {
    fn default() -> Self {
        Self {
            min_hours: 4,
            max_hours: 6,
        }
    }
}

/// Output files that live next to the spot files but are not spots.
///
/// Added to the built-in list in `spot::NON_SPOT_JSON`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactRules {
    pub non_spot_json: Vec<String>,
}

/// The full parameter tree. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub wind: WindRules,
    pub sea: SeaRules,
    pub gusts: GustRules,
    pub anchor: AnchorRules,
    pub hysteresis: HysteresisRules,
    pub visibility: VisibilityRules,
    pub storm: StormRules,
    pub confidence: ConfidenceRules,
    pub family_hours: FamilyHours,
    pub windows: WindowRules,
    pub artifacts: ArtifactRules,
}

/// Something wrong in a rules file, and the default that replaced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleIssue {
    pub section: String,
    pub message: String,
}

/// A rule set together with the problems found while loading it.
#[derive(Debug, Clone)]
pub struct LoadedRules {
    pub rules: RuleSet,
    pub issues: Vec<RuleIssue>,
}

const SECTIONS: [&str; 11] = [
    "wind",
    "sea",
    "gusts",
    "anchor",
    "hysteresis",
    "visibility",
    "storm",
    "confidence",
    "family_hours",
    "windows",
    "artifacts",
];

fn issue(section: &str, message: String) -> RuleIssue {
    RuleIssue {
        section: section.to_string(),
        message,
    }
}

/// Deserialize one section by laying its keys over the defaults.
///
/// Each override is kept only if the section still deserializes with it, so
/// a bad value falls back to its own default. Keys the section does not have
/// are reported and ignored.
fn section<T: Serialize + DeserializeOwned + Default>(
    root: &Map<String, Value>,
    name: &str,
    issues: &mut Vec<RuleIssue>,
) -> T {
    let Some(value) = root.get(name) else {
        return T::default();
    };
    let Value::Object(overrides) = value else {
        issues.push(issue(name, format!("expected an object, found {value}; using defaults")));
        return T::default();
    };
    let mut merged = match serde_json::to_value(T::default()) {
        Ok(merged) => merged,
        Err(e) => {
            issues.push(issue(name, format!("{e}; using defaults")));
            return T::default();
        }
    };
    merge_keys::<T>(&mut merged, overrides, "", name, issues);
    serde_json::from_value(merged).unwrap_or_else(|e| {
        issues.push(issue(name, format!("{e}; using defaults")));
        T::default()
    })
}

/// Apply `overrides` at JSON pointer `at` inside `merged`, recursing into
/// nested tables.
fn merge_keys<T: DeserializeOwned>(
    merged: &mut Value,
    overrides: &Map<String, Value>,
    at: &str,
    name: &str,
    issues: &mut Vec<RuleIssue>,
) {
    for (key, value) in overrides {
        let pointer = format!("{at}/{key}");
        let path = pointer[1..].replace('/', ".");
        let existing = if key.contains(['/', '~']) {
            None
        } else {
            merged.pointer(&pointer).map(Value::is_object)
        };
        match (existing, value) {
            (None, _) => {
                issues.push(issue(name, format!("unknown key '{path}' ignored")));
            }
            (Some(true), Value::Object(nested)) => {
                merge_keys::<T>(merged, nested, &pointer, name, issues);
            }
            (Some(_), _) => {
                let mut candidate = merged.clone();
                if let Some(slot) = candidate.pointer_mut(&pointer) {
                    *slot = value.clone();
                }
                match serde_json::from_value::<T>(candidate.clone()) {
                    Ok(_) => *merged = candidate,
                    Err(e) => {
                        issues.push(issue(name, format!("key '{path}': {e}; using default")));
                    }
                }
            }
        }
    }
}

impl RuleSet {
    /// Load a rule set from JSON, never failing.
    ///
    /// Unparseable JSON yields all defaults. Inside a section, a value of the
    /// wrong type keeps that key's default and an unknown key is ignored; a
    /// section that fails the sanity checks yields that section's defaults.
    /// Every substitution is logged and returned as an issue.
    pub fn from_json_lenient(text: &str) -> LoadedRules {
        let mut issues = Vec::new();
        let root = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                issues.push(RuleIssue {
                    section: "<root>".to_string(),
                    message: "rules document is not an object; using defaults".to_string(),
                });
                Map::new()
            }
            Err(e) => {
                issues.push(RuleIssue {
                    section: "<root>".to_string(),
                    message: format!("{e}; using defaults"),
                });
                Map::new()
            }
        };
        for key in root.keys().filter(|k| !SECTIONS.contains(&k.as_str())) {
            issues.push(issue(key, "unknown section ignored".to_string()));
        }

        let mut rules = RuleSet {
            wind: section(&root, "wind", &mut issues),
            sea: section(&root, "sea", &mut issues),
            gusts: section(&root, "gusts", &mut issues),
            anchor: section(&root, "anchor", &mut issues),
            hysteresis: section(&root, "hysteresis", &mut issues),
            visibility: section(&root, "visibility", &mut issues),
            storm: section(&root, "storm", &mut issues),
            confidence: section(&root, "confidence", &mut issues),
            family_hours: section(&root, "family_hours", &mut issues),
            windows: section(&root, "windows", &mut issues),
            artifacts: section(&root, "artifacts", &mut issues),
        };
        issues.extend(rules.sanitize());

        for issue in &issues {
            warn!("rules: [{}] {}", issue.section, issue.message);
        }
        LoadedRules { rules, issues }
    }

    /// Reset sections whose values cannot be meant, returning what was reset.
    fn sanitize(&mut self) -> Vec<RuleIssue> {
        let mut issues = Vec::new();
        let mut reset = |section: &str, message: &str| {
            issues.push(RuleIssue {
                section: section.to_string(),
                message: format!("{message}; using defaults"),
            });
        };

        let non_negative = |values: &[f64]| values.iter().all(|v| v.is_finite() && *v >= 0.0);

        if !non_negative(&[
            self.wind.family_max_kmh,
            self.wind.no_go_min_kmh,
            self.wind.onshore_degrade_kmh,
        ]) {
            reset("wind", "thresholds must be non-negative");
            self.wind = WindRules::default();
        }
        if !non_negative(&[
            self.sea.family_max_hs_m,
            self.sea.no_go_hs_m,
            self.sea.period_matrix.low_band_max_hs_m,
            self.sea.period_matrix.low_band_min_tp_s,
            self.sea.period_matrix.mid_band_min_tp_s,
        ]) {
            reset("sea", "thresholds must be non-negative");
            self.sea = SeaRules::default();
        }
        if !non_negative(&[self.gusts.no_go_min_kmh, self.gusts.squall_delta_kmh]) {
            reset("gusts", "thresholds must be non-negative");
            self.gusts = GustRules::default();
        }
        if !non_negative(&[
            self.anchor.gust_max_kmh,
            self.anchor.squall_delta_max_kmh,
            self.anchor.sustained_max_kmh,
            self.anchor.ease_max_hs_m,
            self.anchor.ease_min_tp_s,
        ]) {
            reset("anchor", "thresholds must be non-negative");
            self.anchor = AnchorRules::default();
        }
        if !non_negative(&[self.hysteresis.wind_kmh, self.hysteresis.hs_m]) {
            reset("hysteresis", "margins must be non-negative");
            self.hysteresis = HysteresisRules::default();
        }
        if !non_negative(&[self.visibility.min_km]) {
            reset("visibility", "minimum must be non-negative");
            self.visibility = VisibilityRules::default();
        }
        if self.family_hours.start >= self.family_hours.end || self.family_hours.end > 24 {
            reset("family_hours", "expected 0 <= start < end <= 24");
            self.family_hours = FamilyHours::default();
        }
        if self.windows.min_hours == 0 || self.windows.min_hours > self.windows.max_hours {
            reset("windows", "expected 0 < min_hours <= max_hours");
            self.windows = WindowRules::default();
        }
        if !non_negative(&[
            self.confidence.high_max_wind_spread_kmh,
            self.confidence.high_max_hs_spread_m,
            self.confidence.medium_max_wind_spread_kmh,
        ]) {
            reset("confidence", "spread bands must be non-negative");
            self.confidence = ConfidenceRules::default();
        }

        let names = std::mem::take(&mut self.artifacts.non_spot_json);
        let listed = names.len();
        self.artifacts.non_spot_json = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| n.ends_with(".json"))
            .map(str::to_string)
            .collect();
        let dropped = listed - self.artifacts.non_spot_json.len();
        if dropped > 0 {
            issues.push(issue(
                "artifacts",
                format!("{dropped} non_spot_json entries are not .json file names; ignored"),
            ));
        }
        issues
    }

    /// SHA-256 (hex) of the canonical JSON of this rule set.
    ///
    /// Identifies the exact thresholds a run was classified under.
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}
