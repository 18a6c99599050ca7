//! Window detection: greedy left-to-right scan of a destination series
//! against the home port.

use crate::classify::{classify, classify_after, Phase, CHECKS};
use crate::confidence::{score, Confidence};
use crate::metrics::extract;
use chrono::{FixedOffset, NaiveDateTime, TimeDelta};
use fable_core::rules::RuleSet;
use fable_core::series::HourlySeries;
use fable_utils::hours::{all_within_hours, format_local};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Family,
    OffHours,
}

/// How a window was admitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowProvenance {
    pub rules_digest: String,
    pub checks: Vec<String>,
    pub hysteresis: bool,
    /// Fewest complete wind models behind any destination hour
    pub min_models: usize,
    pub max_models: usize,
    pub phases: Vec<Phase>,
}

/// A Go window. `end` is exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub hours: usize,
    pub confidence: Confidence,
    pub category: Category,
    pub provenance: WindowProvenance,
}

/// Serialized form of a [`Window`], with local ISO-8601 timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct WindowRecord {
    pub start: String,
    pub end: String,
    pub hours: usize,
    pub confidence: Confidence,
    pub category: Category,
    pub provenance: WindowProvenance,
}

impl Window {
    pub fn to_record(&self, offset: Option<FixedOffset>) -> WindowRecord {
        WindowRecord {
            start: format_local(&self.start, offset),
            end: format_local(&self.end, offset),
            hours: self.hours,
            confidence: self.confidence,
            category: self.category,
            provenance: self.provenance.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DestinationWindows {
    pub dest_slug: String,
    pub dest_name: String,
    pub windows: Vec<WindowRecord>,
}

/// Detect windows for one destination and package them for output.
pub fn detect_destination(
    home: &HourlySeries,
    dest: &HourlySeries,
    rules: &RuleSet,
    min_hours: usize,
    max_hours: usize,
) -> DestinationWindows {
    let offset = dest.site().utc_offset;
    DestinationWindows {
        dest_slug: dest.slug().to_string(),
        dest_name: dest.site().name.clone(),
        windows: detect(home, dest, rules, min_hours, max_hours)
            .iter()
            .map(|w| w.to_record(offset))
            .collect(),
    }
}

/// Find non-overlapping Go windows of `min_hours..=max_hours` hours.
///
/// From each start hour that passes transit at both ends of the trip, the span
/// is grown one hour at a time from `min_hours`, re-validating it completely
/// at each length. Growth stops at the first length that fails; the longest
/// length that passed is admitted and the scan continues at its end.
pub fn detect(
    home: &HourlySeries,
    dest: &HourlySeries,
    rules: &RuleSet,
    min_hours: usize,
    max_hours: usize,
) -> Vec<Window> {
    if min_hours == 0 || min_hours > max_hours {
        warn!(
            "{}: invalid window bounds {}..={}, no windows",
            dest.slug(),
            min_hours,
            max_hours
        );
        return Vec::new();
    }

    let digest = rules.digest();
    let mut windows = Vec::new();
    let mut i = 0;
    while i < dest.len() {
        if !start_passes(home, dest, i, rules) {
            i += 1;
            continue;
        }

        let mut best = None;
        for len in min_hours..=max_hours {
            if i + len > dest.len() {
                break;
            }
            match check_span(home, dest, i, len, rules) {
                Some(span) => best = Some(span),
                None => break,
            }
        }

        match best {
            Some(span) => {
                let window = build_window(dest, i, span, rules, &digest);
                debug!(
                    "{}: admitted {} hours from {} ({})",
                    dest.slug(),
                    window.hours,
                    window.start,
                    window.confidence
                );
                i += window.hours;
                windows.push(window);
            }
            None => i += 1,
        }
    }
    windows
}

/// Transit check of the departure hour at both sites.
fn start_passes(home: &HourlySeries, dest: &HourlySeries, i: usize, rules: &RuleSet) -> bool {
    let Some(t) = dest.time(i) else {
        return false;
    };
    if !classify(&extract(dest, i), Phase::Transit, rules).ok {
        return false;
    }
    home.index_of(&t)
        .map(|h| classify(&extract(home, h), Phase::Transit, rules).ok)
        .unwrap_or(false)
}

struct Span {
    len: usize,
    phases: Vec<Phase>,
    min_models: usize,
    max_models: usize,
}

/// Validate the span `i..i + len`, returning `None` on the first failure.
fn check_span(
    home: &HourlySeries,
    dest: &HourlySeries,
    i: usize,
    len: usize,
    rules: &RuleSet,
) -> Option<Span> {
    let mut phases = Vec::with_capacity(len);
    let mut min_models = usize::MAX;
    let mut max_models = 0;
    let mut memory = None;
    let mut previous: Option<NaiveDateTime> = None;

    for k in 0..len {
        let idx = i + k;
        let t = dest.time(idx)?;
        if previous.is_some_and(|p| t - p != TimeDelta::hours(1)) {
            return None;
        }
        previous = Some(t);

        let phase = Phase::in_span(k, len);
        let metrics = extract(dest, idx);
        if !metrics.has_wind() {
            return None;
        }
        let verdict = classify_after(&metrics, phase, rules, memory);
        if !verdict.ok {
            return None;
        }
        memory = Some(verdict.memory);

        let h = home.index_of(&t)?;
        if !home.has_wind(h) {
            return None;
        }
        if phase == Phase::Transit && !classify(&extract(home, h), Phase::Transit, rules).ok {
            return None;
        }

        min_models = min_models.min(metrics.model_count);
        max_models = max_models.max(metrics.model_count);
        phases.push(phase);
    }

    Some(Span {
        len,
        phases,
        min_models,
        max_models,
    })
}

fn build_window(
    dest: &HourlySeries,
    i: usize,
    span: Span,
    rules: &RuleSet,
    digest: &str,
) -> Window {
    let times = &dest.times()[i..i + span.len];
    let start = times[0];
    let category = if all_within_hours(times, rules.family_hours.start, rules.family_hours.end) {
        Category::Family
    } else {
        Category::OffHours
    };
    Window {
        start,
        end: start + TimeDelta::hours(span.len as i64),
        hours: span.len,
        confidence: score(dest, i, i + span.len - 1, rules),
        category,
        provenance: WindowProvenance {
            rules_digest: digest.to_string(),
            checks: CHECKS.iter().map(|c| c.to_string()).collect(),
            hysteresis: rules.hysteresis.enabled,
            min_models: span.min_models,
            max_models: span.max_models,
            phases: span.phases,
        },
    }
}
