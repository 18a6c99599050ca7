//! Window detection over a directory of spot files.

use crate::files::{load_rules, load_spots, write_atomic};
use anyhow::{bail, Context};
use chrono::Utc;
use fable_core::series::HourlySeries;
use fable_engine::detect::{detect_destination, DestinationWindows};
use fable_engine::diagnostics::{diagnose, HourDiagnostic};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct DetectOptions {
    pub spots_dir: String,
    pub rules: Option<String>,
    pub home: Option<String>,
    pub out: Option<String>,
    pub min_hours: Option<usize>,
    pub max_hours: Option<usize>,
    pub diagnostics: bool,
}

#[derive(Debug, Serialize)]
pub struct DestinationReport {
    #[serde(flatten)]
    pub windows: DestinationWindows,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Vec<HourDiagnostic>>,
}

#[derive(Debug, Serialize)]
pub struct WindowsReport {
    pub generated_at: String,
    pub home_slug: String,
    pub rules_digest: String,
    pub min_hours: usize,
    pub max_hours: usize,
    pub windows: Vec<DestinationReport>,
}

pub async fn run_detect(options: &DetectOptions) -> anyhow::Result<()> {
    let loaded = load_rules(options.rules.as_deref()).await?;
    let rules = loaded.rules;
    let min_hours = options.min_hours.unwrap_or(rules.windows.min_hours);
    let max_hours = options.max_hours.unwrap_or(rules.windows.max_hours);
    if min_hours == 0 || min_hours > max_hours {
        bail!("Invalid window bounds: min_hours {min_hours}, max_hours {max_hours}");
    }

    let spots_dir = Path::new(&options.spots_dir);
    let mut spots = load_spots(spots_dir, &rules.artifacts.non_spot_json).await?;
    let home_slug = choose_home(&spots, options.home.as_deref())?;
    let home = spots
        .remove(&home_slug)
        .with_context(|| format!("home spot {home_slug} vanished"))?;
    info!(
        "Detecting windows from {} to {} destinations ({}..={} hours)",
        home_slug,
        spots.len(),
        min_hours,
        max_hours
    );

    let report = WindowsReport {
        generated_at: Utc::now().to_rfc3339(),
        home_slug,
        rules_digest: rules.digest(),
        min_hours,
        max_hours,
        windows: detect_all(home, spots, rules, min_hours, max_hours, options.diagnostics).await?,
    };
    let total: usize = report.windows.iter().map(|d| d.windows.windows.len()).sum();

    let out = options
        .out
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| spots_dir.join("windows.json"));
    write_atomic(&out, &serde_json::to_string_pretty(&report)?).await?;
    info!("Wrote {} windows to {}", total, out.display());
    Ok(())
}

/// Run detection for every destination on the blocking pool, one task per
/// destination. Results come back in slug order.
pub async fn detect_all(
    home: HourlySeries,
    destinations: BTreeMap<String, HourlySeries>,
    rules: fable_core::rules::RuleSet,
    min_hours: usize,
    max_hours: usize,
    diagnostics: bool,
) -> anyhow::Result<Vec<DestinationReport>> {
    let home = Arc::new(home);
    let rules = Arc::new(rules);
    let mut handles = Vec::with_capacity(destinations.len());
    for (_, dest) in destinations {
        let home = Arc::clone(&home);
        let rules = Arc::clone(&rules);
        handles.push(tokio::task::spawn_blocking(move || DestinationReport {
            windows: detect_destination(&home, &dest, &rules, min_hours, max_hours),
            diagnostics: diagnostics.then(|| diagnose(&home, &dest, &rules)),
        }));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        reports.push(handle.await.context("detection task panicked")?);
    }
    Ok(reports)
}

/// The requested home port, or the first spot by slug when it is missing.
pub fn choose_home(
    spots: &BTreeMap<String, HourlySeries>,
    requested: Option<&str>,
) -> anyhow::Result<String> {
    let Some(first) = spots.keys().next() else {
        bail!("No spot files found");
    };
    match requested {
        Some(slug) if spots.contains_key(slug) => Ok(slug.to_string()),
        Some(slug) => {
            warn!("Home spot {} not found, using {}", slug, first);
            Ok(first.clone())
        }
        None => {
            warn!("No home spot given, using {}", first);
            Ok(first.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
    use fable_core::rules::RuleSet;
    use fable_core::series::{ModelSeries, SeriesSite, WaveSeries};

    fn calm_spot(slug: &str, n: usize) -> HourlySeries {
        let start = NaiveDate::from_ymd_opt(2025, 9, 3)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let times: Vec<NaiveDateTime> = (0..n as i64).map(|h| start + TimeDelta::hours(h)).collect();
        let model = |name: &str| ModelSeries {
            name: name.to_string(),
            wind_speed: vec![Some(15.0); n],
            wind_gust: vec![Some(18.0); n],
            wind_direction: vec![Some(200.0); n],
            weather_code: vec![Some(1); n],
            visibility_km: vec![Some(20.0); n],
        };
        let site = SeriesSite {
            slug: slug.to_string(),
            name: slug.to_string(),
            ..SeriesSite::default()
        };
        let waves = WaveSeries {
            source: "open_meteo_marine".to_string(),
            hs: vec![Some(0.3); n],
            tp: vec![Some(8.0); n],
        };
        HourlySeries::new(site, times, vec![model("ecmwf_ifs04"), model("icon_seamless")], waves)
            .unwrap()
    }

    fn spots() -> BTreeMap<String, HourlySeries> {
        ["korbous", "gammarth-port", "sidi-bou-said"]
            .into_iter()
            .map(|s| (s.to_string(), calm_spot(s, 6)))
            .collect()
    }

    #[test]
    fn test_choose_home() {
        let spots = spots();
        assert_eq!(choose_home(&spots, Some("korbous")).unwrap(), "korbous");
        assert_eq!(choose_home(&spots, Some("tabarka")).unwrap(), "gammarth-port");
        assert_eq!(choose_home(&spots, None).unwrap(), "gammarth-port");
        assert!(choose_home(&BTreeMap::new(), None).is_err());
    }

    #[tokio::test]
    async fn test_detect_all_runs_every_destination() {
        let mut spots = spots();
        let home = spots.remove("gammarth-port").unwrap();
        let reports = detect_all(home, spots, RuleSet::default(), 4, 6, true)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].windows.dest_slug, "korbous");
        assert_eq!(reports[1].windows.dest_slug, "sidi-bou-said");
        for report in &reports {
            assert_eq!(report.windows.windows.len(), 1);
            assert_eq!(report.windows.windows[0].hours, 6);
            assert_eq!(report.diagnostics.as_ref().map(Vec::len), Some(6));
        }

        let json = serde_json::to_value(&reports[0]).unwrap();
        assert_eq!(json["dest_slug"], "korbous");
        assert_eq!(json["windows"][0]["start"], "2025-09-03T08:00:00");
    }

    #[tokio::test]
    async fn test_diagnostics_omitted_by_default() {
        let mut spots = spots();
        let home = spots.remove("korbous").unwrap();
        let reports = detect_all(home, spots, RuleSet::default(), 4, 6, false)
            .await
            .unwrap();
        let json = serde_json::to_value(&reports[0]).unwrap();
        assert!(json.get("diagnostics").is_none());
    }
}
