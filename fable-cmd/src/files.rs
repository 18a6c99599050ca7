//! Reading configuration and spot files, and writing outputs in place.

use anyhow::Context;
use fable_core::rules::{LoadedRules, RuleSet};
use fable_core::series::HourlySeries;
use fable_core::spot::{is_non_spot, SpotFile};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;

/// Write `contents` next to `path` and rename it over the target, so readers
/// never see a partial file.
pub async fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, contents)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

/// Load the rules file, or the defaults when no path is given. A missing
/// file is an error; bad content is not.
pub async fn load_rules(path: Option<&str>) -> anyhow::Result<LoadedRules> {
    match path {
        None => {
            info!("No rules file given, using defaults");
            Ok(LoadedRules {
                rules: RuleSet::default(),
                issues: Vec::new(),
            })
        }
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading rules {path}"))?;
            Ok(RuleSet::from_json_lenient(&text))
        }
    }
}

/// Load every spot file in `dir`, keyed by slug.
///
/// The built-in non-spot names and the `extra` ones from the rules are
/// ignored; unreadable or misaligned spot files are skipped with a warning.
pub async fn load_spots(
    dir: &Path,
    extra: &[String],
) -> anyhow::Result<BTreeMap<String, HourlySeries>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("listing {}", dir.display()))?;
    let mut spots = BTreeMap::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.ends_with(".json") || is_non_spot(file_name, extra) {
            continue;
        }
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        match SpotFile::from_json(&text).and_then(SpotFile::into_series) {
            Ok(series) => {
                spots.insert(series.slug().to_string(), series);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(spots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SPOT: &str = r#"{
  "meta": {"name": "Gammarth Port", "slug": "gammarth-port", "lat": 36.92, "lon": 10.28,
           "timezone": "Africa/Tunis", "generated_at": "2025-09-03T05:10:00+01:00"},
  "time": ["2025-09-03T06:00", "2025-09-03T07:00"],
  "models": {"ecmwf_ifs04": {"wind_speed_10m": [10.0, 11.0], "wind_gusts_10m": [12.0, 14.0],
                             "wind_direction_10m": [200, 210], "weather_code": [1, 3],
                             "visibility_km": [20.0, 18.5]}},
  "waves": {"source": "open_meteo_marine", "hs": [0.3, 0.35], "tp": [6.1, 6.0]}
}"#;

    #[tokio::test]
    async fn test_write_atomic_replaces_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("windows.json");
        write_atomic(&path, "first").await.unwrap();
        write_atomic(&path, "second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!temp_dir.path().join("windows.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_spots_skips_non_spot_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("gammarth-port.json"), SPOT).unwrap();
        std::fs::write(dir.join("windows.json"), "{}").unwrap();
        std::fs::write(dir.join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.join("notes.txt"), "hello").unwrap();

        let spots = load_spots(dir, &[]).await.unwrap();
        assert_eq!(spots.len(), 1);
        assert_eq!(spots["gammarth-port"].len(), 2);
    }

    #[tokio::test]
    async fn test_load_spots_honours_configured_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("gammarth-port.json"), SPOT).unwrap();
        // a spot-shaped file that the rules declare as an artifact
        std::fs::write(dir.join("report.json"), SPOT.replace("gammarth-port", "report")).unwrap();

        assert_eq!(load_spots(dir, &[]).await.unwrap().len(), 2);

        let loaded = RuleSet::from_json_lenient(r#"{"artifacts": {"non_spot_json": ["report.json"]}}"#);
        assert!(loaded.issues.is_empty());
        let spots = load_spots(dir, &loaded.rules.artifacts.non_spot_json)
            .await
            .unwrap();
        assert_eq!(spots.len(), 1);
        assert!(spots.contains_key("gammarth-port"));
    }

    #[tokio::test]
    async fn test_load_rules_defaults_and_lenient() {
        let loaded = load_rules(None).await.unwrap();
        assert_eq!(loaded.rules, RuleSet::default());

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        std::fs::write(&path, r#"{"wind": {"family_max_kmh": 18}, "sea": "oops"}"#).unwrap();
        let loaded = load_rules(path.to_str()).await.unwrap();
        assert_eq!(loaded.rules.wind.family_max_kmh, 18.0);
        assert_eq!(loaded.rules.sea, RuleSet::default().sea);
        assert_eq!(loaded.issues.len(), 1);

        let missing = temp_dir.path().join("missing.json");
        assert!(load_rules(missing.to_str()).await.is_err());
    }
}
