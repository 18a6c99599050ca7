//! The per-site spot file written by the collector and read by the detector.
//!
//! ```text
//! {
//!   "meta":   { "name": .., "slug": .., "timezone": .., "utc_offset_seconds": .., .. },
//!   "time":   ["2025-09-03T06:00", ..],
//!   "models": { "ecmwf_ifs04": { "wind_speed_10m": [..], .. }, .. },
//!   "waves":  { "source": "open_meteo_marine", "hs": [..], "tp": [..] }
//! }
//! ```

use crate::error::{FableError, Result};
use crate::sector::OnshoreSectors;
use crate::series::{HourlySeries, ModelSeries, SeriesSite, WaveSeries};
use crate::site::Site;
use chrono::FixedOffset;
use fable_utils::hours::{parse_local, LOCAL_HOUR_FORMAT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File names in a spot directory that are not spot files.
pub const NON_SPOT_JSON: [&str; 7] = [
    "index.json",
    "index.spots.json",
    "catalog.json",
    "status.json",
    "rules.normalized.json",
    "windows.json",
    "windows.collector.json",
];

/// True for a `.json` file that is not a spot file: one of [`NON_SPOT_JSON`]
/// or of the configured `extra` names.
pub fn is_non_spot(file_name: &str, extra: &[String]) -> bool {
    NON_SPOT_JSON.contains(&file_name) || extra.iter().any(|e| e == file_name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotMeta {
    pub name: String,
    pub slug: String,
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    #[serde(default)]
    pub utc_offset_seconds: Option<i32>,
    #[serde(default)]
    pub shelter_bonus_radius_km: f64,
    #[serde(default)]
    pub onshore_sectors: OnshoreSectors,
    pub generated_at: String,
    /// Provider name -> endpoint, for provenance
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelArrays {
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_gusts_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_direction_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<i32>>,
    #[serde(default)]
    pub visibility_km: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveArrays {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub hs: Vec<Option<f64>>,
    #[serde(default)]
    pub tp: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotFile {
    pub meta: SpotMeta,
    pub time: Vec<String>,
    #[serde(default)]
    pub models: BTreeMap<String, ModelArrays>,
    #[serde(default)]
    pub waves: WaveArrays,
}

impl SpotFile {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Build a spot file from a site and its aligned series.
    pub fn from_series(
        site: &Site,
        series: &HourlySeries,
        generated_at: String,
        sources: BTreeMap<String, String>,
    ) -> Self {
        let models = series
            .models()
            .iter()
            .map(|m| {
                (
                    m.name.clone(),
                    ModelArrays {
                        wind_speed_10m: m.wind_speed.clone(),
                        wind_gusts_10m: m.wind_gust.clone(),
                        wind_direction_10m: m.wind_direction.clone(),
                        weather_code: m.weather_code.clone(),
                        visibility_km: m.visibility_km.clone(),
                    },
                )
            })
            .collect();
        let waves = series.waves();
        SpotFile {
            meta: SpotMeta {
                name: site.name.clone(),
                slug: site.slug.clone(),
                lat: site.latitude,
                lon: site.longitude,
                timezone: site.timezone.clone(),
                utc_offset_seconds: series.site().utc_offset.map(|o| o.local_minus_utc()),
                shelter_bonus_radius_km: site.shelter_bonus_radius_km,
                onshore_sectors: site.onshore_sectors.clone(),
                generated_at,
                sources,
            },
            time: series
                .times()
                .iter()
                .map(|t| t.format(LOCAL_HOUR_FORMAT).to_string())
                .collect(),
            models,
            waves: WaveArrays {
                source: waves.source.clone(),
                hs: waves.hs.clone(),
                tp: waves.tp.clone(),
            },
        }
    }

    /// Convert into a validated series. Misaligned arrays are an error.
    pub fn into_series(self) -> Result<HourlySeries> {
        let times = self
            .time
            .iter()
            .map(|t| parse_local(t).map_err(|e| FableError::TimeParse(format!("{t}: {e}"))))
            .collect::<Result<Vec<_>>>()?;
        let site = SeriesSite {
            slug: self.meta.slug,
            name: self.meta.name,
            onshore_sectors: self.meta.onshore_sectors,
            utc_offset: self.meta.utc_offset_seconds.and_then(FixedOffset::east_opt),
        };
        let models = self
            .models
            .into_iter()
            .map(|(name, arrays)| ModelSeries {
                name,
                wind_speed: arrays.wind_speed_10m,
                wind_gust: arrays.wind_gusts_10m,
                wind_direction: arrays.wind_direction_10m,
                weather_code: arrays.weather_code,
                visibility_km: arrays.visibility_km,
            })
            .collect();
        let waves = WaveSeries {
            source: self.waves.source,
            hs: self.waves.hs,
            tp: self.waves.tp,
        };
        HourlySeries::new(site, times, models, waves)
    }
}
