//! Typed hourly forecast series for one site.
//!
//! Every array in a series is index-aligned to the shared time axis; a
//! missing value is an explicit `None`, never a dropped position. The
//! alignment is checked once, when the series is built.

use crate::error::{FableError, Result};
use crate::sector::OnshoreSectors;
use chrono::{FixedOffset, NaiveDateTime};
use std::collections::HashMap;
use std::hash::Hash;

/// One weather model's hourly wind/visibility/weather forecast.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelSeries {
    /// Model identifier (e.g., "ecmwf_ifs04")
    pub name: String,
    /// Sustained wind speed at 10 m, km/h
    pub wind_speed: Vec<Option<f64>>,
    /// Wind gusts at 10 m, km/h
    pub wind_gust: Vec<Option<f64>>,
    /// Wind direction at 10 m, degrees
    pub wind_direction: Vec<Option<f64>>,
    /// WMO weather code
    pub weather_code: Vec<Option<i32>>,
    /// Visibility, km
    pub visibility_km: Vec<Option<f64>>,
}

/// A complete wind reading from one model at one hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindTriplet {
    pub speed: f64,
    pub gust: f64,
    pub direction: f64,
}

impl ModelSeries {
    /// Speed, gust and direction at `idx`, only when all three are present.
    pub fn wind_at(&self, idx: usize) -> Option<WindTriplet> {
        Some(WindTriplet {
            speed: value_at(&self.wind_speed, idx)?,
            gust: value_at(&self.wind_gust, idx)?,
            direction: value_at(&self.wind_direction, idx)?,
        })
    }

    pub fn visibility_at(&self, idx: usize) -> Option<f64> {
        value_at(&self.visibility_km, idx)
    }

    pub fn weather_code_at(&self, idx: usize) -> Option<i32> {
        value_at(&self.weather_code, idx)
    }

    fn arrays(&self) -> [(&'static str, usize); 5] {
        [
            ("wind_speed", self.wind_speed.len()),
            ("wind_gust", self.wind_gust.len()),
            ("wind_direction", self.wind_direction.len()),
            ("weather_code", self.weather_code.len()),
            ("visibility_km", self.visibility_km.len()),
        ]
    }
}

/// The single wave forecast of a site.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaveSeries {
    /// Provider of the wave data (e.g., "open_meteo_marine")
    pub source: String,
    /// Significant wave height, m
    pub hs: Vec<Option<f64>>,
    /// Wave period, s
    pub tp: Vec<Option<f64>>,
}

impl WaveSeries {
    /// A wave series with every value missing.
    pub fn unknown(source: &str, len: usize) -> Self {
        WaveSeries {
            source: source.to_string(),
            hs: vec![None; len],
            tp: vec![None; len],
        }
    }

    pub fn hs_at(&self, idx: usize) -> Option<f64> {
        value_at(&self.hs, idx)
    }

    pub fn tp_at(&self, idx: usize) -> Option<f64> {
        value_at(&self.tp, idx)
    }
}

/// Identity of the site a series belongs to, plus the site data the
/// classification needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesSite {
    pub slug: String,
    pub name: String,
    pub onshore_sectors: OnshoreSectors,
    /// Offset of the local time axis from UTC, when the provider reported it
    pub utc_offset: Option<FixedOffset>,
}

/// Hourly forecast for one site on a local-time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    site: SeriesSite,
    times: Vec<NaiveDateTime>,
    models: Vec<ModelSeries>,
    waves: WaveSeries,
}

impl HourlySeries {
    /// Build a series, checking that the time axis is strictly increasing and
    /// that every model and wave array has one value per timestamp.
    pub fn new(
        site: SeriesSite,
        times: Vec<NaiveDateTime>,
        models: Vec<ModelSeries>,
        waves: WaveSeries,
    ) -> Result<Self> {
        if let Some(index) = times.windows(2).position(|w| w[0] >= w[1]) {
            return Err(FableError::NonIncreasingTime { index: index + 1 });
        }
        let expected = times.len();
        for model in &models {
            for (array, found) in model.arrays() {
                if found != expected {
                    return Err(FableError::Misaligned {
                        name: format!("{}.{}", model.name, array),
                        expected,
                        found,
                    });
                }
            }
        }
        for (array, found) in [("waves.hs", waves.hs.len()), ("waves.tp", waves.tp.len())] {
            if found != expected {
                return Err(FableError::Misaligned {
                    name: array.to_string(),
                    expected,
                    found,
                });
            }
        }
        Ok(HourlySeries {
            site,
            times,
            models,
            waves,
        })
    }

    pub fn site(&self) -> &SeriesSite {
        &self.site
    }

    pub fn slug(&self) -> &str {
        &self.site.slug
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn time(&self, idx: usize) -> Option<NaiveDateTime> {
        self.times.get(idx).copied()
    }

    pub fn models(&self) -> &[ModelSeries] {
        &self.models
    }

    pub fn waves(&self) -> &WaveSeries {
        &self.waves
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Index of the hour with this timestamp, if the series has it.
    pub fn index_of(&self, t: &NaiveDateTime) -> Option<usize> {
        self.times.binary_search(t).ok()
    }

    /// True if at least one model has a complete wind reading at `idx`.
    pub fn has_wind(&self, idx: usize) -> bool {
        self.models.iter().any(|m| m.wind_at(idx).is_some())
    }
}

fn value_at<T: Copy>(values: &[Option<T>], idx: usize) -> Option<T> {
    values.get(idx).copied().flatten()
}

/// Re-index provider values onto a target time axis.
///
/// Timestamps of the axis the provider did not return, or returned without a
/// value, become `None`.
pub fn align_to_axis<T, K>(axis: &[K], times: &[K], values: &[Option<T>]) -> Vec<Option<T>>
where
    T: Copy,
    K: Eq + Hash,
{
    let by_time: HashMap<&K, Option<T>> = times
        .iter()
        .zip(values.iter().copied().chain(std::iter::repeat(None)))
        .collect();
    axis.iter()
        .map(|t| by_time.get(t).copied().flatten())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 3)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn model(name: &str, n: usize) -> ModelSeries {
        ModelSeries {
            name: name.to_string(),
            wind_speed: vec![Some(10.0); n],
            wind_gust: vec![Some(12.0); n],
            wind_direction: vec![Some(200.0); n],
            weather_code: vec![Some(1); n],
            visibility_km: vec![Some(20.0); n],
        }
    }

    fn waves(n: usize) -> WaveSeries {
        WaveSeries {
            source: "marine".to_string(),
            hs: vec![Some(0.3); n],
            tp: vec![Some(6.0); n],
        }
    }

    #[test]
    fn test_new_accepts_aligned_series_with_gaps() {
        let times = vec![at(6), at(7), at(9)];
        let series =
            HourlySeries::new(SeriesSite::default(), times, vec![model("om", 3)], waves(3)).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.index_of(&at(9)), Some(2));
        assert_eq!(series.index_of(&at(8)), None);
        assert!(series.has_wind(0));
    }

    #[test]
    fn test_new_rejects_misaligned_model() {
        let mut m = model("gfs", 3);
        m.wind_gust.pop();
        let err = HourlySeries::new(SeriesSite::default(), vec![at(6), at(7), at(8)], vec![m], waves(3))
            .unwrap_err();
        match err {
            FableError::Misaligned { name, expected, found } => {
                assert_eq!(name, "gfs.wind_gust");
                assert_eq!((expected, found), (3, 2));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_unsorted_axis() {
        let err = HourlySeries::new(SeriesSite::default(), vec![at(7), at(7)], vec![], waves(2))
            .unwrap_err();
        assert!(matches!(err, FableError::NonIncreasingTime { index: 1 }));
    }

    #[test]
    fn test_wind_triplet_requires_all_three() {
        let mut m = model("om", 2);
        m.wind_direction[1] = None;
        assert!(m.wind_at(0).is_some());
        assert!(m.wind_at(1).is_none());
        assert!(m.wind_at(5).is_none());
    }

    #[test]
    fn test_align_to_axis() {
        let axis = vec![at(6), at(7), at(8), at(9)];
        let times = vec![at(5), at(7), at(8)];
        let values = vec![Some(1.0), Some(2.0), None];
        let aligned = align_to_axis(&axis, &times, &values);
        assert_eq!(aligned, vec![None, Some(2.0), None, None]);
    }

    #[test]
    fn test_align_to_axis_short_values() {
        let axis = vec![at(6), at(7)];
        let times = vec![at(6), at(7)];
        let values = vec![Some(3.0)];
        assert_eq!(align_to_axis(&axis, &times, &values), vec![Some(3.0), None]);
    }
}
