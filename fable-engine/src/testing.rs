//! Synthetic series builders shared by the engine tests.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use fable_core::series::{HourlySeries, ModelSeries, SeriesSite, WaveSeries};

/// 2025-09-03 at `hour` local, `hour` may run past midnight.
pub fn at(hour: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 9, 3)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + TimeDelta::hours(hour)
}

/// `n` consecutive hours starting 08:00.
pub fn hours(n: usize) -> Vec<NaiveDateTime> {
    hours_from(8, n)
}

pub fn hours_from(start: i64, n: usize) -> Vec<NaiveDateTime> {
    (0..n as i64).map(|h| at(start + h)).collect()
}

/// A model with constant wind, good visibility and fair weather.
pub fn model(name: &str, n: usize, speed: f64, gust: f64, dir: f64) -> ModelSeries {
    ModelSeries {
        name: name.to_string(),
        wind_speed: vec![Some(speed); n],
        wind_gust: vec![Some(gust); n],
        wind_direction: vec![Some(dir); n],
        weather_code: vec![Some(1); n],
        visibility_km: vec![Some(20.0); n],
    }
}

pub fn waves(n: usize, hs: f64, tp: f64) -> WaveSeries {
    WaveSeries {
        source: "test".to_string(),
        hs: vec![Some(hs); n],
        tp: vec![Some(tp); n],
    }
}

pub fn series_with(
    times: Vec<NaiveDateTime>,
    models: Vec<ModelSeries>,
    waves: WaveSeries,
    sectors: &str,
) -> HourlySeries {
    let site = SeriesSite {
        slug: "test-site".to_string(),
        name: "Test Site".to_string(),
        onshore_sectors: sectors.parse().unwrap(),
        utc_offset: None,
    };
    HourlySeries::new(site, times, models, waves).unwrap()
}

/// Two agreeing models, wind 15 gust 18 offshore, Hs 0.3 Tp 8.
pub fn calm_models(n: usize) -> Vec<ModelSeries> {
    vec![
        model("ecmwf_ifs04", n, 15.0, 18.0, 200.0),
        model("icon_seamless", n, 15.0, 18.0, 200.0),
    ]
}

pub fn calm(n: usize) -> HourlySeries {
    series_with(hours(n), calm_models(n), waves(n, 0.3, 8.0), "")
}
