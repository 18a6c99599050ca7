//! Worst-value-wins reduction of all models at one hour.

use fable_core::series::{HourlySeries, WindTriplet};

/// The most adverse plausible reading of one hour across every model.
///
/// Wind fields are `None` when no model has a complete speed/gust/direction
/// reading at that hour.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HourMetrics {
    pub max_speed: Option<f64>,
    pub min_speed: Option<f64>,
    pub max_gust: Option<f64>,
    /// max - min sustained speed, only with two or more contributing models
    pub spread: Option<f64>,
    /// Direction of the first contributing model
    pub direction: Option<f64>,
    /// Any contributing model blows from an onshore sector
    pub onshore: bool,
    pub min_visibility_km: Option<f64>,
    pub weather_codes: Vec<i32>,
    pub hs: Option<f64>,
    pub tp: Option<f64>,
    /// Models with a complete wind reading at this hour
    pub model_count: usize,
}

impl HourMetrics {
    pub fn has_wind(&self) -> bool {
        self.model_count > 0
    }
}

/// Reduce the series at `idx` to one [`HourMetrics`].
///
/// A model contributes wind only when speed, gust and direction are all
/// present; a partial reading is left out entirely rather than mixed with
/// another model's values. Visibility and weather codes are taken from every
/// model that reports them. An index past the end of the series yields empty
/// metrics, which classify as failing.
pub fn extract(series: &HourlySeries, idx: usize) -> HourMetrics {
    let winds: Vec<WindTriplet> = series
        .models()
        .iter()
        .filter_map(|m| m.wind_at(idx))
        .collect();

    let max_speed = winds.iter().map(|w| w.speed).reduce(f64::max);
    let min_speed = winds.iter().map(|w| w.speed).reduce(f64::min);
    let spread = match (winds.len(), max_speed, min_speed) {
        (n, Some(hi), Some(lo)) if n >= 2 => Some(hi - lo),
        _ => None,
    };
    let sectors = &series.site().onshore_sectors;

    let mut weather_codes: Vec<i32> = series
        .models()
        .iter()
        .filter_map(|m| m.weather_code_at(idx))
        .collect();
    weather_codes.sort_unstable();
    weather_codes.dedup();

    HourMetrics {
        max_speed,
        min_speed,
        max_gust: winds.iter().map(|w| w.gust).reduce(f64::max),
        spread,
        direction: winds.first().map(|w| w.direction),
        onshore: winds.iter().any(|w| sectors.contains(w.direction)),
        min_visibility_km: series
            .models()
            .iter()
            .filter_map(|m| m.visibility_at(idx))
            .reduce(f64::min),
        weather_codes,
        hs: series.waves().hs_at(idx),
        tp: series.waves().tp_at(idx),
        model_count: winds.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{hours, model, series_with, waves};

    #[test]
    fn test_worst_value_wins_across_models() {
        let a = model("ecmwf", 1, 12.0, 18.0, 200.0);
        let b = model("icon", 1, 16.0, 21.0, 220.0);
        let mut c = model("gfs", 1, 9.0, 25.0, 90.0);
        c.visibility_km = vec![Some(4.0)];
        c.weather_code = vec![Some(61)];
        let s = series_with(hours(1), vec![a, b, c], waves(1, 0.3, 6.0), "30-150");

        let m = extract(&s, 0);
        assert_eq!(m.model_count, 3);
        assert_eq!(m.max_speed, Some(16.0));
        assert_eq!(m.min_speed, Some(9.0));
        assert_eq!(m.max_gust, Some(25.0));
        assert_eq!(m.spread, Some(7.0));
        assert_eq!(m.direction, Some(200.0));
        assert!(m.onshore, "gfs blows from 90 degrees");
        assert_eq!(m.min_visibility_km, Some(4.0));
        assert_eq!(m.weather_codes, vec![1, 61]);
        assert_eq!(m.hs, Some(0.3));
        assert_eq!(m.tp, Some(6.0));
    }

    #[test]
    fn test_partial_model_is_excluded() {
        let a = model("ecmwf", 1, 12.0, 14.0, 200.0);
        let mut b = model("icon", 1, 30.0, 40.0, 220.0);
        b.wind_gust = vec![None];
        let s = series_with(hours(1), vec![a, b], waves(1, 0.3, 6.0), "");

        let m = extract(&s, 0);
        assert_eq!(m.model_count, 1);
        assert_eq!(m.max_speed, Some(12.0));
        assert_eq!(m.max_gust, Some(14.0));
        assert_eq!(m.spread, None);
    }

    #[test]
    fn test_no_complete_model_leaves_wind_absent() {
        let mut a = model("ecmwf", 1, 12.0, 14.0, 200.0);
        a.wind_direction = vec![None];
        let s = series_with(hours(1), vec![a], waves(1, 0.3, 6.0), "");

        let m = extract(&s, 0);
        assert!(!m.has_wind());
        assert_eq!(m.max_speed, None);
        assert_eq!(m.max_gust, None);
        assert_eq!(m.direction, None);
        assert!(!m.onshore);
        // non-wind fields still come through
        assert_eq!(m.min_visibility_km, Some(20.0));
    }

    #[test]
    fn test_index_out_of_range() {
        let s = series_with(hours(2), vec![model("om", 2, 10.0, 12.0, 0.0)], waves(2, 0.3, 6.0), "");
        let m = extract(&s, 5);
        assert!(!m.has_wind());
        assert_eq!(m.hs, None);
    }
}
