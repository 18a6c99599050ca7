use crate::error::{FableError, Result};
use crate::series::{align_to_axis, ModelSeries, WaveSeries};
use chrono::NaiveDateTime;
use fable_utils::hours::parse_local;
use serde::Deserialize;
use std::collections::HashMap;

#[cfg(feature = "api")]
use crate::site::Site;
#[cfg(feature = "api")]
use chrono::NaiveDate;
#[cfg(feature = "api")]
use log::{info, warn};
#[cfg(feature = "api")]
use reqwest::{Client, StatusCode};
#[cfg(feature = "api")]
use std::time::Duration;

/// Open-Meteo hourly forecast endpoint (wind, weather code, visibility).
pub const FORECAST_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";

/// Open-Meteo marine endpoint (wave height and period).
pub const MARINE_ENDPOINT: &str = "https://marine-api.open-meteo.com/v1/marine";

/// Name recorded as the wave source of collected series.
pub const MARINE_SOURCE: &str = "open_meteo_marine";

/// Hourly variables requested from the forecast endpoint.
pub const FORECAST_VARIABLES: &str =
    "wind_speed_10m,wind_gusts_10m,wind_direction_10m,weather_code,visibility";

/// Hourly variables requested from the marine endpoint.
pub const MARINE_VARIABLES: &str = "wave_height,wave_period";

/// Weather models the forecast endpoint is queried for.
pub const VALID_MODELS: [&str; 3] = ["ecmwf_ifs04", "icon_seamless", "gfs_seamless"];

/// Expand a comma-separated model list, resolving the `default`, `fast` and
/// `robust` aliases. Order is preserved and duplicates are dropped.
pub fn expand_models(raw: &str) -> Result<Vec<String>> {
    let mut models: Vec<String> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let expanded: Vec<&str> = match part {
            "default" | "robust" => vec!["ecmwf_ifs04", "icon_seamless", "gfs_seamless"],
            "fast" => vec!["gfs_seamless", "icon_seamless"],
            other if VALID_MODELS.contains(&other) => vec![other],
            other => return Err(FableError::UnknownModel(other.to_string())),
        };
        for model in expanded {
            if !models.iter().any(|m| m == model) {
                models.push(model.to_string());
            }
        }
    }
    Ok(models)
}

/// The hourly block of an Open-Meteo response.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<String>,
    #[serde(flatten)]
    pub values: HashMap<String, Vec<Option<f64>>>,
}

/// An Open-Meteo response, reduced to what the collector uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub utc_offset_seconds: i32,
    #[serde(default)]
    pub hourly_units: HashMap<String, String>,
    pub hourly: HourlyBlock,
}

impl ProviderResponse {
    pub fn from_json(text: &str) -> Result<Self> {
        let response: ProviderResponse = serde_json::from_str(text)?;
        if response.hourly.time.is_empty() {
            return Err(FableError::ResponseParse("hourly.time is empty".to_string()));
        }
        Ok(response)
    }

    pub fn times(&self) -> Result<Vec<NaiveDateTime>> {
        self.hourly
            .time
            .iter()
            .map(|t| parse_local(t).map_err(|e| FableError::TimeParse(format!("{t}: {e}"))))
            .collect()
    }

    pub fn values(&self, key: &str) -> Vec<Option<f64>> {
        self.hourly.values.get(key).cloned().unwrap_or_default()
    }

    /// Visibility in km. Open-Meteo reports metres; values are converted when
    /// the units say so, or when any value is too large to be kilometres.
    pub fn visibility_km(&self) -> Vec<Option<f64>> {
        let raw = self.values("visibility");
        let in_metres = self
            .hourly_units
            .get("visibility")
            .map(|u| u.trim() == "m")
            .unwrap_or_else(|| raw.iter().flatten().any(|v| *v > 50.0));
        if in_metres {
            raw.into_iter().map(|v| v.map(|m| m / 1000.0)).collect()
        } else {
            raw
        }
    }

    /// Align this forecast-endpoint response onto `axis` as a model series.
    pub fn to_model_series(&self, name: &str, axis: &[NaiveDateTime]) -> Result<ModelSeries> {
        let times = self.times()?;
        let align = |values: Vec<Option<f64>>| align_to_axis(axis, &times, &values);
        let codes: Vec<Option<i32>> = self
            .values("weather_code")
            .into_iter()
            .map(|c| c.map(|v| v.round() as i32))
            .collect();
        Ok(ModelSeries {
            name: name.to_string(),
            wind_speed: align(self.values("wind_speed_10m")),
            wind_gust: align(self.values("wind_gusts_10m")),
            wind_direction: align(self.values("wind_direction_10m")),
            weather_code: align_to_axis(axis, &times, &codes),
            visibility_km: align(self.visibility_km()),
        })
    }

    /// Align this marine-endpoint response onto `axis` as the wave series.
    pub fn to_wave_series(&self, axis: &[NaiveDateTime]) -> Result<WaveSeries> {
        let times = self.times()?;
        Ok(WaveSeries {
            source: MARINE_SOURCE.to_string(),
            hs: align_to_axis(axis, &times, &self.values("wave_height")),
            tp: align_to_axis(axis, &times, &self.values("wave_period")),
        })
    }
}

/// Client for the Open-Meteo forecast and marine APIs with retry and
/// exponential backoff.
#[cfg(feature = "api")]
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    max_tries: u32,
    initial_backoff: Duration,
}

#[cfg(feature = "api")]
impl OpenMeteoClient {
    /// A client whose individual requests give up after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent("fable-collector/1.0")
            .build()?;
        Ok(OpenMeteoClient {
            client,
            max_tries: 3,
            initial_backoff: Duration::from_millis(1000),
        })
    }

    async fn get_with_retry(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<ProviderResponse> {
        let mut sleep_millis = self.initial_backoff.as_millis() as u64;
        let mut last_error = format!("no attempt made for {what}");

        for attempt in 1..=self.max_tries {
            match self.client.get(endpoint).query(query).send().await {
                Ok(response) => {
                    if response.status() != StatusCode::OK {
                        last_error = format!("bad response status {}", response.status());
                        warn!(
                            "Attempt {}/{}: Bad response status for {}: {}",
                            attempt,
                            self.max_tries,
                            what,
                            response.status()
                        );
                    } else {
                        match response.text().await {
                            Ok(body) => match ProviderResponse::from_json(&body) {
                                Ok(parsed) => return Ok(parsed),
                                Err(e) => {
                                    last_error = e.to_string();
                                    warn!(
                                        "Attempt {}/{}: Unusable response for {}: {}",
                                        attempt, self.max_tries, what, e
                                    );
                                }
                            },
                            Err(e) => {
                                last_error = e.to_string();
                                warn!(
                                    "Attempt {}/{}: Failed to read response body for {}: {}",
                                    attempt, self.max_tries, what, e
                                );
                            }
                        }
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        "Attempt {}/{}: Request failed for {}: {}",
                        attempt, self.max_tries, what, e
                    );
                }
            }

            if attempt < self.max_tries {
                info!(
                    "Sleeping for {} milliseconds before retry for {}",
                    sleep_millis, what
                );
                tokio::time::sleep(Duration::from_millis(sleep_millis)).await;
                sleep_millis *= 2;
            }
        }

        warn!("All attempts failed for {}", what);
        Err(FableError::ResponseParse(format!("{what}: {last_error}")))
    }

    fn base_query(
        site: &Site,
        timezone: &str,
        start: &NaiveDate,
        end: &NaiveDate,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", format!("{:.5}", site.latitude)),
            ("longitude", format!("{:.5}", site.longitude)),
            ("timezone", timezone.to_string()),
            ("timeformat", "iso8601".to_string()),
            ("start_date", start.format("%Y-%m-%d").to_string()),
            ("end_date", end.format("%Y-%m-%d").to_string()),
        ]
    }

    /// Hourly wind/weather forecast of one model, in km/h, local time.
    pub async fn fetch_model(
        &self,
        site: &Site,
        model: &str,
        timezone: &str,
        start: &NaiveDate,
        end: &NaiveDate,
    ) -> Result<ProviderResponse> {
        let mut query = Self::base_query(site, timezone, start, end);
        query.push(("hourly", FORECAST_VARIABLES.to_string()));
        query.push(("wind_speed_unit", "kmh".to_string()));
        query.push(("models", model.to_string()));
        let what = format!("{} [{}]", site.name, model);
        self.get_with_retry(FORECAST_ENDPOINT, &query, &what).await
    }

    /// Hourly wave height and period, local time.
    pub async fn fetch_marine(
        &self,
        site: &Site,
        timezone: &str,
        start: &NaiveDate,
        end: &NaiveDate,
    ) -> Result<ProviderResponse> {
        let mut query = Self::base_query(site, timezone, start, end);
        query.push(("hourly", MARINE_VARIABLES.to_string()));
        let what = format!("{} [marine]", site.name);
        self.get_with_retry(MARINE_ENDPOINT, &query, &what).await
    }
}
