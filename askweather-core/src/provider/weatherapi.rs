use async_trait::async_trait;
use chrono::{Local, NaiveDate, TimeDelta};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use std::fmt;
use tracing::debug;

use crate::{
    model::{CurrentConditions, DaySummary, Intent, Mode, Observation},
    provider::{FetchError, ProviderId, http_client, truncate_body},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com/v1";
const PROVIDER: ProviderId = ProviderId::WeatherApi;

/// Longest forecast WeatherAPI.com serves, in days including today.
const MAX_FORECAST_DAYS: usize = 14;

#[derive(Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl fmt::Debug for WeatherApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherApiProvider")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> reqwest::Result<Self> {
        Ok(Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: http_client()? })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        city: &str,
        extra: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", city)])
            .query(extra)
            .send()
            .await
            .map_err(|source| FetchError::Transport { provider: PROVIDER, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| FetchError::Transport { provider: PROVIDER, source })?;

        if !status.is_success() {
            return Err(FetchError::Status { provider: PROVIDER, status, body: truncate_body(&body) });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode { provider: PROVIDER, source })
    }

    async fn fetch_current(&self, city: &str) -> Result<Observation, FetchError> {
        let parsed: WaCurrentResponse = self.get_json("current.json", city, &[]).await?;
        let current = parsed.current;

        Ok(Observation::Current(CurrentConditions {
            temperature_c: current.temp_c,
            description: current.condition.text,
            humidity_pct: current.humidity,
            wind_kph: current.wind_kph,
        }))
    }

    async fn fetch_forecast(&self, city: &str, day_offset: i64) -> Result<Observation, FetchError> {
        let index = usize::try_from(day_offset)
            .ok()
            .filter(|index| *index < MAX_FORECAST_DAYS)
            .ok_or(FetchError::OutOfRange { day_offset })?;

        let days = (index + 1).to_string();
        let parsed: WaForecastResponse =
            self.get_json("forecast.json", city, &[("days", days)]).await?;

        // Free plans return fewer days than requested.
        let day = parsed
            .forecast
            .forecastday
            .into_iter()
            .nth(index)
            .ok_or(FetchError::OutOfRange { day_offset })?;

        day.into_observation()
    }

    async fn fetch_history(&self, city: &str, day_offset: i64) -> Result<Observation, FetchError> {
        let date = date_from_today(day_offset)
            .filter(|date| *date >= history_start())
            .ok_or(FetchError::OutOfRange { day_offset })?;
        debug!(city, %date, "requesting weatherapi history");

        let parsed: WaForecastResponse = self
            .get_json("history.json", city, &[("dt", date.format("%Y-%m-%d").to_string())])
            .await?;

        let day = parsed
            .forecast
            .forecastday
            .into_iter()
            .next()
            .ok_or(FetchError::OutOfRange { day_offset })?;

        day.into_observation()
    }
}

/// Earliest day `history.json` serves.
fn history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn date_from_today(day_offset: i64) -> Option<NaiveDate> {
    let delta = TimeDelta::try_days(day_offset)?;
    Local::now().date_naive().checked_add_signed(delta)
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    humidity: u8,
    wind_kph: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaCurrentResponse {
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    avgtemp_c: f64,
    #[serde(default)]
    daily_chance_of_rain: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: String,
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    forecast: WaForecast,
}

impl WaForecastDay {
    fn into_observation(self) -> Result<Observation, FetchError> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| FetchError::Malformed { provider: PROVIDER, field: "date" })?;

        Ok(Observation::Day(DaySummary {
            date,
            avg_temperature_c: self.day.avgtemp_c,
            description: self.day.condition.text,
            chance_of_rain_pct: self.day.daily_chance_of_rain.clamp(0.0, 100.0).round() as u8,
        }))
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn observe(&self, intent: &Intent) -> Result<Observation, FetchError> {
        match intent.mode {
            Mode::Current => self.fetch_current(&intent.city).await,
            // future → forecast.json
            Mode::Future => self.fetch_forecast(&intent.city, intent.day_offset).await,
            // past → history.json
            Mode::Past => self.fetch_history(&intent.city, intent.day_offset).await,
        }
    }
}
