use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

use crate::{
    model::{CurrentConditions, DaySummary, Intent, Mode, Observation},
    provider::{FetchError, ProviderId, http_client, truncate_body},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://wttr.in";
const PROVIDER: ProviderId = ProviderId::Wttr;

/// Keyless provider backed by wttr.in's JSON report.
///
/// The report holds current conditions plus a short run of daily forecasts
/// starting today, so past days are never available.
#[derive(Debug, Clone)]
pub struct WttrProvider {
    base_url: String,
    http: Client,
}

impl WttrProvider {
    pub fn new() -> reqwest::Result<Self> {
        Ok(Self { base_url: DEFAULT_BASE_URL.to_string(), http: http_client()? })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_report(&self, city: &str) -> Result<WttrReport, FetchError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), city);

        let res = self
            .http
            .get(&url)
            .query(&[("format", "j1")])
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
}

#[derive(Debug, Deserialize)]
struct WttrText {
    value: String,
}

#[derive(Debug, Deserialize)]
struct WttrCurrent {
    #[serde(rename = "temp_C")]
    temp_c: String,
    humidity: String,
    #[serde(rename = "windspeedKmph")]
    windspeed_kmph: String,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<WttrText>,
}

#[derive(Debug, Deserialize)]
struct WttrHour {
    chanceofrain: String,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<WttrText>,
}

#[derive(Debug, Deserialize)]
struct WttrDay {
    date: String,
    #[serde(rename = "avgtempC")]
    avgtemp_c: String,
    #[serde(default)]
    hourly: Vec<WttrHour>,
}

#[derive(Debug, Deserialize)]
struct WttrReport {
    #[serde(default)]
    current_condition: Vec<WttrCurrent>,
    #[serde(default)]
    weather: Vec<WttrDay>,
}

fn parse_field<T: FromStr>(raw: &str, field: &'static str) -> Result<T, FetchError> {
    raw.trim().parse().map_err(|_| FetchError::Malformed { provider: PROVIDER, field })
}

fn first_description(descs: &[WttrText]) -> String {
    descs.first().map(|d| d.value.trim().to_string()).unwrap_or_else(|| "Unknown".to_string())
}

impl WttrCurrent {
    fn to_observation(&self) -> Result<Observation, FetchError> {
        Ok(Observation::Current(CurrentConditions {
            temperature_c: parse_field(&self.temp_c, "temp_C")?,
            description: first_description(&self.weather_desc),
            humidity_pct: parse_field(&self.humidity, "humidity")?,
            wind_kph: parse_field(&self.windspeed_kmph, "windspeedKmph")?,
        }))
    }
}

impl WttrDay {
    /// Summarize a day from its first hourly slot, the way wttr's own report leads with it.
    fn to_observation(&self) -> Result<Observation, FetchError> {
        let first_hour = self
            .hourly
            .first()
            .ok_or(FetchError::Malformed { provider: PROVIDER, field: "hourly" })?;

        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| FetchError::Malformed { provider: PROVIDER, field: "date" })?;

        Ok(Observation::Day(DaySummary {
            date,
            avg_temperature_c: parse_field(&self.avgtemp_c, "avgtempC")?,
            description: first_description(&first_hour.weather_desc),
            chance_of_rain_pct: parse_field(&first_hour.chanceofrain, "chanceofrain")?,
        }))
    }
}

#[async_trait]
impl WeatherProvider for WttrProvider {
    async fn observe(&self, intent: &Intent) -> Result<Observation, FetchError> {
        let report = self.fetch_report(&intent.city).await?;

        match intent.mode {
            Mode::Current => report
                .current_condition
                .first()
                .ok_or(FetchError::Malformed { provider: PROVIDER, field: "current_condition" })?
                .to_observation(),
            Mode::Past | Mode::Future => {
                let day_offset = intent.day_offset;
                let day = usize::try_from(day_offset)
                    .ok()
                    .and_then(|index| report.weather.get(index))
                    .ok_or(FetchError::OutOfRange { day_offset })?;

                debug!(city = %intent.city, date = %day.date, "selected wttr day");
                day.to_observation()
            }
        }
    }
}
