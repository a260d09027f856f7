use crate::{
    Config, Intent, Observation, WeatherFact,
    provider::{weatherapi::WeatherApiProvider, wttr::WttrProvider},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::{convert::TryFrom, fmt::Debug, time::Duration};
use thiserror::Error;
use tracing::warn;

pub mod weatherapi;
pub mod wttr;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Wttr,
    WeatherApi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Wttr => "wttr",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Wttr, ProviderId::WeatherApi]
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::WeatherApi)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "wttr" => Ok(ProviderId::Wttr),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: wttr, weatherapi."
            )),
        }
    }
}

/// Why a provider could not produce an [`Observation`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {provider} failed")]
    Transport {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} request failed with status {status}: {body}")]
    Status { provider: ProviderId, status: StatusCode, body: String },

    #[error("failed to parse {provider} JSON")]
    Decode {
        provider: ProviderId,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} response has a missing or malformed `{field}`")]
    Malformed { provider: ProviderId, field: &'static str },

    #[error("no data available for day offset {day_offset}")]
    OutOfRange { day_offset: i64 },
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Look up the raw observation for an intent.
    async fn observe(&self, intent: &Intent) -> Result<Observation, FetchError>;

    /// Look up an intent and render it as a fact.
    ///
    /// Never fails: upstream problems become an `Unavailable` fact and a
    /// missing day becomes an `OutOfRange` fact.
    async fn fetch(&self, intent: &Intent) -> WeatherFact {
        match self.observe(intent).await {
            Ok(observation) => {
                WeatherFact::found(observation.describe(&intent.city, intent.condition))
            }
            Err(FetchError::OutOfRange { day_offset }) => {
                warn!(city = %intent.city, day_offset, "requested day is outside provider window");
                WeatherFact::out_of_range()
            }
            Err(err) => {
                warn!(city = %intent.city, error = %err, "weather lookup failed");
                WeatherFact::unavailable(&intent.city)
            }
        }
    }
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::Wttr => Box::new(WttrProvider::new()?),
        ProviderId::WeatherApi => {
            let api_key = config.provider_api_key(id).ok_or_else(|| {
                anyhow::anyhow!(
                    "No API key configured for provider '{id}'.\n\
                         Hint: run `askweather configure {id}` and enter your API key."
                )
            })?;
            Box::new(WeatherApiProvider::new(api_key.to_owned())?)
        }
    };

    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}

pub(crate) fn http_client() -> reqwest::Result<Client> {
    Client::builder().timeout(HTTP_TIMEOUT).build()
}

/// Keep error bodies short enough for a log line.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Condition, CurrentConditions, FactOutcome, Mode, TemporalIntent};

    #[derive(Debug)]
    struct Canned(fn() -> Result<Observation, FetchError>);

    #[async_trait]
    impl WeatherProvider for Canned {
        async fn observe(&self, _intent: &Intent) -> Result<Observation, FetchError> {
            (self.0)()
        }
    }

    fn intent() -> Intent {
        Intent::new("Pune", TemporalIntent::new(Mode::Current, 0), Condition::Humidity)
    }

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("darksky").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(ProviderId::WeatherApi, &cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider"));
    }

    #[test]
    fn wttr_needs_no_api_key() {
        let cfg = Config::default();
        assert!(!ProviderId::Wttr.requires_api_key());
        assert!(provider_from_config(ProviderId::Wttr, &cfg).is_ok());
    }

    #[test]
    fn default_provider_from_config_falls_back_to_wttr() {
        let cfg = Config::default();
        assert!(default_provider_from_config(&cfg).is_ok());
    }

    #[test]
    fn default_provider_from_config_works_when_set_and_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "KEY".to_string());

        let provider = default_provider_from_config(&cfg);
        assert!(provider.is_ok());
    }

    #[tokio::test]
    async fn fetch_renders_found_observation() {
        let provider = Canned(|| {
            Ok(Observation::Current(CurrentConditions {
                temperature_c: 20.0,
                description: "Clear".to_string(),
                humidity_pct: 55,
                wind_kph: 3.0,
            }))
        });

        let fact = provider.fetch(&intent()).await;
        assert_eq!(fact, WeatherFact::found("The humidity in Pune is 55%."));
    }

    #[tokio::test]
    async fn fetch_maps_out_of_range() {
        let provider = Canned(|| Err(FetchError::OutOfRange { day_offset: -1 }));

        let fact = provider.fetch(&intent()).await;
        assert_eq!(fact.outcome, FactOutcome::OutOfRange);
        assert_eq!(fact.text, "Requested date is out of available range.");
    }

    #[tokio::test]
    async fn fetch_maps_upstream_failure() {
        let provider = Canned(|| {
            Err(FetchError::Status {
                provider: ProviderId::Wttr,
                status: StatusCode::NOT_FOUND,
                body: "Unknown location".to_string(),
            })
        });

        let fact = provider.fetch(&intent()).await;
        assert_eq!(fact, WeatherFact::unavailable("Pune"));
        assert!(!fact.is_found());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        assert_eq!(truncate_body("short"), "short");

        let long = "é".repeat(250);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
    }
}
