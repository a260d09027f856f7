use anyhow::{Context, Result};
use tracing::{error, info};

use crate::{
    Config,
    formatter::{ReplyFormatter, formatter_from_config},
    intent::{self, IntentError},
    provider::{WeatherProvider, default_provider_from_config},
};

/// Reply when no city could be found in the question.
pub const CITY_PROMPT: &str = "Please mention a city name in your question.";

/// Reply when anything unexpected goes wrong while answering.
pub const SERVER_ERROR_REPLY: &str = "Server error occurred.";

/// Answers weather questions: extract the intent, fetch the fact, phrase the reply.
#[derive(Debug)]
pub struct Assistant {
    provider: Box<dyn WeatherProvider>,
    formatter: Box<dyn ReplyFormatter>,
}

impl Assistant {
    pub fn new(provider: Box<dyn WeatherProvider>, formatter: Box<dyn ReplyFormatter>) -> Self {
        Self { provider, formatter }
    }

    /// Build from config; `raw` skips the language model and replies with the bare fact.
    pub fn from_config(config: &Config, raw: bool) -> Result<Self> {
        let provider = default_provider_from_config(config)?;
        let formatter = formatter_from_config(config, raw)?;
        Ok(Self::new(provider, formatter))
    }

    /// Answer a question, surfacing internal failures to the caller.
    pub async fn answer(&self, query: &str) -> Result<String> {
        let intent = match intent::resolve(query) {
            Ok(intent) => intent,
            Err(IntentError::CityNotFound) => {
                info!("no city in question");
                return Ok(CITY_PROMPT.to_string());
            }
        };

        let fact = self.provider.fetch(&intent).await;
        info!(
            city = %intent.city,
            mode = %intent.mode,
            day_offset = intent.day_offset,
            condition = %intent.condition,
            outcome = ?fact.outcome,
            "fetched weather fact"
        );
        if !fact.is_found() {
            info!(city = %intent.city, "no weather data, formatting the explanation instead");
        }

        let reply = self
            .formatter
            .format_reply(query, &fact)
            .await
            .context("Failed to format weather reply")?;

        Ok(reply)
    }

    /// Answer a question; any failure becomes [`SERVER_ERROR_REPLY`].
    pub async fn reply(&self, query: &str) -> String {
        match self.answer(query).await {
            Ok(reply) => reply,
            Err(err) => {
                error!("failed to answer weather question: {err:#}");
                SERVER_ERROR_REPLY.to_string()
            }
        }
    }
}
