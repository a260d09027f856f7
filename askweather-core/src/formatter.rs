//! Turning a weather fact into a short friendly reply.
//!
//! The language model only rephrases a fact that was already computed; it never
//! sees anything it could extract data from besides the question itself.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use thiserror::Error;
use tracing::{debug, info};

use crate::{Config, WeatherFact, provider::{http_client, truncate_body}};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("request to chat completions endpoint failed")]
    Transport(#[source] reqwest::Error),

    #[error("chat completions request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse chat completions JSON")]
    Decode(#[source] serde_json::Error),

    #[error("chat completions response contained no message")]
    EmptyReply,
}

#[async_trait]
pub trait ReplyFormatter: Send + Sync + Debug {
    /// Rephrase `fact` as an answer to `query`.
    async fn format_reply(&self, query: &str, fact: &WeatherFact) -> Result<String, FormatError>;
}

/// Returns the fact unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFormatter;

#[async_trait]
impl ReplyFormatter for PassthroughFormatter {
    async fn format_reply(&self, _query: &str, fact: &WeatherFact) -> Result<String, FormatError> {
        Ok(fact.text.clone())
    }
}

/// Formatter backed by an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct ChatFormatter {
    api_key: String,
    model: String,
    base_url: String,
    http: Client,
}

impl fmt::Debug for ChatFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatFormatter")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ChatFormatter {
    pub fn new(api_key: String) -> reqwest::Result<Self> {
        Ok(Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: http_client()?,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub fn build_prompt(query: &str, fact: &str) -> String {
    format!(
        "User Question: {query}\n\
         Weather Data: {fact}\n\
         Write a detailed, well-structured explanation in 5-7 lines.\n\
         Guidelines:\n\
         - Start with a clear summary sentence.\n\
         - Explain temperature, sky condition, and comfort level.\n\
         - Mention whether it is suitable for outdoor activities if relevant.\n\
         - Keep the tone informative and friendly.\n\
         - Do NOT repeat the question verbatim.\n"
    )
}

#[async_trait]
impl ReplyFormatter for ChatFormatter {
    async fn format_reply(&self, query: &str, fact: &WeatherFact) -> Result<String, FormatError> {
        let prompt = build_prompt(query, &fact.text);
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: &prompt }],
        };

        debug!(model = %self.model, outcome = ?fact.outcome, "requesting reply formatting");

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(FormatError::Transport)?;

        let status = res.status();
        let body = res.text().await.map_err(FormatError::Transport)?;

        if !status.is_success() {
            return Err(FormatError::Status { status, body: truncate_body(&body) });
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(FormatError::Decode)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(FormatError::EmptyReply)
    }
}

/// Pick the formatter for a config; `raw` forces plain facts.
pub fn formatter_from_config(config: &Config, raw: bool) -> anyhow::Result<Box<dyn ReplyFormatter>> {
    formatter_from_parts(config, config.formatter_api_key(), raw)
}

/// Like [`formatter_from_config`], with the API key already resolved.
pub fn formatter_from_parts(
    config: &Config,
    api_key: Option<String>,
    raw: bool,
) -> anyhow::Result<Box<dyn ReplyFormatter>> {
    if raw {
        return Ok(Box::new(PassthroughFormatter));
    }

    let Some(api_key) = api_key else {
        info!("no formatter API key configured, replying with plain weather facts");
        return Ok(Box::new(PassthroughFormatter));
    };

    let mut formatter = ChatFormatter::new(api_key)?;
    if let Some(model) = &config.formatter.model {
        formatter = formatter.with_model(model);
    }
    if let Some(base_url) = &config.formatter.base_url {
        formatter = formatter.with_base_url(base_url);
    }

    Ok(Box::new(formatter))
}
