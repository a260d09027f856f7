//! Core library for the `askweather` CLI.
//!
//! This crate defines:
//! - Intent extraction from free-text weather questions
//! - Abstraction over weather providers and the facts they produce
//! - Reply formatting through a language model
//! - Configuration & credentials handling
//!
//! [`Assistant`] ties these together; it is used by `askweather-cli`, but can
//! also be reused by other binaries or services.

pub mod assistant;
pub mod config;
pub mod formatter;
pub mod intent;
pub mod model;
pub mod provider;

pub use assistant::{Assistant, CITY_PROMPT, SERVER_ERROR_REPLY};
pub use config::{Config, FormatterConfig, ProviderConfig};
pub use formatter::{ChatFormatter, FormatError, PassthroughFormatter, ReplyFormatter};
pub use intent::{IntentError, detect_condition, detect_mode, extract_city, resolve};
pub use model::{
    Condition, CurrentConditions, DaySummary, FactOutcome, Intent, Mode, Observation,
    TemporalIntent, WeatherFact,
};
pub use provider::{FetchError, ProviderId, WeatherProvider};
