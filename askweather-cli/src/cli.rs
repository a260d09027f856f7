use anyhow::Context;
use askweather_core::{Assistant, Config, ProviderId, detect_condition, detect_mode, extract_city};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode, Text};
use tracing::debug;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "askweather", version, about = "Ask about the weather in plain language")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a weather question, e.g. `askweather ask will it rain in Pune tomorrow?`
    Ask {
        /// The question; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Print the plain weather fact instead of a language-model reply.
        #[arg(long)]
        raw: bool,
    },

    /// Show what would be looked up for a question, without any network calls.
    Parse {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Configure a weather provider ("wttr", "weatherapi") or the reply "formatter".
    Configure {
        target: String,
    },

    /// Print the location of the config file.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Ask { query, raw } => {
                let query = query.join(" ");
                let config = Config::load()?;
                let assistant = Assistant::from_config(&config, raw)?;
                debug!(%query, raw, "answering question");

                println!("{}", assistant.reply(&query).await);
            }
            Command::Parse { query } => {
                let query = query.join(" ");
                let temporal = detect_mode(&query);
                let parsed = serde_json::json!({
                    "city": extract_city(&query),
                    "mode": temporal.mode,
                    "day_offset": temporal.day_offset,
                    "condition": detect_condition(&query),
                });

                println!("{}", serde_json::to_string_pretty(&parsed)?);
            }
            Command::Configure { target } => {
                let mut config = Config::load()?;

                if target.eq_ignore_ascii_case("formatter") {
                    configure_formatter(&mut config)?;
                } else {
                    configure_provider(&mut config, ProviderId::try_from(target.as_str())?)?;
                }

                config.save()?;
                println!("Saved configuration to {}", Config::config_file_path()?.display());
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
            }
        }

        Ok(())
    }
}

fn configure_provider(config: &mut Config, id: ProviderId) -> anyhow::Result<()> {
    let ask_key = needs_key_prompt(config, id, || {
        Confirm::new(&format!("Replace the existing {id} API key?"))
            .with_default(false)
            .prompt()
            .context("Failed to read answer")
    })?;

    if ask_key {
        let api_key = Password::new(&format!("API key for {id}:"))
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?;

        config.upsert_provider_api_key(id, api_key.trim().to_string());
    }

    let make_default = Confirm::new(&format!("Use {id} as the default provider?"))
        .with_default(true)
        .prompt()
        .context("Failed to read answer")?;

    if make_default {
        config.set_default_provider(id);
    }

    Ok(())
}

/// Keyless providers never prompt; a stored key is only replaced when `replace` says so.
fn needs_key_prompt(
    config: &Config,
    id: ProviderId,
    replace: impl FnOnce() -> anyhow::Result<bool>,
) -> anyhow::Result<bool> {
    if !id.requires_api_key() {
        return Ok(false);
    }
    if !config.is_provider_configured(id) {
        return Ok(true);
    }
    replace()
}

fn configure_formatter(config: &mut Config) -> anyhow::Result<()> {
    let api_key = Password::new("API key for the reply formatter (empty to disable):")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim();
    config.formatter.api_key = (!api_key.is_empty()).then(|| api_key.to_string());

    let current_model = config
        .formatter
        .model
        .clone()
        .unwrap_or_else(|| askweather_core::formatter::DEFAULT_MODEL.to_string());

    let model = Text::new("Model:")
        .with_default(&current_model)
        .prompt()
        .context("Failed to read model")?;

    config.formatter.model = Some(model.trim().to_string()).filter(|m| !m.is_empty());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_joins_words_and_accepts_raw() {
        let cli = Cli::try_parse_from(["askweather", "ask", "--raw", "rain", "in", "Pune?"]).unwrap();
        match cli.command {
            Command::Ask { query, raw } => {
                assert!(raw);
                assert_eq!(query.join(" "), "rain in Pune?");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn ask_requires_a_question() {
        assert!(Cli::try_parse_from(["askweather", "ask"]).is_err());
    }

    #[test]
    fn configure_takes_target() {
        let cli = Cli::try_parse_from(["askweather", "configure", "weatherapi"]).unwrap();
        assert!(matches!(cli.command, Command::Configure { target } if target == "weatherapi"));
    }

    #[test]
    fn keyless_provider_never_asks_for_a_key() {
        let cfg = Config::default();
        let ask = needs_key_prompt(&cfg, ProviderId::Wttr, || panic!("should not ask")).unwrap();
        assert!(!ask);
    }

    #[test]
    fn missing_key_is_requested_without_confirmation() {
        let cfg = Config::default();
        let ask = needs_key_prompt(&cfg, ProviderId::WeatherApi, || panic!("should not ask")).unwrap();
        assert!(ask);
    }

    #[test]
    fn stored_key_is_kept_unless_replacement_confirmed() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "KEY".to_string());

        assert!(!needs_key_prompt(&cfg, ProviderId::WeatherApi, || Ok(false)).unwrap());
        assert!(needs_key_prompt(&cfg, ProviderId::WeatherApi, || Ok(true)).unwrap());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
