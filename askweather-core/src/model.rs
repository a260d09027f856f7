use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which slice of time a question is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Current,
    Past,
    Future,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Current => "current",
            Mode::Past => "past",
            Mode::Future => "future",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single weather attribute a question asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    Summary,
    Rain,
    Temperature,
    Humidity,
    Wind,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Summary => "summary",
            Condition::Rain => "rain",
            Condition::Temperature => "temperature",
            Condition::Humidity => "humidity",
            Condition::Wind => "wind",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time intent of a question: the mode plus a signed day offset from today.
///
/// `day_offset` only selects a daily record when `mode` is not [`Mode::Current`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemporalIntent {
    pub mode: Mode,
    pub day_offset: i64,
}

impl TemporalIntent {
    pub const fn new(mode: Mode, day_offset: i64) -> Self {
        Self { mode, day_offset }
    }
}

/// Structured form of a weather question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub city: String,
    pub mode: Mode,
    pub day_offset: i64,
    pub condition: Condition,
}

impl Intent {
    pub fn new(city: impl Into<String>, temporal: TemporalIntent, condition: Condition) -> Self {
        Self {
            city: city.into(),
            mode: temporal.mode,
            day_offset: temporal.day_offset,
            condition,
        }
    }
}

/// Conditions observed right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub description: String,
    pub humidity_pct: u8,
    pub wind_kph: f64,
}

/// Aggregate for one calendar day, either historical or forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub avg_temperature_c: f64,
    pub description: String,
    pub chance_of_rain_pct: u8,
}

/// What a provider returned for an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    Current(CurrentConditions),
    Day(DaySummary),
}

impl Observation {
    /// Render the observation as a one-sentence fact about `condition` in `city`.
    pub fn describe(&self, city: &str, condition: Condition) -> String {
        match self {
            Observation::Current(now) => match condition {
                Condition::Temperature => {
                    format!("The current temperature in {city} is {}°C.", now.temperature_c)
                }
                Condition::Humidity => format!("The humidity in {city} is {}%.", now.humidity_pct),
                Condition::Wind => format!("The wind speed in {city} is {} km/h.", now.wind_kph),
                Condition::Rain => {
                    format!("Currently in {city}, the weather is {}.", now.description)
                }
                Condition::Summary => format!(
                    "Currently in {city}, it is {}°C with {}.",
                    now.temperature_c, now.description
                ),
            },
            Observation::Day(day) => {
                let date = day.date.format("%Y-%m-%d");
                match condition {
                    Condition::Rain => format!(
                        "On {date} in {city}, the chance of rain was/is {}%.",
                        day.chance_of_rain_pct
                    ),
                    Condition::Temperature => format!(
                        "On {date} in {city}, the average temperature was/is {}°C.",
                        day.avg_temperature_c
                    ),
                    _ => format!(
                        "Weather in {city} on {date}: {}°C with {}.",
                        day.avg_temperature_c, day.description
                    ),
                }
            }
        }
    }
}

/// How a weather lookup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactOutcome {
    Found,
    OutOfRange,
    Unavailable,
}

/// Human-readable result of a weather lookup, tagged with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherFact {
    pub text: String,
    pub outcome: FactOutcome,
}

impl WeatherFact {
    pub fn found(text: impl Into<String>) -> Self {
        Self { text: text.into(), outcome: FactOutcome::Found }
    }

    pub fn out_of_range() -> Self {
        Self {
            text: "Requested date is out of available range.".to_string(),
            outcome: FactOutcome::OutOfRange,
        }
    }

    pub fn unavailable(city: &str) -> Self {
        Self {
            text: format!("Unable to fetch weather data for {city}."),
            outcome: FactOutcome::Unavailable,
        }
    }

    pub fn is_found(&self) -> bool {
        self.outcome == FactOutcome::Found
    }
}
