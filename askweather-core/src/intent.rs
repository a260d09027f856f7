//! Extraction of an [`Intent`] from a free-text weather question.
//!
//! Everything here is pure and deterministic. Each extractor walks an ordered
//! table of rules and the first rule that matches wins, so the tables below are
//! also the priority order.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

use crate::model::{Condition, Intent, Mode, TemporalIntent};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error("no city found in query")]
    CityNotFound,
}

static PREPOSITION_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:in|of|at|for)\s+([A-Za-z ]+?)(?:\s+city|\s+today|\s+yesterday|\s+tomorrow|\s+after|\s+before|\s+next|\s+last|\?|$)",
    )
    .expect("preposition pattern is valid")
});

static WEATHER_ADJACENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)weather\s+(?:in|of)?\s*([A-Za-z ]+)|([A-Za-z ]+)\s+weather")
        .expect("weather adjacency pattern is valid")
});

static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("capitalized run pattern is valid")
});

type CityStrategy = fn(&str) -> Option<&str>;

/// City strategies in decreasing order of confidence.
const CITY_STRATEGIES: [(&str, CityStrategy); 3] = [
    ("preposition", city_after_preposition),
    ("weather-adjacent", city_next_to_weather),
    ("capitalized", longest_capitalized_run),
];

/// `in Pune`, `of New Delhi`, `for Mumbai city?`.
fn city_after_preposition(query: &str) -> Option<&str> {
    PREPOSITION_PHRASE.captures(query)?.get(1).map(|m| m.as_str())
}

/// `weather Pune`, `weather in Pune`, `Bangalore weather`.
fn city_next_to_weather(query: &str) -> Option<&str> {
    let caps = WEATHER_ADJACENT.captures(query)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Longest run of capitalized words; the first one found wins a tie.
fn longest_capitalized_run(query: &str) -> Option<&str> {
    CAPITALIZED_RUN
        .find_iter(query)
        .map(|m| m.as_str())
        .fold(None, |best: Option<&str>, run| match best {
            Some(b) if b.chars().count() >= run.chars().count() => Some(b),
            _ => Some(run),
        })
}

/// Extract the city a question is about, if any.
///
/// Returned text is trimmed but otherwise taken verbatim from the query, so a
/// trailing filler word can survive (`"weather in Pune please"` yields
/// `"Pune please"`).
pub fn extract_city(query: &str) -> Option<String> {
    let query = query.trim();

    CITY_STRATEGIES.iter().find_map(|(name, strategy)| {
        let city = strategy(query)?.trim();
        if city.is_empty() {
            return None;
        }
        debug!(strategy = name, city, "extracted city");
        Some(city.to_string())
    })
}

#[derive(Debug)]
enum Trigger {
    /// First capture group is a count of `days_per_unit`-day units.
    Count { pattern: Regex, days_per_unit: i64 },
    /// Any of the substrings, mapped to a fixed offset.
    Keywords { keywords: &'static [&'static str], day_offset: i64 },
}

/// One entry of the temporal rule table.
#[derive(Debug)]
pub struct TemporalRule {
    name: &'static str,
    mode: Mode,
    trigger: Trigger,
}

impl TemporalRule {
    fn count(name: &'static str, pattern: &str, mode: Mode, days_per_unit: i64) -> Self {
        let pattern = Regex::new(pattern).expect("temporal count pattern is valid");
        Self { name, mode, trigger: Trigger::Count { pattern, days_per_unit } }
    }

    fn keywords(
        name: &'static str,
        keywords: &'static [&'static str],
        mode: Mode,
        day_offset: i64,
    ) -> Self {
        Self { name, mode, trigger: Trigger::Keywords { keywords, day_offset } }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply the rule to an already lowercased query.
    ///
    /// A count that does not fit the day offset makes the rule not match.
    pub fn apply(&self, lowered: &str) -> Option<TemporalIntent> {
        match &self.trigger {
            Trigger::Count { pattern, days_per_unit } => {
                let count: i64 = pattern.captures(lowered)?.get(1)?.as_str().parse().ok()?;
                let days = count.checked_mul(*days_per_unit)?;
                let day_offset = if self.mode == Mode::Past { -days } else { days };
                Some(TemporalIntent::new(self.mode, day_offset))
            }
            Trigger::Keywords { keywords, day_offset } => keywords
                .iter()
                .any(|k| lowered.contains(k))
                .then_some(TemporalIntent::new(self.mode, *day_offset)),
        }
    }
}

const DAYS_PER_YEAR: i64 = 365;

static TEMPORAL_RULES: LazyLock<Vec<TemporalRule>> = LazyLock::new(|| {
    use Mode::{Current, Future, Past};

    vec![
        TemporalRule::count("after-days", r"after\s+([0-9]+)\s+day", Future, 1),
        TemporalRule::count("before-days", r"before\s+([0-9]+)\s+day", Past, 1),
        TemporalRule::count("days-ago", r"([0-9]+)\s+days?\s+ago", Past, 1),
        TemporalRule::keywords("next-week", &["next week"], Future, 7),
        TemporalRule::keywords("last-week", &["last week"], Past, -7),
        TemporalRule::count("after-years", r"after\s+([0-9]+)\s+year", Future, DAYS_PER_YEAR),
        TemporalRule::count("before-years", r"before\s+([0-9]+)\s+year", Past, DAYS_PER_YEAR),
        TemporalRule::count("years-ago", r"([0-9]+)\s+years?\s+ago", Past, DAYS_PER_YEAR),
        TemporalRule::keywords("yesterday", &["yesterday"], Past, -1),
        TemporalRule::keywords("tomorrow", &["tomorrow"], Future, 1),
        TemporalRule::keywords("today", &["today", "now"], Current, 0),
        TemporalRule::keywords("past", &["past", "previous"], Past, -1),
        TemporalRule::keywords("future", &["future", "upcoming"], Future, 1),
    ]
});

/// The temporal rules in the order [`detect_mode`] tries them.
pub fn temporal_rules() -> &'static [TemporalRule] {
    &TEMPORAL_RULES
}

/// Detect whether a question is about now, the past or the future, and how far.
///
/// Falls back to [`TemporalIntent::default`] (current, 0) when nothing matches.
pub fn detect_mode(query: &str) -> TemporalIntent {
    let lowered = query.to_lowercase();

    TEMPORAL_RULES
        .iter()
        .find_map(|rule| {
            let temporal = rule.apply(&lowered)?;
            debug!(
                rule = rule.name,
                mode = %temporal.mode,
                day_offset = temporal.day_offset,
                "matched temporal rule"
            );
            Some(temporal)
        })
        .unwrap_or_default()
}

/// Condition keywords in priority order.
pub const CONDITION_RULES: &[(Condition, &[&str])] = &[
    (Condition::Rain, &["rain"]),
    (Condition::Temperature, &["temperature", "temp"]),
    (Condition::Humidity, &["humidity"]),
    (Condition::Wind, &["wind"]),
];

/// Detect which weather attribute is asked about, defaulting to a summary.
pub fn detect_condition(query: &str) -> Condition {
    let lowered = query.to_lowercase();

    CONDITION_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(condition, _)| *condition)
        .unwrap_or_default()
}

/// Build the full intent for a question.
///
/// Time and condition detection only run once a city has been found.
pub fn resolve(query: &str) -> Result<Intent, IntentError> {
    let city = extract_city(query).ok_or(IntentError::CityNotFound)?;
    let intent = Intent::new(city, detect_mode(query), detect_condition(query));
    debug!(?intent, "resolved intent");
    Ok(intent)
}
