//! Attribute predicates
//!
//! A predicate is a conjunction of `(attribute, matcher)` pairs evaluated
//! against [`Event::attribute`].

use regex::Regex;
use std::ops::RangeInclusive;

use crate::events::{AttrValue, Event};

/// Test applied to one attribute
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Equal, treating an id and its decimal string alike
    Equals(AttrValue),
    Prefix(String),
    Regex(Regex),
    Range(RangeInclusive<i64>),
    /// Matches even when the attribute is absent
    Any,
}

impl Matcher {
    pub fn equals(value: impl Into<AttrValue>) -> Self {
        Self::Equals(value.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Regex)
    }

    /// Evaluate against a possibly missing attribute
    pub fn matches(&self, value: Option<&AttrValue>) -> bool {
        let Some(value) = value else {
            return matches!(self, Self::Any);
        };
        match self {
            Self::Equals(expected) => expected.loosely_eq(value),
            Self::Prefix(prefix) => value.as_text().starts_with(prefix.as_str()),
            Self::Regex(regex) => regex.is_match(&value.as_text()),
            Self::Range(range) => value.as_int().is_some_and(|n| range.contains(&n)),
            Self::Any => true,
        }
    }
}

/// Conjunction of attribute matchers; empty matches every event
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    clauses: Vec<(String, Matcher)>,
}

impl Predicate {
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Add a clause
    pub fn with(mut self, key: impl Into<String>, matcher: Matcher) -> Self {
        self.clauses.push((key.into(), matcher));
        self
    }

    pub fn equals(self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.with(key, Matcher::equals(value))
    }

    pub fn prefix(self, key: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.with(key, Matcher::prefix(prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.clauses.iter().all(|(key, matcher)| {
            let value = event.attribute(key);
            matcher.matches(value.as_ref())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::Snowflake;
    use serde_json::json;

    fn message(content: &str, channel: u64) -> Event {
        Event::decode(
            "MESSAGE_CREATE",
            json!({
                "id": "10",
                "channel_id": channel.to_string(),
                "author": {"id": "20", "username": "alice"},
                "content": content,
                "timestamp": "2024-01-01T00:00:00+00:00"
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        assert!(Predicate::any().matches(&message("hi", 1)));
        assert!(Predicate::any().matches(&Event::Resumed));
    }

    #[test]
    fn test_equals_and_prefix() {
        let event = message("!ping now", 5);
        let predicate = Predicate::any()
            .equals("channel_id", Snowflake::new(5))
            .prefix("content", "!ping");
        assert!(predicate.matches(&event));

        // Id compared against its string form
        assert!(Predicate::any().equals("channel_id", "5").matches(&event));
        assert!(!Predicate::any().equals("channel_id", "6").matches(&event));
        assert!(!Predicate::any().prefix("content", "!pong").matches(&event));
    }

    #[test]
    fn test_regex_and_range() {
        let event = message("roll 42", 5);
        let roll = Predicate::any().with("content", Matcher::regex(r"^roll \d+$").unwrap());
        assert!(roll.matches(&event));

        assert!(Predicate::any()
            .with("channel_id", Matcher::Range(1..=10))
            .matches(&event));
        assert!(!Predicate::any()
            .with("channel_id", Matcher::Range(6..=10))
            .matches(&event));
    }

    #[test]
    fn test_missing_attribute() {
        let event = message("hi", 5);
        assert!(!Predicate::any().equals("guild_id", "1").matches(&event));
        assert!(Predicate::any().with("guild_id", Matcher::Any).matches(&event));
        assert!(!Predicate::any().equals("no_such_key", "x").matches(&event));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(Matcher::regex("(").is_err());
    }
}
