//! Topic names and subscription patterns

use relaykit_core::{Error, Result, TOPIC_SEPARATOR, TOPIC_WILDCARD};
use std::fmt::{self, Display};
use std::str::FromStr;

/// A concrete topic events are published to, e.g. `orders.created`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// Create a topic, rejecting empty names and wildcards
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::publish(name, "topic must not be empty"));
        }
        if name.contains(TOPIC_WILDCARD) {
            return Err(Error::publish(
                name,
                "wildcards are only allowed in subscriptions",
            ));
        }
        Ok(Topic(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a subscription listens to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicPattern {
    /// Exactly one topic
    Exact(String),
    /// Every topic below a prefix, written `orders.*`
    Prefix(String),
    /// Every topic, written `*`
    All,
}

impl TopicPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(Error::configuration("topic pattern must not be empty"));
        }
        if pattern == TOPIC_WILDCARD {
            return Ok(TopicPattern::All);
        }

        let wildcard_suffix = format!("{TOPIC_SEPARATOR}{TOPIC_WILDCARD}");
        if let Some(prefix) = pattern.strip_suffix(&wildcard_suffix) {
            if prefix.is_empty() || prefix.contains(TOPIC_WILDCARD) {
                return Err(invalid(pattern));
            }
            return Ok(TopicPattern::Prefix(format!("{prefix}{TOPIC_SEPARATOR}")));
        }

        if pattern.contains(TOPIC_WILDCARD) {
            return Err(invalid(pattern));
        }
        Ok(TopicPattern::Exact(pattern.to_string()))
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicPattern::Exact(exact) => exact == topic,
            TopicPattern::Prefix(prefix) => topic.len() > prefix.len() && topic.starts_with(prefix),
            TopicPattern::All => true,
        }
    }
}

fn invalid(pattern: &str) -> Error {
    Error::configuration(format!(
        "invalid topic pattern '{pattern}': '{TOPIC_WILDCARD}' may only stand alone or as the last segment"
    ))
}

impl FromStr for TopicPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicPattern::Exact(topic) => f.write_str(topic),
            TopicPattern::Prefix(prefix) => write!(f, "{prefix}{TOPIC_WILDCARD}"),
            TopicPattern::All => f.write_str(TOPIC_WILDCARD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        let pattern: TopicPattern = "orders.created".parse().unwrap();
        assert!(pattern.matches("orders.created"));
        assert!(!pattern.matches("orders.cancelled"));
        assert!(!pattern.matches("orders.created.v2"));
    }

    #[test]
    fn test_prefix_pattern() {
        let pattern = TopicPattern::parse("orders.*").unwrap();
        assert!(pattern.matches("orders.created"));
        assert!(pattern.matches("orders.eu.created"));
        assert!(!pattern.matches("orders"));
        assert!(!pattern.matches("orders."));
        assert!(!pattern.matches("ordersx.created"));
        assert_eq!(pattern.to_string(), "orders.*");
    }

    #[test]
    fn test_all_pattern() {
        let pattern = TopicPattern::parse("*").unwrap();
        assert!(pattern.matches("anything"));
        assert_eq!(pattern, TopicPattern::All);
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(TopicPattern::parse("").is_err());
        assert!(TopicPattern::parse("or*ders").is_err());
        assert!(TopicPattern::parse("*.created").is_err());
        assert!(TopicPattern::parse(".*").is_err());
    }

    #[test]
    fn test_topic_rejects_wildcards() {
        assert!(Topic::new("orders.created").is_ok());
        assert!(Topic::new("orders.*").is_err());
        assert!(Topic::new(" ").is_err());
    }
}
