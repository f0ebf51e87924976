// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Parsing of the sync annotation into a namespace selector.

use std::collections::BTreeMap;
use std::fmt;

/// A single-equality namespace selector parsed from the sync annotation.
///
/// The annotation accepts exactly the form `key=value`; anything else is
/// rejected and the carrying object is treated as unmanaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    key: String,
    value: String,
}

impl Selector {
    /// Parse `key=value` into a selector. Returns `None` unless both sides
    /// are non-empty, label-legal strings and exactly one `=` is present.
    pub fn parse(directive: &str) -> Option<Self> {
        let (key, value) = directive.split_once('=')?;
        if value.contains('=') {
            return None;
        }
        if !is_label_key(key) || !is_label_value(value) {
            return None;
        }
        Some(Selector {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// A namespace satisfies the selector iff its labels carry the exact
    /// key/value pair.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.key).is_some_and(|v| *v == self.value)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Label keys are a name segment with an optional `prefix/` part.
fn is_label_key(key: &str) -> bool {
    match key.split_once('/') {
        Some((prefix, name)) => is_dns_subdomain(prefix) && is_label_name(name),
        None => is_label_name(key),
    }
}

fn is_label_name(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 63
        && s.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && s.chars().last().is_some_and(|c| c.is_ascii_alphanumeric())
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn is_label_value(s: &str) -> bool {
    is_label_name(s)
}

fn is_dns_subdomain(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 253
        && s.split('.').all(|part| {
            !part.is_empty()
                && part.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
                && part.chars().last().is_some_and(|c| c.is_ascii_alphanumeric())
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_simple_equality() {
        let selector = Selector::parse("app=demo").unwrap();
        assert_eq!(selector.key(), "app");
        assert_eq!(selector.value(), "demo");
    }

    #[test]
    fn test_parse_prefixed_key() {
        let selector = Selector::parse("team.example.com/tier=backend").unwrap();
        assert_eq!(selector.key(), "team.example.com/tier");
    }

    #[test]
    fn test_parse_rejects_missing_equals() {
        assert!(Selector::parse("app").is_none());
    }

    #[test]
    fn test_parse_rejects_empty_sides() {
        assert!(Selector::parse("=demo").is_none());
        assert!(Selector::parse("app=").is_none());
        assert!(Selector::parse("=").is_none());
    }

    #[test]
    fn test_parse_rejects_double_equals() {
        assert!(Selector::parse("app=demo=extra").is_none());
    }

    #[test]
    fn test_parse_rejects_illegal_characters() {
        assert!(Selector::parse("app=de mo").is_none());
        assert!(Selector::parse(" app=demo").is_none());
        assert!(Selector::parse("app=demo!").is_none());
    }

    #[test]
    fn test_parse_rejects_overlong_value() {
        let long = "x".repeat(64);
        assert!(Selector::parse(&format!("app={long}")).is_none());
    }

    #[test]
    fn test_matches_exact_pair() {
        let selector = Selector::parse("app=demo").unwrap();
        assert!(selector.matches(&labels(&[("app", "demo"), ("env", "prod")])));
    }

    #[test]
    fn test_matches_rejects_other_value() {
        let selector = Selector::parse("app=demo").unwrap();
        assert!(!selector.matches(&labels(&[("app", "other")])));
    }

    #[test]
    fn test_matches_rejects_missing_key() {
        let selector = Selector::parse("app=demo").unwrap();
        assert!(!selector.matches(&labels(&[("env", "demo")])));
    }

    #[test]
    fn test_display_round_trip() {
        let selector = Selector::parse("app=demo").unwrap();
        assert_eq!(selector.to_string(), "app=demo");
    }
}
