//! Per-feed configuration: where to fetch from, which events to keep and
//! which fields to rewrite.

use regex::{Regex, RegexBuilder};
use url::Url;

use crate::error::RuleError;
use crate::record::EventRecord;

/// A compiled filter pattern for one field.
#[derive(Debug, Clone)]
pub struct MatchRule {
    field: String,
    pattern: String,
    regex: Regex,
}

impl MatchRule {
    /// Compiles `pattern` as a case-insensitive regex anchored at the start
    /// of the field's string form.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidPattern`] if the pattern does not compile.
    pub fn new(field: impl Into<String>, pattern: impl Into<String>) -> Result<Self, RuleError> {
        let field = field.into();
        let pattern = pattern.into();
        let regex = RegexBuilder::new(&format!("^(?:{pattern})"))
            .case_insensitive(true)
            .build()
            .map_err(|source| RuleError::InvalidPattern {
                field: field.clone(),
                pattern: pattern.clone(),
                source,
            })?;

        Ok(Self {
            field,
            pattern,
            regex,
        })
    }

    /// The field this rule applies to.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The pattern as configured.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns `true` if the pattern matches a prefix of `value`.
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// All match rules of one source; an event must satisfy every rule.
#[derive(Debug, Clone, Default)]
pub struct MatchRules {
    rules: Vec<MatchRule>,
}

impl MatchRules {
    /// Creates an empty rule set, which accepts every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add a rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidPattern`] if the pattern does not compile.
    pub fn with_rule(
        mut self,
        field: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self, RuleError> {
        self.push(MatchRule::new(field, pattern)?);
        Ok(self)
    }

    /// Adds a compiled rule.
    pub fn push(&mut self, rule: MatchRule) {
        self.rules.push(rule);
    }

    /// Iterates over the rules in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &MatchRule> {
        self.rules.iter()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` when no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Replacement values keyed by field name.
///
/// Empty values are kept so the configuration round-trips, but they are never
/// applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    values: Vec<(String, String)>,
}

impl Substitutions {
    /// Creates an empty substitution set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add a substitution.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    /// Adds or replaces the substitution for `field`.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| *key == field) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((field, value)),
        }
    }

    /// The replacement for `field`, if one is configured and non-empty.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, value)| key == field && !value.is_empty())
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over all configured substitutions, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of configured substitutions.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One configuration row.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    row: usize,
    url: Url,
    match_rules: MatchRules,
    substitutions: Substitutions,
}

impl SourceDescriptor {
    /// Creates a descriptor for `url`. `row` is the 1-based configuration
    /// row, used in diagnostics.
    pub fn new(row: usize, url: Url, match_rules: MatchRules, substitutions: Substitutions) -> Self {
        Self {
            row,
            url,
            match_rules,
            substitutions,
        }
    }

    /// The 1-based configuration row.
    pub fn row(&self) -> usize {
        self.row
    }

    /// The feed URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The filter rules.
    pub fn match_rules(&self) -> &MatchRules {
        &self.match_rules
    }

    /// The field substitutions.
    pub fn substitutions(&self) -> &Substitutions {
        &self.substitutions
    }

    /// The throttle key: `host:port`, empty for host-less URLs.
    pub fn location(&self) -> String {
        location_of(&self.url)
    }
}

/// Returns the network location (`host:port`) of a URL.
///
/// URLs without a host (e.g. `file:///...`) share the empty location.
pub fn location_of(url: &Url) -> String {
    match (url.host_str(), url.port_or_known_default()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// A source together with the events decoded from its feed.
#[derive(Debug, Clone)]
pub struct DecodedFeed {
    /// The configuration row the events came from.
    pub source: SourceDescriptor,
    /// The events, in feed order.
    pub events: Vec<EventRecord>,
}

impl DecodedFeed {
    /// Pairs a source with its decoded events.
    pub fn new(source: SourceDescriptor, events: Vec<EventRecord>) -> Self {
        Self { source, events }
    }
}
