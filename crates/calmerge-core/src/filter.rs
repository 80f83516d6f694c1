//! Event inclusion rules.
//!
//! An event passes when every match rule of its source matches and, if a
//! [`DateRange`] is configured, it has a start and an end that both fall
//! inside the range. The reason for an exclusion is reported as an
//! [`Exclusion`] so callers can log it; it never changes control flow beyond
//! include/exclude.

use std::fmt;

use crate::record::EventRecord;
use crate::source::MatchRules;
use crate::time::DateRange;

/// Returns `true` if every rule matches the string form of its field.
///
/// A field missing from the event is a mismatch. No rules means the event is
/// accepted.
pub fn matches(event: &EventRecord, rules: &MatchRules) -> bool {
    first_miss(event, rules).is_none()
}

fn first_miss(event: &EventRecord, rules: &MatchRules) -> Option<Exclusion> {
    rules.iter().find_map(|rule| match event.get(rule.field()) {
        Some(value) => {
            let value = value.string_form();
            (!rule.is_match(&value)).then(|| Exclusion::FilterMiss {
                field: rule.field().to_string(),
                pattern: rule.pattern().to_string(),
                value: Some(value),
            })
        }
        None => Some(Exclusion::FilterMiss {
            field: rule.field().to_string(),
            pattern: rule.pattern().to_string(),
            value: None,
        }),
    })
}

/// Why an event was left out of the merged calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// A match rule did not match; `value` is `None` when the field is absent.
    FilterMiss {
        field: String,
        pattern: String,
        value: Option<String>,
    },
    /// A date range is configured but the event lacks a usable DTSTART or
    /// DTEND.
    MissingDates,
    /// The event's dates fall outside the configured range.
    OutOfRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
        range: DateRange,
    },
}

impl Exclusion {
    /// Short category name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FilterMiss { .. } => "filter_miss",
            Self::MissingDates => "missing_dates",
            Self::OutOfRange { .. } => "out_of_range",
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilterMiss {
                field,
                pattern,
                value: Some(value),
            } => write!(f, "filter miss: {field} {value:?} does not match {pattern:?}"),
            Self::FilterMiss {
                field,
                pattern,
                value: None,
            } => write!(f, "filter miss: {field} is absent (pattern {pattern:?})"),
            Self::MissingDates => f.write_str("event without date/time details"),
            Self::OutOfRange { start, end, range } => {
                write!(f, "event date/time out of range: {start}..={end} not within {range}")
            }
        }
    }
}

/// The outcome of evaluating one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    /// The event goes into the merged calendar.
    Include,
    /// The event is dropped.
    Exclude(Exclusion),
}

impl FilterVerdict {
    /// Returns `true` for [`FilterVerdict::Include`].
    pub fn is_included(&self) -> bool {
        matches!(self, Self::Include)
    }
}

/// Applies match rules and the optional date range.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    date_range: Option<DateRange>,
}

impl EventFilter {
    /// A filter that only applies match rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to restrict events to a date range.
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// The configured date range, if any.
    pub fn date_range(&self) -> Option<DateRange> {
        self.date_range
    }

    /// Decides whether `event` is included.
    pub fn evaluate(&self, event: &EventRecord, rules: &MatchRules) -> FilterVerdict {
        if let Some(miss) = first_miss(event, rules) {
            return FilterVerdict::Exclude(miss);
        }

        let Some(range) = self.date_range else {
            return FilterVerdict::Include;
        };

        let (Some(start), Some(end)) = (event.start(), event.end()) else {
            return FilterVerdict::Exclude(Exclusion::MissingDates);
        };

        let (start, end) = (start.date(), end.date());
        if range.contains(start, end) {
            FilterVerdict::Include
        } else {
            FilterVerdict::Exclude(Exclusion::OutOfRange { start, end, range })
        }
    }
}
