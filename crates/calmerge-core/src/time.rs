//! Time values carried by event records.
//!
//! [`EventTime`] is the typed view of a `DTSTART`/`DTEND`-style value, and
//! [`DateRange`] is the inclusive window an event must fall into when a
//! range filter is configured.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// iCalendar `DATE` value format.
const ICAL_DATE: &str = "%Y%m%d";
/// iCalendar `DATE-TIME` value format, without the UTC designator.
const ICAL_DATE_TIME: &str = "%Y%m%dT%H%M%S";

/// A date or date-time value as it appears on an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    /// An all-day value (`VALUE=DATE`).
    Date(NaiveDate),
    /// A UTC date-time (`...Z`).
    Utc(DateTime<Utc>),
    /// A floating date-time with no zone information.
    Floating(NaiveDateTime),
    /// A wall-clock date-time qualified by a `TZID` parameter.
    Zoned {
        /// The wall-clock time in the named zone.
        date_time: NaiveDateTime,
        /// The zone identifier, as written in the feed.
        tzid: String,
    },
}

impl EventTime {
    /// Parses an iCalendar date or date-time value.
    ///
    /// `value_type` is the `VALUE` parameter and `tzid` the `TZID` parameter,
    /// when present. Returns `None` for values that are not a date or
    /// date-time.
    pub fn parse(value: &str, value_type: Option<&str>, tzid: Option<&str>) -> Option<Self> {
        let value = value.trim();

        if value_type.is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
            || (value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()))
        {
            return NaiveDate::parse_from_str(value, ICAL_DATE)
                .ok()
                .map(Self::Date);
        }

        if let Some(utc) = value.strip_suffix('Z') {
            let dt = NaiveDateTime::parse_from_str(utc, ICAL_DATE_TIME).ok()?;
            return Some(Self::Utc(dt.and_utc()));
        }

        let dt = NaiveDateTime::parse_from_str(value, ICAL_DATE_TIME).ok()?;
        Some(match tzid {
            Some(tzid) => Self::Zoned {
                date_time: dt,
                tzid: tzid.to_string(),
            },
            None => Self::Floating(dt),
        })
    }

    /// The calendar date of this value, as written.
    ///
    /// UTC values yield their UTC date; floating and zoned values yield their
    /// wall-clock date.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::Utc(dt) => dt.date_naive(),
            Self::Floating(dt) => dt.date(),
            Self::Zoned { date_time, .. } => date_time.date(),
        }
    }

    /// Returns `true` for all-day values.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// ISO-8601 rendering used for identity derivation.
    ///
    /// - dates: `2020-01-03`
    /// - UTC: `2020-01-03T10:00:00+00:00`
    /// - floating and zoned: `2020-01-03T10:00:00` (no zone database is
    ///   consulted, so the offset of a zoned value is unknown)
    pub fn to_iso(&self) -> String {
        match self {
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
            Self::Utc(dt) => dt.format("%Y-%m-%dT%H:%M:%S+00:00").to_string(),
            Self::Floating(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Self::Zoned { date_time, .. } => date_time.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}

/// An inclusive window of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First date an event may start on.
    pub start: NaiveDate,
    /// Last date an event may end on.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range from its two inclusive bounds.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Returns `true` when `start_date <= end_date` and both lie inside the
    /// window.
    pub fn contains(&self, start_date: NaiveDate, end_date: NaiveDate) -> bool {
        self.start <= start_date && start_date <= end_date && end_date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
