//! Command-line interface definition.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;

use calmerge_core::{
    DEFAULT_CALENDAR_NAME, DateRange, EventStatus, MergeOptions, TracingConfig,
};
use calmerge_providers::{FetchConfig, LoaderConfig};

/// Earliest date used when only `--end` is given.
pub const DEFAULT_START: (i32, u32, u32) = (2000, 1, 1);

/// Latest date used when only `--start` is given.
pub const DEFAULT_END: (i32, u32, u32) = (2050, 12, 31);

/// calmerge - Merge several iCalendar feeds into one calendar
#[derive(Debug, Parser)]
#[command(name = "calmerge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// CSV file listing the feed URLs, match rules and substitutions
    #[arg(long, short = 'u', env = "CALMERGE_URLS")]
    pub urls: PathBuf,

    /// Output file for the merged calendar
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Earliest date to include in output (YYYY-MM-DD)
    #[arg(long, short = 's', value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// Last date to include in output (YYYY-MM-DD)
    #[arg(long, short = 'e', value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Be chattier: log filter misses, exclusions and substitutions
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Generate STATUS:CONFIRMED records (default)
    #[arg(long, short = 'c', conflicts_with = "cancelled")]
    pub confirmed: bool,

    /// Generate STATUS:CANCELLED records
    #[arg(long, short = 'C')]
    pub cancelled: bool,

    /// Delay in seconds before querying the same server again
    #[arg(long, short = 'd', default_value = "0.5", value_parser = parse_seconds)]
    pub delta: Duration,

    /// Request timeout in seconds
    #[arg(long, default_value = "20", value_parser = parse_seconds)]
    pub timeout: Duration,

    /// Number of hosts fetched in parallel
    #[arg(long, short = 'j', default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: u16,

    /// Display name of the merged calendar
    #[arg(long, default_value = DEFAULT_CALENDAR_NAME)]
    pub calendar_name: String,
}

impl Cli {
    /// The date window, if `--start` or `--end` was given.
    ///
    /// A missing bound falls back to 2000-01-01 or 2050-12-31.
    pub fn date_range(&self) -> Option<DateRange> {
        if self.start.is_none() && self.end.is_none() {
            return None;
        }

        let start = self.start.or_else(|| ymd(DEFAULT_START))?;
        let end = self.end.or_else(|| ymd(DEFAULT_END))?;
        Some(DateRange::new(start, end))
    }

    /// The status stamped on every merged event.
    pub fn status(&self) -> EventStatus {
        EventStatus::from_confirmed(!self.cancelled)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::new()
            .with_min_interval(self.delta)
            .with_timeout(self.timeout)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::new().with_max_parallel_hosts(usize::from(self.jobs))
    }

    pub fn merge_options(&self) -> MergeOptions {
        let options = MergeOptions::new()
            .with_status(self.status())
            .with_display_name(&self.calendar_name);
        match self.date_range() {
            Some(range) => options.with_date_range(range),
            None => options,
        }
    }

    pub fn tracing_config(&self) -> TracingConfig {
        if self.verbose {
            TracingConfig::cli_verbose()
        } else {
            TracingConfig::cli()
        }
    }
}

fn ymd((y, m, d): (i32, u32, u32)) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Parses a `YYYY-MM-DD` command-line date.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Date ({value}) not valid! Expected format, YYYY-MM-DD!"))
}

/// Parses a non-negative number of seconds, fractions allowed.
pub fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("{value:?} is not a number of seconds"))?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("{value:?}: {e}"))
}
