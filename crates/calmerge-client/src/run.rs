//! One merge run: read the sources, fetch every feed, merge and write.

use std::path::{Path, PathBuf};

use tracing::info;

use calmerge_core::{MergeEngine, MergedCalendar};
use calmerge_providers::{FeedLoader, RateLimitedFetcher, encode_calendar, load_sources};

use crate::cli::Cli;
use crate::error::{ClientError, ClientResult};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of feeds fetched.
    pub feeds: usize,
    /// Number of events in the merged calendar.
    pub events: usize,
    /// Where the calendar was written, if anywhere.
    pub output: Option<PathBuf>,
}

/// Runs the whole pipeline for the given command line.
///
/// The configuration is read and validated before the first fetch. Any
/// failure aborts the run and nothing is written.
pub async fn run(cli: &Cli) -> ClientResult<RunSummary> {
    let sources = load_sources(&cli.urls)?;
    info!(
        sources = sources.len(),
        path = %cli.urls.display(),
        "Loaded source configuration"
    );

    let fetcher = RateLimitedFetcher::http(&cli.fetch_config())?;
    let loader = FeedLoader::new(fetcher, cli.loader_config());
    let feeds = loader.load(&sources).await?;

    let calendar = MergeEngine::new(cli.merge_options()).merge(&feeds)?;

    match cli.output {
        Some(ref path) => {
            write_calendar(path, &calendar).await?;
            info!(events = calendar.len(), path = %path.display(), "Wrote merged calendar");
        }
        None => info!(
            events = calendar.len(),
            "No output file given, merged calendar discarded"
        ),
    }

    Ok(RunSummary {
        feeds: feeds.len(),
        events: calendar.len(),
        output: cli.output.clone(),
    })
}

/// Encodes `calendar` and writes it to `path`.
pub async fn write_calendar(path: &Path, calendar: &MergedCalendar) -> ClientResult<()> {
    tokio::fs::write(path, encode_calendar(calendar))
        .await
        .map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use tempfile::TempDir;
    use url::Url;

    use calmerge_core::MergeError;
    use calmerge_providers::ProviderErrorCode;

    use super::*;

    fn shift(day: u32, summary: &str) -> String {
        format!(
            "BEGIN:VEVENT\r\nDTSTAMP:20191215T120000Z\r\n\
             DTSTART:202001{day:02}T090000Z\r\nDTEND:202001{day:02}T120000Z\r\n\
             SUMMARY:{summary}\r\nEND:VEVENT\r\n"
        )
    }

    fn write_feed(dir: &TempDir, name: &str, events: &[String]) -> Url {
        let path = dir.path().join(name);
        let body = format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//EN\r\n{}END:VCALENDAR\r\n",
            events.concat()
        );
        fs::write(&path, body).unwrap();
        Url::from_file_path(&path).unwrap()
    }

    fn write_config(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("urls.csv");
        fs::write(&path, text).unwrap();
        path
    }

    fn cli(config: &Path, extra: &[&str]) -> Cli {
        let config = config.to_string_lossy().into_owned();
        let mut args = vec!["calmerge".to_string(), "-u".into(), config, "-d".into(), "0".into()];
        args.extend(extra.iter().map(|arg| arg.to_string()));
        Cli::try_parse_from(args).unwrap()
    }

    #[tokio::test]
    async fn merges_file_feeds_into_output() {
        let dir = tempfile::tempdir().unwrap();
        let pool = write_feed(
            &dir,
            "pool.ics",
            &[shift(1, "Skip M"), shift(2, "Open Swim"), shift(3, "Skip M")],
        );
        let config = write_config(&dir, &format!("url,match:SUMMARY,SUMMARY\n{pool},skip,Skip\n"));
        let output = dir.path().join("merged.ics");

        let summary = run(&cli(&config, &["-o", &output.to_string_lossy(), "-C"]))
            .await
            .unwrap();
        assert_eq!(summary.feeds, 1);
        assert_eq!(summary.events, 2);
        assert_eq!(summary.output.as_deref(), Some(output.as_path()));

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.starts_with("BEGIN:VCALENDAR\r\nPRODID:-//icalcombine//NONSGML//EN\r\n"));
        assert_eq!(written.matches("BEGIN:VEVENT").count(), 2);
        assert_eq!(written.matches("STATUS:CANCELLED").count(), 2);
        assert!(!written.contains("Open Swim"));
    }

    #[tokio::test]
    async fn date_range_and_name_flags() {
        let dir = tempfile::tempdir().unwrap();
        let pool = write_feed(&dir, "pool.ics", &[shift(1, "A"), shift(3, "B")]);
        let config = write_config(&dir, &format!("url\n{pool}\n"));
        let output = dir.path().join("merged.ics");

        let summary = run(&cli(
            &config,
            &[
                "-o",
                &output.to_string_lossy(),
                "-s",
                "2020-01-01",
                "-e",
                "2020-01-02",
                "--calendar-name",
                "Guards",
            ],
        ))
        .await
        .unwrap();
        assert_eq!(summary.events, 1);

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("X-WR-CALNAME:Guards\r\n"));
        assert!(written.contains("SUMMARY:A\r\n"));
    }

    #[tokio::test]
    async fn no_output_discards_result() {
        let dir = tempfile::tempdir().unwrap();
        let pool = write_feed(&dir, "pool.ics", &[shift(1, "A")]);
        let config = write_config(&dir, &format!("url\n{pool}\n"));

        let summary = run(&cli(&config, &[])).await.unwrap();
        assert_eq!(summary.events, 1);
        assert!(summary.output.is_none());
    }

    #[tokio::test]
    async fn duplicate_feeds_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pool = write_feed(&dir, "pool.ics", &[shift(1, "A")]);
        let config = write_config(&dir, &format!("url\n{pool}\n{pool}\n"));
        let output = dir.path().join("merged.ics");

        let err = run(&cli(&config, &["-o", &output.to_string_lossy()]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Merge(MergeError::DuplicateIdentity { .. })
        ));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn bad_configuration_fails_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(
            &dir,
            "url,match:SUMMARY\nhttps://unreachable.invalid/a.ics,(broken\n",
        );

        let err = run(&cli(&config, &[])).await.unwrap_err();
        match err {
            ClientError::Provider(err) => {
                assert_eq!(err.code(), ProviderErrorCode::ConfigurationError)
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn unsupported_scheme_fails_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let pool = write_feed(&dir, "pool.ics", &[shift(1, "A")]);
        let config = write_config(&dir, &format!("url\n{pool}\nftp://example.com/a.ics\n"));
        let output = dir.path().join("merged.ics");

        let err = run(&cli(&config, &["-o", &output.to_string_lossy()]))
            .await
            .unwrap_err();
        match err {
            ClientError::Provider(err) => {
                assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
                assert!(err.message().starts_with("Row 2:"));
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn missing_feed_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Url::from_file_path(dir.path().join("missing.ics")).unwrap();
        let config = write_config(&dir, &format!("url\n{missing}\n"));

        let err = run(&cli(&config, &[])).await.unwrap_err();
        match err {
            ClientError::Provider(err) => assert!(err.is_network()),
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn unwritable_output_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let pool = write_feed(&dir, "pool.ics", &[shift(1, "A")]);
        let config = write_config(&dir, &format!("url\n{pool}\n"));
        let output = dir.path().join("no-such-dir").join("merged.ics");

        let err = run(&cli(&config, &["-o", &output.to_string_lossy()]))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Io { .. }));
    }
}
