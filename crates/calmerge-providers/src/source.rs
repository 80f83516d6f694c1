//! CSV source configuration.
//!
//! The first row is a header. It must contain a `url` column; every other
//! column is either a match rule (`match:<field>`) or a substitution
//! (`<field>`). Each following row describes one feed:
//!
//! ```text
//! url,match:SUMMARY,SUMMARY
//! https://feeds.example.com/north.ics,skip m,Renamed
//! ```
//!
//! Field names are upper-cased and every cell is trimmed. The whole file is
//! validated before anything is fetched.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;
use url::Url;

use calmerge_core::{MatchRule, MatchRules, SourceDescriptor, Substitutions};

use crate::error::{ProviderError, ProviderResult};

/// Name of the required URL column.
pub const URL_COLUMN: &str = "url";

/// URL schemes a feed can be fetched from.
pub const SUPPORTED_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// Prefix marking a match rule column.
pub const MATCH_PREFIX: &str = "match:";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Column {
    Url,
    Match(String),
    Substitute(String),
}

impl Column {
    fn classify(header: &str) -> Option<Self> {
        if header == URL_COLUMN {
            return Some(Self::Url);
        }

        let (prefix, field) = match header.split_at_checked(MATCH_PREFIX.len()) {
            Some((prefix, field)) if prefix.eq_ignore_ascii_case(MATCH_PREFIX) => {
                (true, field.trim())
            }
            _ => (false, header),
        };

        if field.is_empty() {
            return None;
        }

        let field = field.to_ascii_uppercase();
        Some(if prefix {
            Self::Match(field)
        } else {
            Self::Substitute(field)
        })
    }
}

/// Parses a source configuration from CSV text.
///
/// # Errors
///
/// Returns a configuration error if the header lacks a `url` column, a row
/// is malformed, a URL is empty or invalid, or a match pattern does not
/// compile.
pub fn parse_sources<R: Read>(reader: R) -> ProviderResult<Vec<SourceDescriptor>> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| {
            ProviderError::configuration(format!("Invalid header row: {e}")).with_source(e)
        })?
        .clone();

    let columns = classify_headers(&headers)?;
    let mut sources = Vec::new();

    for (index, record) in csv.records().enumerate() {
        let row = index + 1;
        let record = record.map_err(|e| {
            ProviderError::configuration(format!("Malformed row {row}: {e}")).with_source(e)
        })?;
        sources.push(parse_row(row, &columns, &record)?);
    }

    debug!(sources = sources.len(), "Parsed source configuration");
    Ok(sources)
}

/// Reads and parses a source configuration file.
///
/// # Errors
///
/// See [`parse_sources`]; also fails if the file cannot be opened.
pub fn load_sources(path: impl AsRef<Path>) -> ProviderResult<Vec<SourceDescriptor>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        ProviderError::configuration(format!("Cannot open {}: {e}", path.display())).with_source(e)
    })?;
    parse_sources(file)
}

fn classify_headers(headers: &StringRecord) -> ProviderResult<Vec<Option<Column>>> {
    let columns: Vec<_> = headers.iter().map(Column::classify).collect();

    if !columns.contains(&Some(Column::Url)) {
        return Err(ProviderError::configuration(format!(
            "Header has no {URL_COLUMN:?} column"
        )));
    }

    Ok(columns)
}

fn parse_row(
    row: usize,
    columns: &[Option<Column>],
    record: &StringRecord,
) -> ProviderResult<SourceDescriptor> {
    let mut url = None;
    let mut match_rules = MatchRules::new();
    let mut substitutions = Substitutions::new();

    for (column, cell) in columns.iter().zip(record.iter()) {
        match column {
            Some(Column::Url) => url = Some(cell),
            Some(Column::Match(field)) => {
                let rule = MatchRule::new(field.clone(), cell).map_err(|e| {
                    ProviderError::configuration(format!("Row {row}: {e}")).with_source(e)
                })?;
                match_rules.push(rule);
            }
            Some(Column::Substitute(field)) => substitutions.insert(field.clone(), cell),
            None => {}
        }
    }

    let url = match url {
        Some(url) if !url.is_empty() => url,
        _ => return Err(ProviderError::configuration(format!("Row {row}: empty url"))),
    };
    let url = Url::parse(url).map_err(|e| {
        ProviderError::configuration(format!("Row {row}: invalid url {url:?}: {e}")).with_source(e)
    })?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(ProviderError::configuration(format!(
            "Row {row}: unsupported URL scheme {:?}",
            url.scheme()
        ))
        .with_url(&url));
    }

    Ok(SourceDescriptor::new(row, url, match_rules, substitutions))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::ProviderErrorCode;

    fn parse(text: &str) -> ProviderResult<Vec<SourceDescriptor>> {
        parse_sources(text.as_bytes())
    }

    #[test]
    fn classifies_columns() {
        let sources = parse(
            "url,match:summary,summary,location\n\
             https://feeds.example.com/north.ics, skip m ,Renamed,\n",
        )
        .unwrap();

        assert_eq!(sources.len(), 1);
        let source = &sources[0];
        assert_eq!(source.row(), 1);
        assert_eq!(source.url().as_str(), "https://feeds.example.com/north.ics");

        let rules: Vec<_> = source
            .match_rules()
            .iter()
            .map(|r| (r.field(), r.pattern()))
            .collect();
        assert_eq!(rules, [("SUMMARY", "skip m")]);

        assert_eq!(source.substitutions().get("SUMMARY"), Some("Renamed"));
        assert_eq!(source.substitutions().get("LOCATION"), None);
        assert_eq!(source.substitutions().len(), 2);
    }

    #[test]
    fn keeps_row_order() {
        let sources = parse(
            "url\n\
             https://b.example.com/1.ics\n\
             https://a.example.com/2.ics\n",
        )
        .unwrap();
        let rows: Vec<_> = sources
            .iter()
            .map(|s| (s.row(), s.url().host_str().unwrap_or_default()))
            .collect();
        assert_eq!(rows, [(1, "b.example.com"), (2, "a.example.com")]);
    }

    #[test]
    fn missing_url_column() {
        let err = parse("feed,summary\nhttps://a.example.com/1.ics,x\n").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("url"));
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = parse("url,summary\n ,x\n").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("Row 1"));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = parse("url\nnot a url\n").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = parse("url\nhttps://a.example.com/1.ics\nftp://example.com/a.ics\n").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().starts_with("Row 2:"));
        assert_eq!(err.url(), Some("ftp://example.com/a.ics"));

        let err = parse("url\nmailto:x@y.z\n").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn supported_schemes_are_accepted() {
        let sources = parse(
            "url\nhttp://a.example.com/1.ics\nhttps://b.example.com/2.ics\nfile:///tmp/3.ics\n",
        )
        .unwrap();
        assert_eq!(sources.len(), 3);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = parse("url,match:summary\nhttps://a.example.com/1.ics,(open\n").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("SUMMARY"));
    }

    #[test]
    fn ragged_row_is_rejected() {
        let err = parse("url,summary\nhttps://a.example.com/1.ics,x,extra\n").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn header_only_is_empty() {
        assert!(parse("url,match:summary\n").unwrap().is_empty());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "url,match:SUMMARY").unwrap();
        writeln!(file, "file:///tmp/pool.ics,Skip").unwrap();

        let sources = load_sources(file.path()).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].location(), "");
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_sources(dir.path().join("urls.csv")).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }
}
