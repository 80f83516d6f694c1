//! Feed fetching, source configuration and the iCalendar codec.
//!
//! - [`load_sources`] - Read the CSV source configuration
//! - [`RateLimitedFetcher`] - Fetch feeds politely, one location at a time
//! - [`FeedLoader`] - Fetch and decode every configured feed
//! - [`decode_events`] / [`encode_calendar`] - iCalendar text to records and back
//! - [`ProviderError`] - Error types for all of the above
//!
//! # Architecture
//!
//! ```text
//! urls.csv ──load_sources()──▶ SourceDescriptor*
//!                                    │
//!                                    ▼
//!                         ┌─────────────────────┐
//!                         │ FeedLoader          │
//!                         │  RateLimitedFetcher │──▶ FeedTransport (http/file)
//!                         │  decode_events()    │
//!                         └──────────┬──────────┘
//!                                    ▼
//!                               DecodedFeed*  ──▶ MergeEngine (calmerge-core)
//!                                                     │
//!                                                     ▼
//!                                            encode_calendar()
//! ```

pub mod error;
pub mod fetcher;
pub mod ics;
pub mod loader;
pub mod source;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use fetcher::{BoxFuture, FeedTransport, FetchConfig, HttpTransport, RateLimitedFetcher};
pub use ics::{decode_events, encode_calendar};
pub use loader::{FeedLoader, LoaderConfig};
pub use source::{MATCH_PREFIX, SUPPORTED_SCHEMES, URL_COLUMN, load_sources, parse_sources};
