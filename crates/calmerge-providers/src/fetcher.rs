//! Rate-limited feed fetching.
//!
//! [`RateLimitedFetcher`] keeps one lock per network location (`host:port`).
//! The lock guards the time of the last request to that location and is held
//! across the throttle sleep and the request itself, so requests to one host
//! are strictly sequential while different hosts can proceed concurrently.
//!
//! The actual I/O goes through a [`FeedTransport`]. [`HttpTransport`] serves
//! `http(s)://` URLs with `reqwest` and `file://` URLs from disk.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};
use url::Url;

use calmerge_core::location_of;

use crate::error::{ProviderError, ProviderResult};

/// A boxed future, used to keep [`FeedTransport`] object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Retrieves the raw text of one feed.
pub trait FeedTransport: Send + Sync {
    /// Returns the body of `url`.
    ///
    /// Implementations report failures with a code from the network family
    /// ([`ProviderErrorCode::is_network`](crate::ProviderErrorCode::is_network)).
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, ProviderResult<String>>;
}

/// Settings for fetching feeds.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Minimum time between two requests to the same location.
    pub min_interval: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent sent with HTTP requests.
    pub user_agent: String,
}

impl FetchConfig {
    /// Default delay between requests to one location, in seconds.
    pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 5;

    /// Default request timeout, in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(Self::DEFAULT_MIN_INTERVAL_SECS),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calmerge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Transport for `http://`, `https://` and `file://` feeds.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds the HTTP client from `config`.
    pub fn new(config: &FetchConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::network(format!("Failed to create HTTP client: {e}")).with_source(e)
            })?;

        Ok(Self { client })
    }

    async fn get_http(&self, url: &Url) -> ProviderResult<String> {
        trace!(url = %url, "Sending request");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(e, url))?;

        let status = response.status();
        trace!(status = %status, "Received response");
        if !status.is_success() {
            return Err(
                ProviderError::http_status(format!("Unexpected status {status}")).with_url(url),
            );
        }

        response.text().await.map_err(|e| request_error(e, url))
    }

    async fn get_file(&self, url: &Url) -> ProviderResult<String> {
        let path = url.to_file_path().map_err(|()| {
            ProviderError::configuration("File URL does not name a local path").with_url(url)
        })?;

        trace!(path = %path.display(), "Reading feed file");
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            ProviderError::network(format!("Failed to read {}: {e}", path.display()))
                .with_url(url)
                .with_source(e)
        })
    }
}

fn request_error(err: reqwest::Error, url: &Url) -> ProviderError {
    let base = if err.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {err}"))
    } else {
        ProviderError::network(format!("Request failed: {err}"))
    };
    base.with_url(url).with_source(err)
}

impl FeedTransport for HttpTransport {
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            match url.scheme() {
                "http" | "https" => self.get_http(url).await,
                "file" => self.get_file(url).await,
                other => Err(ProviderError::configuration(format!(
                    "Unsupported URL scheme {other:?}"
                ))
                .with_url(url)),
            }
        })
    }
}

type LocationSlot = Arc<Mutex<Option<Instant>>>;

/// Fetches feeds while keeping a minimum interval between requests to the
/// same location.
///
/// When the previous request to a location was less than `min_interval` ago,
/// the fetcher sleeps for the full `min_interval` before issuing the next
/// one. The request time is recorded after that sleep, on every attempt,
/// whether or not the request succeeds. Failed requests are not retried.
pub struct RateLimitedFetcher<T> {
    transport: T,
    min_interval: Duration,
    locations: Mutex<HashMap<String, LocationSlot>>,
}

impl RateLimitedFetcher<HttpTransport> {
    /// Creates a fetcher backed by [`HttpTransport`].
    pub fn http(config: &FetchConfig) -> ProviderResult<Self> {
        Ok(Self::new(HttpTransport::new(config)?, config.min_interval))
    }
}

impl<T: FeedTransport> RateLimitedFetcher<T> {
    pub fn new(transport: T, min_interval: Duration) -> Self {
        Self {
            transport,
            min_interval,
            locations: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches the body of `url`, waiting first if its location was hit too
    /// recently.
    pub async fn fetch(&self, url: &Url) -> ProviderResult<String> {
        let location = location_of(url);
        let slot = self.slot(&location).await;
        let mut last = slot.lock().await;

        if let Some(previous) = *last {
            if previous.elapsed() < self.min_interval {
                debug!(
                    location = %location,
                    delay_ms = self.min_interval.as_millis() as u64,
                    "Throttling request"
                );
                tokio::time::sleep(self.min_interval).await;
            }
        }

        *last = Some(Instant::now());
        debug!(url = %url, "Fetching feed");
        self.transport.get(url).await
    }

    /// When the last request to `location` was issued.
    pub async fn last_fetch(&self, location: &str) -> Option<Instant> {
        let slot = self.locations.lock().await.get(location).cloned()?;
        let last = *slot.lock().await;
        last
    }

    async fn slot(&self, location: &str) -> LocationSlot {
        let mut locations = self.locations.lock().await;
        locations
            .entry(location.to_string())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use tokio::time::Instant;
    use url::Url;

    use super::{BoxFuture, FeedTransport};
    use crate::error::{ProviderError, ProviderResult};

    /// In-memory transport that records when each URL was requested.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        bodies: HashMap<String, String>,
        pub(crate) calls: Mutex<Vec<(String, Instant)>>,
    }

    impl RecordingTransport {
        pub(crate) fn with_body(mut self, url: &str, body: impl Into<String>) -> Self {
            self.bodies.insert(url.to_string(), body.into());
            self
        }

        pub(crate) fn calls(&self) -> Vec<(String, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FeedTransport for RecordingTransport {
        fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, ProviderResult<String>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((url.to_string(), Instant::now()));
                self.bodies
                    .get(url.as_str())
                    .cloned()
                    .ok_or_else(|| ProviderError::http_status("404 Not Found").with_url(url))
            })
        }
    }
}
