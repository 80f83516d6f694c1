//! Error types for loading, fetching and decoding feeds.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The source configuration is missing, malformed or invalid.
    ConfigurationError,
    /// Connection failed, DNS resolution failed, body could not be read, etc.
    NetworkError,
    /// The request exceeded the fetch timeout.
    Timeout,
    /// The server answered with a non-success status.
    HttpStatus,
    /// The feed body is not a readable iCalendar document.
    FeedDecodeError,
}

impl ProviderErrorCode {
    /// Returns true for the transport family (network, timeout, HTTP status).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkError | Self::Timeout | Self::HttpStatus)
    }

    /// Returns a short name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
            Self::HttpStatus => "http_status",
            Self::FeedDecodeError => "feed_decode_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while loading sources or fetching and decoding feeds.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The feed URL involved, if any.
    url: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            url: None,
            source: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Timeout, message)
    }

    pub fn http_status(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::HttpStatus, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::FeedDecodeError, message)
    }

    /// Sets the feed URL for this error.
    pub fn with_url(mut self, url: impl fmt::Display) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns true if this error belongs to the transport family.
    pub fn is_network(&self) -> bool {
        self.code.is_network()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref url) = self.url {
            write!(f, " ({url})")?;
        }
        Ok(())
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
