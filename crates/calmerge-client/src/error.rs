//! Client error types.

use std::path::PathBuf;

use thiserror::Error;

use calmerge_core::{MergeError, TracingError};
use calmerge_providers::ProviderError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Loading the configuration or fetching and decoding a feed failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Merging failed (duplicate identity, underivable identity).
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Writing the output file failed.
    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Logging could not be set up.
    #[error(transparent)]
    Tracing(#[from] TracingError),
}
