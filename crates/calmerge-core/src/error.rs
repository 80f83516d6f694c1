//! Error types for rule compilation, transformation and merging.

use thiserror::Error;

/// Errors raised while building match rules.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The pattern is not a valid regular expression.
    #[error("invalid match pattern for {field} ({pattern:?}): {source}")]
    InvalidPattern {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while transforming a single event.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The event has no UID and none of DTSTART, DTEND or SUMMARY to derive
    /// one from.
    #[error("event has no UID and no DTSTART, DTEND or SUMMARY to derive one from")]
    UnderivableIdentity,
}

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that abort a merge. No partial calendar is produced.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Two merged events share a UID.
    #[error(
        "duplicate event identity {uid:?}: produced by configuration row {first_row} and again by row {duplicate_row}"
    )]
    DuplicateIdentity {
        uid: String,
        first_row: usize,
        duplicate_row: usize,
    },

    /// An event from the given row could not be transformed.
    #[error("configuration row {row}: {source}")]
    Transform {
        row: usize,
        #[source]
        source: TransformError,
    },
}

impl MergeError {
    /// Creates a duplicate identity error.
    pub fn duplicate_identity(uid: impl Into<String>, first_row: usize, duplicate_row: usize) -> Self {
        Self::DuplicateIdentity {
            uid: uid.into(),
            first_row,
            duplicate_row,
        }
    }
}
