//! Core types: event records, times, sources, filtering, transformation and
//! merging.

pub mod error;
pub mod filter;
pub mod identity;
pub mod merge;
pub mod record;
pub mod source;
pub mod time;
pub mod tracing;
pub mod transform;

pub use error::{MergeError, MergeResult, RuleError, TransformError};
pub use filter::{EventFilter, Exclusion, FilterVerdict, matches};
pub use identity::{derive_identity, hash_identity, identity_input};
pub use merge::{
    CALENDAR_VERSION, DEFAULT_CALENDAR_NAME, DEFAULT_PRODUCT_ID, MergeEngine, MergeOptions,
    MergedCalendar,
};
pub use record::{EventRecord, FieldValue, Scalar, fields};
pub use source::{
    DecodedFeed, MatchRule, MatchRules, SourceDescriptor, Substitutions, location_of,
};
pub use time::{DateRange, EventTime};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use transform::{EventStatus, Transformer, transform};
