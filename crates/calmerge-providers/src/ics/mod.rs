//! iCalendar decoding and encoding.
//!
//! Feeds are decoded into schema-free [`EventRecord`](calmerge_core::EventRecord)s
//! and the merged calendar is encoded back to RFC 5545 text.

mod generate;
mod parse;

pub use generate::encode_calendar;
pub use parse::decode_events;
