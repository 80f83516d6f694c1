//! Deterministic identities for events that arrive without a `UID`.
//!
//! The identity is the lowercase hex SHA-256 digest of the UTF-8 bytes of
//! `iso(DTSTART) + iso(DTEND) + SUMMARY`, where each part is left out when the
//! field is absent and a value that is not a date/time contributes its raw
//! text. See [`EventTime::to_iso`](crate::time::EventTime::to_iso) for the ISO
//! renderings.

use sha2::{Digest, Sha256};

use crate::record::{EventRecord, FieldValue, fields};

/// The string an identity is hashed from, or `None` if it would be empty.
pub fn identity_input(event: &EventRecord) -> Option<String> {
    let mut input = String::new();

    for name in [fields::DTSTART, fields::DTEND] {
        if let Some(scalar) = event.get(name).and_then(FieldValue::first) {
            match scalar.as_time() {
                Some(time) => input.push_str(&time.to_iso()),
                None => input.push_str(scalar.value()),
            }
        }
    }

    if let Some(summary) = event.get(fields::SUMMARY) {
        input.push_str(&summary.string_form());
    }

    (!input.is_empty()).then_some(input)
}

/// Hashes an identity input.
pub fn hash_identity(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    format!("{digest:x}")
}

/// Derives the identity of `event` from its start, end and summary.
pub fn derive_identity(event: &EventRecord) -> Option<String> {
    identity_input(event).map(|input| hash_identity(&input))
}
