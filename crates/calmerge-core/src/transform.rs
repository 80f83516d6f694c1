//! Event rewriting: substitutions, identity fallback and status policy.

use std::fmt;

use tracing::{debug, warn};

use crate::error::TransformError;
use crate::identity::derive_identity;
use crate::record::{EventRecord, FieldValue, fields};
use crate::source::Substitutions;

/// The status stamped on every merged event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EventStatus {
    /// `STATUS:CONFIRMED`
    #[default]
    Confirmed,
    /// `STATUS:CANCELLED`
    Cancelled,
}

impl EventStatus {
    /// Maps the confirmed/cancelled flag to a status.
    pub fn from_confirmed(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Cancelled
        }
    }

    /// The iCalendar value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds output events from source events.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    status: EventStatus,
}

impl Transformer {
    /// Creates a transformer that stamps `status` on every event.
    pub fn new(status: EventStatus) -> Self {
        Self { status }
    }

    /// The status this transformer stamps.
    pub fn status(&self) -> EventStatus {
        self.status
    }

    /// Produces a new event from `event`.
    ///
    /// Every source field is copied in order, except that a field with a
    /// non-empty substitution gets the substituted value (a multi-valued field
    /// collapses to that one value). `STATUS` is never substituted. A missing
    /// `UID` is derived from the rewritten event, and `STATUS` is finally set
    /// from the configured status.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::UnderivableIdentity`] if the event has no
    /// `UID` and nothing to derive one from.
    pub fn transform(
        &self,
        event: &EventRecord,
        substitutions: &Substitutions,
    ) -> Result<EventRecord, TransformError> {
        let mut copy = EventRecord::new();

        for (name, value) in event.iter() {
            let substitute = if name == fields::STATUS {
                None
            } else {
                substitutions.get(name)
            };

            match substitute {
                Some(replacement) => {
                    debug!(
                        field = name,
                        from = %value.string_form(),
                        to = replacement,
                        "Substituted field"
                    );
                    copy.set(name, FieldValue::text(replacement));
                }
                None => copy.set(name, value.clone()),
            }
        }

        if !event.contains(fields::UID) {
            let uid = derive_identity(&copy).ok_or(TransformError::UnderivableIdentity)?;
            warn!(
                uid = %uid,
                summary = copy.summary().unwrap_or_default(),
                "Event has no UID, generated one"
            );
            copy.set(fields::UID, FieldValue::text(uid));
        }

        copy.set(fields::STATUS, FieldValue::text(self.status.as_str()));
        Ok(copy)
    }
}

/// Transforms `event` with the status derived from `confirmed`.
///
/// # Errors
///
/// See [`Transformer::transform`].
pub fn transform(
    event: &EventRecord,
    substitutions: &Substitutions,
    confirmed: bool,
) -> Result<EventRecord, TransformError> {
    Transformer::new(EventStatus::from_confirmed(confirmed)).transform(event, substitutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::hash_identity;
    use crate::record::Scalar;

    fn shift() -> EventRecord {
        EventRecord::new()
            .with_field(
                "DTSTART",
                FieldValue::Scalar(
                    Scalar::text("20200103T090000").with_param("TZID", "America/Chicago"),
                ),
            )
            .with_text("DTEND", "20200103T120000Z")
            .with_text("SUMMARY", "Skip M")
            .with_text("LOCATION", "North Pool")
            .with_field(
                "CATEGORIES",
                FieldValue::Sequence(vec![Scalar::text("Lifeguard"), Scalar::text("Pool")]),
            )
    }

    #[test]
    fn unsubstituted_fields_are_copied() {
        let event = shift().with_text("UID", "abc@example.com");
        let subs = Substitutions::new().with("LOCATION", "");
        let out = transform(&event, &subs, true).unwrap();

        for name in ["DTSTART", "DTEND", "SUMMARY", "LOCATION", "CATEGORIES", "UID"] {
            assert_eq!(out.get(name), event.get(name), "field {name}");
        }
    }

    #[test]
    fn substitution_replaces_value() {
        let event = shift().with_text("UID", "abc@example.com");
        let subs = Substitutions::new().with("SUMMARY", "Renamed");
        let out = transform(&event, &subs, true).unwrap();
        assert_eq!(out.summary(), Some("Renamed"));
        assert_eq!(event.summary(), Some("Skip M"));
    }

    #[test]
    fn substitution_collapses_sequence() {
        let event = shift().with_text("UID", "abc@example.com");
        let subs = Substitutions::new().with("CATEGORIES", "Staff");
        let out = transform(&event, &subs, true).unwrap();
        assert_eq!(out.get("CATEGORIES"), Some(&FieldValue::text("Staff")));
    }

    #[test]
    fn substitution_for_absent_field_is_ignored() {
        let event = shift().with_text("UID", "abc@example.com");
        let subs = Substitutions::new().with("DESCRIPTION", "Bring whistle");
        let out = transform(&event, &subs, true).unwrap();
        assert!(!out.contains("DESCRIPTION"));
    }

    #[test]
    fn status_follows_flag_not_source() {
        let event = shift()
            .with_text("UID", "abc@example.com")
            .with_text("STATUS", "TENTATIVE");
        let subs = Substitutions::new().with("STATUS", "TENTATIVE");

        let confirmed = transform(&event, &subs, true).unwrap();
        assert_eq!(confirmed.status(), Some("CONFIRMED"));

        let cancelled = transform(&event, &subs, false).unwrap();
        assert_eq!(cancelled.status(), Some("CANCELLED"));
    }

    #[test]
    fn status_is_added_when_missing() {
        let out = transform(&shift(), &Substitutions::new(), true).unwrap();
        assert_eq!(out.status(), Some("CONFIRMED"));
        assert_eq!(out.iter().last().map(|(name, _)| name), Some("STATUS"));
    }

    #[test]
    fn existing_uid_is_kept_or_substituted() {
        let event = shift().with_text("UID", "abc@example.com");
        let out = transform(&event, &Substitutions::new(), true).unwrap();
        assert_eq!(out.uid(), Some("abc@example.com"));

        let subs = Substitutions::new().with("UID", "fixed@example.com");
        let out = transform(&event, &subs, true).unwrap();
        assert_eq!(out.uid(), Some("fixed@example.com"));
    }

    #[test]
    fn generated_uid_uses_rewritten_summary() {
        let subs = Substitutions::new().with("SUMMARY", "Renamed");
        let out = transform(&shift(), &subs, true).unwrap();

        let expected = hash_identity("2020-01-03T09:00:002020-01-03T12:00:00+00:00Renamed");
        assert_eq!(out.uid(), Some(expected.as_str()));
    }

    #[test]
    fn generated_uid_is_deterministic() {
        let a = transform(&shift(), &Substitutions::new(), true).unwrap();
        let b = transform(&shift(), &Substitutions::new(), false).unwrap();
        assert!(a.uid().is_some());
        assert_eq!(a.uid(), b.uid());
    }

    #[test]
    fn underivable_identity_is_an_error() {
        let event = EventRecord::new().with_text("LOCATION", "North Pool");
        let err = transform(&event, &Substitutions::new(), true).unwrap_err();
        assert!(matches!(err, TransformError::UnderivableIdentity));
    }

    #[test]
    fn source_event_is_untouched() {
        let event = shift();
        let before = event.clone();
        let _ = transform(&event, &Substitutions::new().with("SUMMARY", "Renamed"), false);
        assert_eq!(event, before);
    }
}
