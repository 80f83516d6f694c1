//! Schema-free event records.
//!
//! A decoded calendar component is an ordered list of named fields. Field
//! names are compared case-sensitively; the codec canonicalizes them to upper
//! case. Each field holds either one [`Scalar`] or a non-empty sequence of
//! them (a property that appeared several times, e.g. `CATEGORIES`).

use crate::time::EventTime;

/// Well-known field names.
pub mod fields {
    /// Event identity.
    pub const UID: &str = "UID";
    /// Event status.
    pub const STATUS: &str = "STATUS";
    /// Event title.
    pub const SUMMARY: &str = "SUMMARY";
    /// Start of the event.
    pub const DTSTART: &str = "DTSTART";
    /// End of the event.
    pub const DTEND: &str = "DTEND";
}

/// A single property value together with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    value: String,
    params: Vec<(String, String)>,
}

impl Scalar {
    /// Creates a text value with no parameters.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            params: Vec::new(),
        }
    }

    /// Builder method to attach a parameter (e.g. `TZID`).
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// The raw textual value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The parameters in feed order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Looks up a parameter by name, ignoring ASCII case.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Typed access to date and date-time values.
    pub fn as_time(&self) -> Option<EventTime> {
        EventTime::parse(&self.value, self.param("VALUE"), self.param("TZID"))
    }
}

/// The value of one field: a scalar or an ordered, non-empty sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A property that appeared once.
    Scalar(Scalar),
    /// A property that appeared several times, in feed order.
    Sequence(Vec<Scalar>),
}

impl FieldValue {
    /// Shorthand for a parameterless text scalar.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::text(value))
    }

    /// Builds a field from the values of a property, collapsing a single
    /// value to a scalar. Returns `None` for an empty list.
    pub fn from_values(mut values: Vec<Scalar>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Self::Scalar),
            _ => Some(Self::Sequence(values)),
        }
    }

    /// All scalars of this field, in order.
    pub fn scalars(&self) -> &[Scalar] {
        match self {
            Self::Scalar(scalar) => std::slice::from_ref(scalar),
            Self::Sequence(values) => values,
        }
    }

    /// The first scalar of this field.
    pub fn first(&self) -> Option<&Scalar> {
        self.scalars().first()
    }

    /// Returns `true` for multi-valued fields.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    /// The string form used by match rules.
    ///
    /// Sequence elements are joined with `,`, the iCalendar list separator.
    pub fn string_form(&self) -> String {
        match self {
            Self::Scalar(scalar) => scalar.value().to_string(),
            Self::Sequence(values) => values
                .iter()
                .map(Scalar::value)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// One decoded calendar component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRecord {
    fields: Vec<(String, FieldValue)>,
}

impl EventRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set a field.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    /// Builder method to set a text field.
    pub fn with_text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_field(name, FieldValue::text(value))
    }

    /// Looks up a field by exact name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Returns `true` if the field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets a field, replacing an existing value in place or appending a new
    /// field at the end.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Iterates over the fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The `UID` value, if any.
    pub fn uid(&self) -> Option<&str> {
        self.first_value(fields::UID)
    }

    /// The `SUMMARY` value, if any.
    pub fn summary(&self) -> Option<&str> {
        self.first_value(fields::SUMMARY)
    }

    /// The `STATUS` value, if any.
    pub fn status(&self) -> Option<&str> {
        self.first_value(fields::STATUS)
    }

    /// Typed `DTSTART`.
    pub fn start(&self) -> Option<EventTime> {
        self.first_scalar(fields::DTSTART).and_then(Scalar::as_time)
    }

    /// Typed `DTEND`.
    pub fn end(&self) -> Option<EventTime> {
        self.first_scalar(fields::DTEND).and_then(Scalar::as_time)
    }

    fn first_scalar(&self, name: &str) -> Option<&Scalar> {
        self.get(name).and_then(FieldValue::first)
    }

    fn first_value(&self, name: &str) -> Option<&str> {
        self.first_scalar(name).map(Scalar::value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_keep_insertion_order() {
        let record = EventRecord::new()
            .with_text("SUMMARY", "Skip M")
            .with_text("DTSTART", "20200103T100000Z")
            .with_text("LOCATION", "Pool");

        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["SUMMARY", "DTSTART", "LOCATION"]);
    }

    #[test]
    fn set_replaces_in_place() {
        let mut record = EventRecord::new()
            .with_text("STATUS", "TENTATIVE")
            .with_text("SUMMARY", "Skip M");
        record.set("STATUS", FieldValue::text("CONFIRMED"));

        assert_eq!(record.len(), 2);
        assert_eq!(record.iter().next().unwrap().0, "STATUS");
        assert_eq!(record.status(), Some("CONFIRMED"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let record = EventRecord::new().with_text("SUMMARY", "Skip M");
        assert!(record.contains("SUMMARY"));
        assert!(!record.contains("summary"));
    }

    #[test]
    fn typed_time_access_uses_parameters() {
        let record = EventRecord::new()
            .with_field(
                "DTSTART",
                FieldValue::Scalar(Scalar::text("20200103").with_param("VALUE", "DATE")),
            )
            .with_field(
                "DTEND",
                FieldValue::Scalar(
                    Scalar::text("20200103T170000").with_param("TZID", "Europe/Paris"),
                ),
            );

        assert!(record.start().unwrap().is_all_day());
        assert!(matches!(record.end(), Some(EventTime::Zoned { .. })));
    }

    #[test]
    fn sequence_string_form_joins_values() {
        let value = FieldValue::from_values(vec![Scalar::text("Pool"), Scalar::text("Staff")])
            .unwrap();
        assert!(value.is_sequence());
        assert_eq!(value.string_form(), "Pool,Staff");
        assert_eq!(value.first().map(Scalar::value), Some("Pool"));
    }

    #[test]
    fn single_value_collapses_to_scalar() {
        let value = FieldValue::from_values(vec![Scalar::text("Pool")]).unwrap();
        assert_eq!(value, FieldValue::text("Pool"));
        assert!(FieldValue::from_values(Vec::new()).is_none());
    }
}
