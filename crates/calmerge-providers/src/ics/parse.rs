//! Feed decoding using the icalendar crate's parser.

use icalendar::parser::{Component, Property, read_calendar, unfold};
use tracing::trace;

use calmerge_core::{EventRecord, FieldValue, Scalar};

use crate::error::{ProviderError, ProviderResult};

const BEGIN_CALENDAR: &str = "BEGIN:VCALENDAR";

/// Decodes every top-level `VEVENT` of a feed.
///
/// Property names are upper-cased and grouped in order of first appearance;
/// a property that appears more than once becomes a sequence. Parameters are
/// kept. Nested components such as `VALARM` and other top-level components
/// such as `VTIMEZONE` are dropped.
///
/// # Errors
///
/// Returns a [`FeedDecodeError`](crate::ProviderErrorCode::FeedDecodeError)
/// if the text is not an iCalendar document.
pub fn decode_events(text: &str) -> ProviderResult<Vec<EventRecord>> {
    let unfolded = unfold(text);
    if !starts_with_calendar(&unfolded) {
        return Err(ProviderError::decode("Feed does not start with BEGIN:VCALENDAR"));
    }

    let calendar = read_calendar(&unfolded)
        .map_err(|e| ProviderError::decode(format!("Invalid iCalendar data: {e}")))?;

    let events: Vec<_> = calendar
        .components
        .iter()
        .filter(|c| c.name.as_ref().eq_ignore_ascii_case("VEVENT"))
        .map(to_record)
        .collect();

    trace!(
        components = calendar.components.len(),
        events = events.len(),
        "Decoded feed"
    );
    Ok(events)
}

fn starts_with_calendar(text: &str) -> bool {
    text.trim_start_matches('\u{feff}')
        .trim_start()
        .get(..BEGIN_CALENDAR.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(BEGIN_CALENDAR))
}

fn to_record(component: &Component<'_>) -> EventRecord {
    let mut grouped: Vec<(String, Vec<Scalar>)> = Vec::new();

    for property in &component.properties {
        let name = property.name.as_ref().to_ascii_uppercase();
        let scalar = to_scalar(property);
        match grouped.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, values)) => values.push(scalar),
            None => grouped.push((name, vec![scalar])),
        }
    }

    grouped
        .into_iter()
        .fold(EventRecord::new(), |record, (name, values)| {
            match FieldValue::from_values(values) {
                Some(value) => record.with_field(name, value),
                None => record,
            }
        })
}

fn to_scalar(property: &Property<'_>) -> Scalar {
    property
        .params
        .iter()
        .filter_map(|param| {
            let value = param.val.as_ref()?;
            Some((param.key.as_ref().to_ascii_uppercase(), value.to_string()))
        })
        .fold(Scalar::text(property.val.to_string()), |scalar, (key, value)| {
            scalar.with_param(key, value)
        })
}
