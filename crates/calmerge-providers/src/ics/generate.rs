//! Merged calendar encoding.

use icalendar::{Calendar, Component, Property};

use calmerge_core::{EventRecord, FieldValue, MergedCalendar, Scalar};

/// Calendar-level lines the icalendar crate writes on its own; they are
/// replaced by the merged calendar's metadata.
const GENERATED_HEADER: [&str; 3] = ["PRODID:", "VERSION:", "CALSCALE:"];

/// Encodes the merged calendar as iCalendar text.
///
/// Events are written in merge order with their parameters. The header
/// carries exactly the calendar's `PRODID`, `VERSION` and `X-WR-CALNAME`.
/// Events without a `DTSTAMP` get one from the encoder.
pub fn encode_calendar(calendar: &MergedCalendar) -> String {
    let mut cal = Calendar::new();
    cal.append_property(Property::new("X-WR-CALNAME", calendar.name()));

    for record in calendar.events() {
        cal.push(to_event(record));
    }

    rewrite_header(
        &cal.done().to_string(),
        calendar.product_id(),
        calendar.version(),
    )
}

fn to_event(record: &EventRecord) -> icalendar::Event {
    let mut event = icalendar::Event::new();

    for (name, value) in record.iter() {
        match value {
            FieldValue::Scalar(scalar) => {
                event.append_property(to_property(name, scalar));
            }
            FieldValue::Sequence(values) => {
                for scalar in values {
                    event.append_multi_property(to_property(name, scalar));
                }
            }
        }
    }

    event.done()
}

fn to_property(name: &str, scalar: &Scalar) -> Property {
    let mut prop = Property::new(name, scalar.value());
    for (key, value) in scalar.params() {
        prop.add_parameter(key, value);
    }
    prop
}

fn rewrite_header(ics: &str, product_id: &str, version: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut in_header = false;

    for line in ics.lines() {
        if line == "BEGIN:VCALENDAR" {
            result.push_str(line);
            result.push_str("\r\n");
            result.push_str(&format!("PRODID:{product_id}\r\n"));
            result.push_str(&format!("VERSION:{version}\r\n"));
            in_header = true;
            continue;
        }

        if in_header {
            if line.starts_with("BEGIN:") || line.starts_with("END:") {
                in_header = false;
            } else if GENERATED_HEADER.iter().any(|prefix| line.starts_with(prefix)) {
                continue;
            }
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}
