//! The merge engine: filter, transform and collect events from every feed
//! into one calendar.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::{MergeError, MergeResult};
use crate::filter::{EventFilter, FilterVerdict};
use crate::record::EventRecord;
use crate::source::DecodedFeed;
use crate::time::DateRange;
use crate::transform::{EventStatus, Transformer};

/// Product identifier written to the merged calendar unless overridden.
pub const DEFAULT_PRODUCT_ID: &str = "-//icalcombine//NONSGML//EN";

/// iCalendar version of the merged calendar.
pub const CALENDAR_VERSION: &str = "2.0";

/// Display name (`X-WR-CALNAME`) of the merged calendar unless overridden.
pub const DEFAULT_CALENDAR_NAME: &str = "Lifeguard Schedule";

/// Options for a merge run.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    product_id: String,
    display_name: String,
    status: EventStatus,
    date_range: Option<DateRange>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            display_name: DEFAULT_CALENDAR_NAME.to_string(),
            status: EventStatus::default(),
            date_range: None,
        }
    }
}

impl MergeOptions {
    /// Default options: confirmed events, no date range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the product identifier.
    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = product_id.into();
        self
    }

    /// Builder method to set the calendar display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Builder method to set the status stamped on every event.
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder method to restrict events to a date range.
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn date_range(&self) -> Option<DateRange> {
        self.date_range
    }
}

/// The merged output calendar.
///
/// Every event has a `UID` that is unique within the calendar.
#[derive(Debug, Clone)]
pub struct MergedCalendar {
    product_id: String,
    name: String,
    events: Vec<EventRecord>,
    // uid -> configuration row that produced it
    seen: HashMap<String, usize>,
}

impl MergedCalendar {
    /// Creates an empty calendar.
    pub fn new(product_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            events: Vec::new(),
            seen: HashMap::new(),
        }
    }

    /// Appends `event`, produced by configuration row `row`.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::DuplicateIdentity`] if an event with the same
    /// `UID` is already present. The calendar is left unchanged.
    pub fn try_push(&mut self, event: EventRecord, row: usize) -> MergeResult<()> {
        let uid = event.uid().unwrap_or_default().to_string();
        if let Some(&first_row) = self.seen.get(&uid) {
            return Err(MergeError::duplicate_identity(uid, first_row, row));
        }
        self.seen.insert(uid, row);
        self.events.push(event);
        Ok(())
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn version(&self) -> &str {
        CALENDAR_VERSION
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The events in merge order.
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Runs the filter and transformer over decoded feeds.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    options: MergeOptions,
}

impl MergeEngine {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merges `feeds` in order into one calendar.
    ///
    /// Events keep feed order, and feeds keep configuration order. Nothing is
    /// re-sorted.
    ///
    /// # Errors
    ///
    /// Fails on the first event that cannot be transformed or whose `UID`
    /// collides with an event already merged. No partial calendar is
    /// returned.
    pub fn merge(&self, feeds: &[DecodedFeed]) -> MergeResult<MergedCalendar> {
        let filter = match self.options.date_range {
            Some(range) => EventFilter::new().with_date_range(range),
            None => EventFilter::new(),
        };
        let transformer = Transformer::new(self.options.status);
        let mut calendar =
            MergedCalendar::new(&self.options.product_id, &self.options.display_name);

        for feed in feeds {
            let source = &feed.source;
            let row = source.row();
            let mut included = 0usize;
            let mut excluded = 0usize;

            for event in &feed.events {
                match filter.evaluate(event, source.match_rules()) {
                    FilterVerdict::Include => {}
                    FilterVerdict::Exclude(reason) => {
                        debug!(
                            row,
                            url = %source.url(),
                            kind = reason.kind(),
                            summary = event.summary().unwrap_or_default(),
                            "Excluded event: {reason}"
                        );
                        excluded += 1;
                        continue;
                    }
                }

                let merged = transformer
                    .transform(event, source.substitutions())
                    .map_err(|source| MergeError::Transform { row, source })?;
                calendar.try_push(merged, row)?;
                included += 1;
            }

            info!(row, url = %source.url(), included, excluded, "Merged feed");
        }

        info!(
            feeds = feeds.len(),
            events = calendar.len(),
            "Merged calendar"
        );
        Ok(calendar)
    }
}
