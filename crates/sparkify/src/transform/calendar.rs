//! Calendar dimension derived from event timestamps.

use chrono::{DateTime, Datelike, Timelike, Utc};
use indexmap::IndexSet;

use crate::error::TransformError;
use crate::model::{EventRecord, TimeDimension};

/// Convert epoch milliseconds to a UTC timestamp.
pub fn to_timestamp(ts: i64) -> Result<DateTime<Utc>, TransformError> {
    DateTime::from_timestamp_millis(ts).ok_or(TransformError::TimestampOutOfRange { ts })
}

/// One row per distinct `ts` across all events, in first-seen order.
pub fn derive_time(events: &[EventRecord]) -> Result<Vec<TimeDimension>, TransformError> {
    let distinct: IndexSet<i64> = events.iter().map(|event| event.ts).collect();
    distinct.into_iter().map(calendar_row).collect()
}

fn calendar_row(ts: i64) -> Result<TimeDimension, TransformError> {
    let start_time = to_timestamp(ts)?;
    Ok(TimeDimension {
        start_time,
        hour: start_time.hour() as i32,
        day: start_time.day() as i32,
        week: start_time.iso_week().week() as i32,
        month: start_time.month() as i32,
        year: start_time.year(),
        weekday: start_time.weekday().number_from_sunday() as i32,
    })
}
