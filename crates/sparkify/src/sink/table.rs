//! Arrow encoding of the star-schema tables.

use std::sync::{Arc, LazyLock};

use arrow::array::{
    ArrayRef, Float64Array, Int32Array, Int64Array, RecordBatch, StringArray,
    TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;
use chrono::{DateTime, Utc};

use crate::model::{ArtistDimension, SongDimension, SongplayFact, TimeDimension, UserDimension};

/// A row type that can be written as an output table.
pub trait TableRows: Sized {
    /// Table name, used for logging and metrics.
    const NAME: &'static str;

    /// Full schema, including partition columns.
    fn schema() -> SchemaRef;

    /// Build a single record batch holding all rows.
    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError>;
}

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

fn timestamps<'a>(values: impl Iterator<Item = &'a DateTime<Utc>>) -> ArrayRef {
    let micros: Vec<i64> = values.map(DateTime::timestamp_micros).collect();
    Arc::new(TimestampMicrosecondArray::from(micros).with_timezone("UTC"))
}

fn strings<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn nullable_strings<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(values.collect::<StringArray>())
}

fn ints(values: impl Iterator<Item = i32>) -> ArrayRef {
    Arc::new(Int32Array::from_iter_values(values))
}

static SONGS_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("song_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("artist_id", DataType::Utf8, false),
        Field::new("year", DataType::Int32, false),
        Field::new("duration", DataType::Float64, false),
    ]))
});

impl TableRows for SongDimension {
    const NAME: &'static str = "songs";

    fn schema() -> SchemaRef {
        SONGS_SCHEMA.clone()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                strings(rows.iter().map(|r| r.song_id.as_str())),
                strings(rows.iter().map(|r| r.title.as_str())),
                strings(rows.iter().map(|r| r.artist_id.as_str())),
                ints(rows.iter().map(|r| r.year)),
                Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.duration))),
            ],
        )
    }
}

static ARTISTS_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("artist_id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("location", DataType::Utf8, true),
        Field::new("latitude", DataType::Float64, true),
        Field::new("longitude", DataType::Float64, true),
    ]))
});

impl TableRows for ArtistDimension {
    const NAME: &'static str = "artists";

    fn schema() -> SchemaRef {
        ARTISTS_SCHEMA.clone()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                strings(rows.iter().map(|r| r.artist_id.as_str())),
                strings(rows.iter().map(|r| r.name.as_str())),
                nullable_strings(rows.iter().map(|r| r.location.as_deref())),
                Arc::new(rows.iter().map(|r| r.latitude).collect::<Float64Array>()),
                Arc::new(rows.iter().map(|r| r.longitude).collect::<Float64Array>()),
            ],
        )
    }
}

static TIME_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("start_time", timestamp_type(), false),
        Field::new("hour", DataType::Int32, false),
        Field::new("day", DataType::Int32, false),
        Field::new("week", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("year", DataType::Int32, false),
        Field::new("weekday", DataType::Int32, false),
    ]))
});

impl TableRows for TimeDimension {
    const NAME: &'static str = "time";

    fn schema() -> SchemaRef {
        TIME_SCHEMA.clone()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                timestamps(rows.iter().map(|r| &r.start_time)),
                ints(rows.iter().map(|r| r.hour)),
                ints(rows.iter().map(|r| r.day)),
                ints(rows.iter().map(|r| r.week)),
                ints(rows.iter().map(|r| r.month)),
                ints(rows.iter().map(|r| r.year)),
                ints(rows.iter().map(|r| r.weekday)),
            ],
        )
    }
}

static USERS_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("user_id", DataType::Utf8, false),
        Field::new("first_name", DataType::Utf8, true),
        Field::new("last_name", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
    ]))
});

impl TableRows for UserDimension {
    const NAME: &'static str = "users";

    fn schema() -> SchemaRef {
        USERS_SCHEMA.clone()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                strings(rows.iter().map(|r| r.user_id.as_str())),
                nullable_strings(rows.iter().map(|r| r.first_name.as_deref())),
                nullable_strings(rows.iter().map(|r| r.last_name.as_deref())),
                nullable_strings(rows.iter().map(|r| r.gender.as_deref())),
                nullable_strings(rows.iter().map(|r| r.level.as_deref())),
            ],
        )
    }
}

static SONGPLAYS_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("songplay_id", DataType::Utf8, false),
        Field::new("start_time", timestamp_type(), false),
        Field::new("user_id", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("song_id", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("session_id", DataType::Int64, false),
        Field::new("location", DataType::Utf8, true),
        Field::new("user_agent", DataType::Utf8, true),
    ]))
});

impl TableRows for SongplayFact {
    const NAME: &'static str = "songplays";

    fn schema() -> SchemaRef {
        SONGPLAYS_SCHEMA.clone()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                strings(rows.iter().map(|r| r.songplay_id.as_str())),
                timestamps(rows.iter().map(|r| &r.start_time)),
                nullable_strings(rows.iter().map(|r| r.user_id.as_deref())),
                nullable_strings(rows.iter().map(|r| r.level.as_deref())),
                nullable_strings(rows.iter().map(|r| r.song_id.as_deref())),
                nullable_strings(rows.iter().map(|r| r.artist_id.as_deref())),
                Arc::new(Int64Array::from_iter_values(
                    rows.iter().map(|r| r.session_id),
                )),
                nullable_strings(rows.iter().map(|r| r.location.as_deref())),
                nullable_strings(rows.iter().map(|r| r.user_agent.as_deref())),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Int32Type, TimestampMicrosecondType};

    #[test]
    fn test_time_batch_uses_utc_microseconds() {
        let start_time = DateTime::from_timestamp_millis(1_704_641_400_000).unwrap();
        let rows = vec![TimeDimension {
            start_time,
            hour: 15,
            day: 7,
            week: 1,
            month: 1,
            year: 2024,
            weekday: 1,
        }];

        let batch = TimeDimension::to_batch(&rows).unwrap();
        assert_eq!(batch.num_rows(), 1);

        let column = batch.column(0).as_primitive::<TimestampMicrosecondType>();
        assert_eq!(column.value(0), 1_704_641_400_000_000);
        assert_eq!(
            batch.schema().field(0).data_type(),
            &DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
        );
        assert_eq!(batch.column(6).as_primitive::<Int32Type>().value(0), 1);
    }

    #[test]
    fn test_songplay_batch_keeps_nulls() {
        let rows = vec![SongplayFact {
            songplay_id: "id".to_string(),
            start_time: DateTime::from_timestamp_millis(0).unwrap(),
            user_id: Some("42".to_string()),
            level: None,
            song_id: None,
            artist_id: None,
            session_id: 9,
            location: None,
            user_agent: None,
        }];

        let batch = SongplayFact::to_batch(&rows).unwrap();
        let song_id = batch.column_by_name("song_id").unwrap();
        assert!(song_id.is_null(0));
        assert_eq!(batch.column_by_name("user_id").unwrap().null_count(), 0);
    }

    #[test]
    fn test_empty_batch_has_schema() {
        let batch = UserDimension::to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 5);
    }
}
