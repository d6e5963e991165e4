//! Main batch pipeline.
//!
//! One run reads both record families, builds the five star-schema tables
//! in memory and replaces each table under the output root:
//!
//! ```text
//! song_data ─┬─> songs, artists
//!            └─┐
//! log_data ──┬─┴> songplays
//!            ├──> time
//!            └──> users
//! ```
//!
//! There is no state between runs; re-running on the same input produces the
//! same files.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use sparkify_core::emit;
use sparkify_core::metrics::events::TableRowsBuilt;
use sparkify_core::{StorageProvider, StorageProviderRef};

use crate::config::Config;
use crate::error::PipelineError;
use crate::model::{
    ArtistDimension, CatalogRecord, EventRecord, SongDimension, SongplayFact, TimeDimension,
    UserDimension,
};
use crate::sink::{TableRows, TableSink, TableWriteStats};
use crate::source::RecordReader;
use crate::transform::{
    JoinOptions, build_artists, build_songplays, build_songs, build_users, derive_time,
};

/// Output partitioning of the `songs` table.
pub const SONGS_PARTITION_COLUMNS: &[&str] = &["year", "artist_id"];

/// Output partitioning of the `time` table.
pub const TIME_PARTITION_COLUMNS: &[&str] = &["year", "month"];

/// Statistics about the pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub catalog_records: usize,
    pub event_records: usize,
    pub tables: Vec<TableWriteStats>,
}

impl PipelineStats {
    /// Rows written for `table`, if it was written.
    pub fn rows(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }

    pub fn files_written(&self) -> usize {
        self.tables.iter().map(|t| t.files).sum()
    }

    pub fn bytes_written(&self) -> usize {
        self.tables.iter().map(|t| t.bytes).sum()
    }
}

/// The five output tables of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct StarSchema {
    pub songs: Vec<SongDimension>,
    pub artists: Vec<ArtistDimension>,
    pub time: Vec<TimeDimension>,
    pub users: Vec<UserDimension>,
    pub songplays: Vec<SongplayFact>,
}

impl StarSchema {
    /// Build every table from the raw record sets.
    pub fn build(
        catalog: &[CatalogRecord],
        events: &[EventRecord],
        join: &JoinOptions,
    ) -> Result<Self, PipelineError> {
        let schema = Self {
            songs: build_songs(catalog),
            artists: build_artists(catalog),
            time: derive_time(events)?,
            users: build_users(events),
            songplays: build_songplays(events, catalog, join)?,
        };

        record_rows(&schema.songs);
        record_rows(&schema.artists);
        record_rows(&schema.time);
        record_rows(&schema.users);
        record_rows(&schema.songplays);

        Ok(schema)
    }

    /// Replace all five tables under the sink's root.
    ///
    /// Tables are committed one after another; a failure stops the run and
    /// leaves tables committed so far in place.
    pub async fn write(&self, sink: &TableSink) -> Result<Vec<TableWriteStats>, PipelineError> {
        Ok(vec![
            sink.write(&self.songs, SongDimension::NAME, SONGS_PARTITION_COLUMNS)
                .await?,
            sink.write(&self.artists, ArtistDimension::NAME, &[]).await?,
            sink.write(&self.time, TimeDimension::NAME, TIME_PARTITION_COLUMNS)
                .await?,
            sink.write(&self.users, UserDimension::NAME, &[]).await?,
            sink.write(&self.songplays, SongplayFact::NAME, &[]).await?,
        ])
    }
}

fn record_rows<T: TableRows>(rows: &[T]) {
    emit!(TableRowsBuilt {
        count: rows.len(),
        table: T::NAME,
    });
    info!(target = %T::NAME, rows = rows.len(), "Built table");
}

/// Run the full pipeline once.
///
/// The configuration must already be validated.
pub async fn run_pipeline(config: &Config) -> Result<PipelineStats, PipelineError> {
    let start = Instant::now();
    info!(
        input = %config.input.root,
        output = %config.output.root,
        "Starting sparkify run"
    );

    let input: StorageProviderRef = Arc::new(
        StorageProvider::for_url_with_options(&config.input.root, &config.input.storage_options)
            .await?,
    );
    let reader = RecordReader::new(input, config.input.max_concurrent_files);

    // Open the output before reading so a bad output location fails fast.
    let sink = TableSink::for_url(
        &config.output.root,
        &config.output.storage_options,
        config.output.writer_config(),
    )
    .await?;

    let catalog: Vec<CatalogRecord> = reader.read(&config.input.song_data, "song_data").await?;
    let events: Vec<EventRecord> = reader.read(&config.input.log_data, "log_data").await?;

    let schema = StarSchema::build(&catalog, &events, &config.transform.join_options())?;
    let tables = schema.write(&sink).await?;

    let stats = PipelineStats {
        catalog_records: catalog.len(),
        event_records: events.len(),
        tables,
    };

    info!(
        run_id = %sink.run_id(),
        files = stats.files_written(),
        bytes = stats.bytes_written(),
        duration_ms = start.elapsed().as_millis(),
        "Sparkify run complete"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_stats_default() {
        let stats = PipelineStats::default();
        assert_eq!(stats.catalog_records, 0);
        assert_eq!(stats.files_written(), 0);
        assert_eq!(stats.rows("songs"), None);
    }

    #[test]
    fn test_build_from_empty_input() {
        let schema = StarSchema::build(&[], &[], &JoinOptions::default()).unwrap();
        assert!(schema.songs.is_empty());
        assert!(schema.songplays.is_empty());
    }

    #[test]
    fn test_out_of_range_timestamp_aborts_build() {
        let event: EventRecord = serde_json::from_str(
            r#"{"ts": 9223372036854775807, "sessionId": 1, "page": "Home"}"#,
        )
        .unwrap();

        let result = StarSchema::build(&[], &[event], &JoinOptions::default());
        assert!(matches!(result, Err(PipelineError::Transform { .. })));
    }
}
