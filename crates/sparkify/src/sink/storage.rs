//! Table sink with full-overwrite semantics.
//!
//! Each table is written in three steps:
//! 1. encoded files are staged under `{table}/_temporary/{run_id}/`
//! 2. every other object under `{table}/` is deleted
//! 3. staged files are renamed into place and a `_SUCCESS` marker is written
//!
//! A failure before step 2 leaves the previous output untouched.

use std::collections::HashMap;
use std::time::Instant;

use object_store::PutPayload;
use object_store::path::Path;
use snafu::prelude::*;
use tracing::{debug, info};
use uuid::Uuid;

use sparkify_core::emit;
use sparkify_core::metrics::events::{ParquetFileWritten, TableCommitted};
use sparkify_core::{StorageProvider, StorageProviderRef};

use super::table::TableRows;
use super::writer::{FinishedFile, ParquetWriter, ParquetWriterConfig};
use crate::error::{BatchBuildSnafu, SinkError, StorageError, TableStorageSnafu};

/// Directory holding in-flight files of a table.
pub const STAGING_DIR: &str = "_temporary";

/// Marker written once a table has been fully replaced.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Summary of one committed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWriteStats {
    pub table: &'static str,
    pub rows: usize,
    pub files: usize,
    pub bytes: usize,
}

/// Writes tables below an output root.
pub struct TableSink {
    storage: StorageProviderRef,
    writer_config: ParquetWriterConfig,
    run_id: String,
}

impl TableSink {
    pub fn new(storage: StorageProviderRef, writer_config: ParquetWriterConfig) -> Self {
        Self {
            storage,
            writer_config,
            run_id: Uuid::now_v7().to_string(),
        }
    }

    /// Create a sink for the given output URI.
    pub async fn for_url(
        output_uri: &str,
        storage_options: &HashMap<String, String>,
        writer_config: ParquetWriterConfig,
    ) -> Result<Self, StorageError> {
        debug!(output_uri = %output_uri, "Creating TableSink");
        let storage = StorageProvider::for_url_with_options(output_uri, storage_options).await?;
        Ok(Self::new(storage.into(), writer_config))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Replace the table at `path` with `rows`, partitioned by
    /// `partition_columns` (in directory nesting order).
    pub async fn write<T: TableRows>(
        &self,
        rows: &[T],
        path: &str,
        partition_columns: &[&str],
    ) -> Result<TableWriteStats, SinkError> {
        let start = Instant::now();
        let table = T::NAME;
        let path = path.trim_matches('/');

        let batch = T::to_batch(rows).context(BatchBuildSnafu { table })?;
        let files =
            ParquetWriter::new(table, self.writer_config.clone(), partition_columns).write(&batch)?;

        let staging = format!("{path}/{STAGING_DIR}/{}", self.run_id);
        self.stage(table, &staging, &files).await?;
        self.clear_previous(table, path, &staging).await?;
        self.publish(table, path, &staging, &files).await?;

        let stats = TableWriteStats {
            table,
            rows: batch.num_rows(),
            files: files.len(),
            bytes: files.iter().map(|f| f.size).sum(),
        };

        emit!(TableCommitted {
            table,
            duration: start.elapsed(),
        });
        info!(
            target = %table,
            path = %path,
            rows = stats.rows,
            files = stats.files,
            bytes = stats.bytes,
            "Committed table"
        );

        Ok(stats)
    }

    async fn stage(
        &self,
        table: &'static str,
        staging: &str,
        files: &[FinishedFile],
    ) -> Result<(), SinkError> {
        for file in files {
            let staged = object_path(table, format!("{staging}/{}", file.filename))?;
            self.storage
                .put_parquet(&staged, PutPayload::from(file.bytes.clone()))
                .await
                .context(TableStorageSnafu { table })?;

            emit!(ParquetFileWritten {
                bytes: file.size,
                table,
            });
            debug!(
                target = %table,
                path = %staged,
                size = file.size,
                records = file.record_count,
                partition = ?file.partition_values,
                "Staged parquet file"
            );
        }
        Ok(())
    }

    /// Delete everything under `path` except this run's staging directory.
    async fn clear_previous(
        &self,
        table: &'static str,
        path: &str,
        staging: &str,
    ) -> Result<(), SinkError> {
        let staging_prefix = format!("{staging}/");
        let existing = self
            .storage
            .list_with_prefix(path)
            .await
            .context(TableStorageSnafu { table })?;

        let stale: Vec<Path> = existing
            .into_iter()
            .filter(|object| !object.as_ref().starts_with(&staging_prefix))
            .collect();

        if !stale.is_empty() {
            debug!(target = %table, objects = stale.len(), "Removing previous output");
        }
        for object in &stale {
            self.storage
                .delete(object)
                .await
                .context(TableStorageSnafu { table })?;
        }
        Ok(())
    }

    async fn publish(
        &self,
        table: &'static str,
        path: &str,
        staging: &str,
        files: &[FinishedFile],
    ) -> Result<(), SinkError> {
        for file in files {
            let from = object_path(table, format!("{staging}/{}", file.filename))?;
            let to = object_path(table, format!("{path}/{}", file.filename))?;
            self.storage
                .rename(&from, &to)
                .await
                .context(TableStorageSnafu { table })?;
        }

        self.storage
            .prune_empty_dirs(&format!("{path}/{STAGING_DIR}"))
            .await
            .context(TableStorageSnafu { table })?;
        self.storage
            .prune_empty_dirs(path)
            .await
            .context(TableStorageSnafu { table })?;

        self.storage
            .atomic_write(
                &object_path(table, format!("{path}/{SUCCESS_MARKER}"))?,
                Vec::new(),
            )
            .await
            .context(TableStorageSnafu { table })
    }
}

/// Parse an already-escaped path without encoding it again.
fn object_path(table: &'static str, raw: String) -> Result<Path, SinkError> {
    Path::parse(&raw)
        .map_err(|e| StorageError::ObjectStore { source: e.into() })
        .context(TableStorageSnafu { table })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SongDimension;
    use tempfile::TempDir;

    fn song(song_id: &str, artist_id: &str, year: i32) -> SongDimension {
        SongDimension {
            song_id: song_id.to_string(),
            title: format!("title {song_id}"),
            artist_id: artist_id.to_string(),
            year,
            duration: 100.0,
        }
    }

    async fn sink_for(dir: &TempDir) -> TableSink {
        TableSink::for_url(
            dir.path().to_str().unwrap(),
            &HashMap::new(),
            ParquetWriterConfig::default(),
        )
        .await
        .unwrap()
    }

    fn list_files(dir: &std::path::Path) -> Vec<String> {
        fn walk(root: &std::path::Path, dir: &std::path::Path, out: &mut Vec<String>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(root, &path, out);
                } else {
                    out.push(path.strip_prefix(root).unwrap().to_string_lossy().into_owned());
                }
            }
        }
        let mut out = Vec::new();
        walk(dir, dir, &mut out);
        out.sort();
        out
    }

    #[tokio::test]
    async fn test_write_partitioned_table() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_for(&temp_dir).await;

        let stats = sink
            .write(
                &[song("S1", "A1", 2020), song("S2", "A2", 2019)],
                "songs",
                &["year", "artist_id"],
            )
            .await
            .unwrap();

        assert_eq!(stats.rows, 2);
        assert_eq!(stats.files, 2);
        assert_eq!(
            list_files(&temp_dir.path().join("songs")),
            vec![
                "_SUCCESS",
                "year=2019/artist_id=A2/part-00000.parquet",
                "year=2020/artist_id=A1/part-00000.parquet",
            ]
        );
    }

    #[tokio::test]
    async fn test_overwrite_removes_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_for(&temp_dir).await;

        sink.write(&[song("S1", "A1", 2019)], "songs", &["year"])
            .await
            .unwrap();
        std::fs::write(temp_dir.path().join("songs/stray.txt"), b"old").unwrap();

        let second = sink_for(&temp_dir).await;
        second
            .write(&[song("S2", "A2", 2020)], "songs", &["year"])
            .await
            .unwrap();

        assert_eq!(
            list_files(&temp_dir.path().join("songs")),
            vec!["_SUCCESS", "year=2020/part-00000.parquet"]
        );
        assert!(!temp_dir.path().join("songs/_temporary").exists());
        assert!(!temp_dir.path().join("songs/year=2019").exists());
    }

    #[tokio::test]
    async fn test_rewrite_is_byte_identical() {
        let temp_dir = TempDir::new().unwrap();
        let rows = [song("S1", "A1", 2020), song("S2", "A1", 2020)];

        sink_for(&temp_dir)
            .await
            .write(&rows, "songs", &["year"])
            .await
            .unwrap();
        let file = temp_dir.path().join("songs/year=2020/part-00000.parquet");
        let first = std::fs::read(&file).unwrap();

        sink_for(&temp_dir)
            .await
            .write(&rows, "songs", &["year"])
            .await
            .unwrap();
        assert_eq!(std::fs::read(&file).unwrap(), first);
    }

    #[tokio::test]
    async fn test_unknown_partition_column_leaves_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink_for(&temp_dir).await;

        sink.write(&[song("S1", "A1", 2019)], "songs", &[])
            .await
            .unwrap();
        let result = sink.write(&[song("S2", "A2", 2020)], "songs", &["month"]).await;

        assert!(matches!(result, Err(SinkError::UnknownPartitionColumn { .. })));
        assert!(temp_dir.path().join("songs/part-00000.parquet").exists());
    }
}
