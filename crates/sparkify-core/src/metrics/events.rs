//! Internal events for sparkify metrics emission.
//!
//! Each struct is one measurable occurrence. Source events carry a `source`
//! label (`song_data`, `log_data`); table events carry a `table` label.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

// ============================================================================
// Source events
// ============================================================================

/// Event emitted after listing files that match a source pattern.
pub struct SourceFilesDiscovered {
    pub count: usize,
    pub source: String,
}

impl InternalEvent for SourceFilesDiscovered {
    fn emit(self) {
        trace!(count = self.count, source = %self.source, "Source files discovered");
        gauge!("sparkify_source_files", "source" => self.source).set(self.count as f64);
    }
}

/// Event emitted when raw bytes are fetched from a source file.
pub struct BytesRead {
    pub bytes: u64,
    pub source: String,
}

impl InternalEvent for BytesRead {
    fn emit(self) {
        trace!(bytes = self.bytes, source = %self.source, "Bytes read");
        counter!("sparkify_bytes_read_total", "source" => self.source).increment(self.bytes);
    }
}

/// Event emitted when records are parsed from a source.
pub struct RecordsRead {
    pub count: u64,
    pub source: String,
}

impl InternalEvent for RecordsRead {
    fn emit(self) {
        trace!(count = self.count, source = %self.source, "Records read");
        counter!("sparkify_records_read_total", "source" => self.source).increment(self.count);
    }
}

// ============================================================================
// Transform events
// ============================================================================

/// Event emitted when a table has been built in memory.
pub struct TableRowsBuilt {
    pub count: usize,
    pub table: &'static str,
}

impl InternalEvent for TableRowsBuilt {
    fn emit(self) {
        trace!(count = self.count, table = self.table, "Table rows built");
        gauge!("sparkify_table_rows", "table" => self.table).set(self.count as f64);
    }
}

/// Event emitted for playback events that matched no catalog record.
pub struct SongplaysUnmatched {
    pub count: usize,
}

impl InternalEvent for SongplaysUnmatched {
    fn emit(self) {
        trace!(count = self.count, "Unmatched songplays");
        gauge!("sparkify_songplays_unmatched").set(self.count as f64);
    }
}

// ============================================================================
// Sink events
// ============================================================================

/// Event emitted when a Parquet file is staged to storage.
pub struct ParquetFileWritten {
    pub bytes: usize,
    pub table: &'static str,
}

impl InternalEvent for ParquetFileWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, table = self.table, "Parquet file written");
        counter!("sparkify_parquet_files_written_total", "table" => self.table).increment(1);
        counter!("sparkify_bytes_written_total", "table" => self.table)
            .increment(self.bytes as u64);
    }
}

/// Event emitted when a table overwrite has been committed.
pub struct TableCommitted {
    pub table: &'static str,
    pub duration: Duration,
}

impl InternalEvent for TableCommitted {
    fn emit(self) {
        trace!(
            table = self.table,
            duration_ms = self.duration.as_millis(),
            "Table committed"
        );
        histogram!("sparkify_table_write_duration_seconds", "table" => self.table)
            .record(self.duration.as_secs_f64());
    }
}

// ============================================================================
// Storage events
// ============================================================================

/// Type of storage operation.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
    Delete,
    List,
    Rename,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
            StorageOperation::Delete => "delete",
            StorageOperation::List => "list",
            StorageOperation::Rename => "rename",
        }
    }
}

/// Status of a storage request.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    pub fn from_result<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// Event emitted when a storage request completes.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
    pub duration: Duration,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            duration_ms = self.duration.as_millis(),
            "Storage request"
        );
        counter!(
            "sparkify_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
        histogram!(
            "sparkify_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}
