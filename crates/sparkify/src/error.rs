//! Error types for the sparkify pipeline.

use snafu::prelude::*;

pub use sparkify_core::error::{ConfigError, StorageError};

/// Errors raised while reading and parsing source records.
///
/// Reading is strict: one bad record fails the whole source.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ParseError {
    /// The path pattern could not be compiled.
    #[snafu(display("Invalid path pattern '{pattern}': {message}"))]
    InvalidPattern { pattern: String, message: String },

    /// A record is not valid JSON or violates the expected schema.
    #[snafu(display("Failed to parse record {index} in {path}: {source}"))]
    InvalidRecord {
        path: String,
        index: usize,
        source: serde_json::Error,
    },
}

/// Errors raised by the pure table transforms.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// An event timestamp cannot be represented as a calendar date.
    #[snafu(display("Timestamp {ts} ms is outside the supported calendar range"))]
    TimestampOutOfRange { ts: i64 },
}

/// Errors raised while encoding and persisting output tables.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// Failed to build an Arrow record batch from table rows.
    #[snafu(display("Failed to build record batch for table '{table}': {source}"))]
    BatchBuild {
        table: &'static str,
        source: arrow::error::ArrowError,
    },

    /// Failed to create Parquet writer.
    #[snafu(display("Failed to create Parquet writer: {source}"))]
    WriterCreate {
        source: parquet::errors::ParquetError,
    },

    /// Failed to write to Parquet.
    #[snafu(display("Failed to write to Parquet: {source}"))]
    ParquetWrite {
        source: parquet::errors::ParquetError,
    },

    /// Partition column is not part of the table schema.
    #[snafu(display("Table '{table}' has no partition column '{column}'"))]
    UnknownPartitionColumn { table: &'static str, column: String },

    /// Storage failure while staging or committing files.
    #[snafu(display("Storage failure while writing table '{table}': {source}"))]
    TableStorage {
        table: &'static str,
        source: StorageError,
    },
}

/// Top-level pipeline errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Storage error.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// No input file matched a source pattern.
    #[snafu(display("No files matched '{pattern}' under {root}"))]
    NoFilesMatched { pattern: String, root: String },

    /// Parse error.
    #[snafu(display("Parse error: {source}"))]
    Parse { source: ParseError },

    /// Transform error.
    #[snafu(display("Transform error: {source}"))]
    Transform { source: TransformError },

    /// Sink error.
    #[snafu(display("Sink error: {source}"))]
    Sink { source: SinkError },
}

impl From<StorageError> for PipelineError {
    fn from(source: StorageError) -> Self {
        PipelineError::Storage { source }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<ParseError> for PipelineError {
    fn from(source: ParseError) -> Self {
        PipelineError::Parse { source }
    }
}

impl From<TransformError> for PipelineError {
    fn from(source: TransformError) -> Self {
        PipelineError::Transform { source }
    }
}

impl From<SinkError> for PipelineError {
    fn from(source: SinkError) -> Self {
        PipelineError::Sink { source }
    }
}
