//! Parquet file writer.
//!
//! Splits a table batch into Hive-style partitions and encodes each
//! partition into one or more in-memory Parquet files with configurable
//! compression and row-count based rolling.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use arrow::array::{Array, RecordBatch, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::datatypes::SchemaRef;
use arrow::util::display::array_value_to_string;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;
use tracing::debug;

use sparkify_core::{ParquetCompression, PartitionExtractor, partition_path};

use crate::error::{BatchBuildSnafu, ParquetWriteSnafu, SinkError, WriterCreateSnafu};

/// Default number of rows after which a new file is started.
pub const DEFAULT_MAX_ROWS_PER_FILE: usize = 1_000_000;

/// An encoded Parquet file, ready to be persisted.
#[derive(Debug, Clone)]
pub struct FinishedFile {
    /// Path relative to the table directory, e.g. `year=2020/part-00000.parquet`.
    pub filename: String,
    pub size: usize,
    pub record_count: usize,
    pub bytes: Bytes,
    /// Unescaped partition values, e.g. `{"year": "2020"}`.
    pub partition_values: HashMap<String, String>,
}

/// Configuration for the Parquet writer.
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    /// Compression codec.
    pub compression: ParquetCompression,
    /// Roll to a new file after this many rows.
    pub max_rows_per_file: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::Snappy,
            max_rows_per_file: DEFAULT_MAX_ROWS_PER_FILE,
        }
    }
}

impl ParquetWriterConfig {
    /// Set the compression codec.
    pub fn with_compression(mut self, compression: ParquetCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the row limit per file.
    pub fn with_max_rows_per_file(mut self, max_rows: usize) -> Self {
        self.max_rows_per_file = max_rows.max(1);
        self
    }
}

/// Encodes one table into a set of Parquet files.
pub struct ParquetWriter {
    table: &'static str,
    config: ParquetWriterConfig,
    partition_columns: Vec<String>,
    partition_extractor: PartitionExtractor,
}

impl ParquetWriter {
    pub fn new(
        table: &'static str,
        config: ParquetWriterConfig,
        partition_columns: &[&str],
    ) -> Self {
        let partition_columns: Vec<String> =
            partition_columns.iter().map(|c| c.to_string()).collect();
        Self {
            table,
            config,
            partition_extractor: PartitionExtractor::new(partition_columns.clone()),
            partition_columns,
        }
    }

    fn writer_properties(config: &ParquetWriterConfig) -> WriterProperties {
        let mut builder = WriterProperties::builder();

        builder = builder.set_compression(match config.compression {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Lz4 => Compression::LZ4,
        });

        builder.build()
    }

    /// Encode `batch` into finished files.
    ///
    /// Partition columns are removed from the data files and turned into
    /// `col=value/` directories. Files are named `part-NNNNN.parquet`,
    /// numbered from zero within each partition, so identical input always
    /// yields identical names and bytes. An unpartitioned empty table still
    /// produces one (empty) file carrying the schema.
    pub fn write(&self, batch: &RecordBatch) -> Result<Vec<FinishedFile>, SinkError> {
        let schema = batch.schema();
        let partition_indices = self
            .partition_columns
            .iter()
            .map(|column| {
                schema
                    .index_of(column)
                    .map_err(|_| SinkError::UnknownPartitionColumn {
                        table: self.table,
                        column: column.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let data_indices: Vec<usize> = (0..schema.fields().len())
            .filter(|i| !partition_indices.contains(i))
            .collect();

        let mut files = Vec::new();

        if partition_indices.is_empty() {
            let data = batch.project(&data_indices).context(BatchBuildSnafu {
                table: self.table,
            })?;
            self.encode_partition("", &data, &mut files)?;
            return Ok(files);
        }

        for (prefix, rows) in self.group_by_partition(batch, &partition_indices)? {
            let indices = UInt32Array::from(rows);
            let data = take_record_batch(batch, &indices)
                .and_then(|taken| taken.project(&data_indices))
                .context(BatchBuildSnafu { table: self.table })?;
            self.encode_partition(&prefix, &data, &mut files)?;
        }

        Ok(files)
    }

    /// Row indices per partition directory, ordered by directory path.
    fn group_by_partition(
        &self,
        batch: &RecordBatch,
        partition_indices: &[usize],
    ) -> Result<BTreeMap<String, Vec<u32>>, SinkError> {
        let mut groups: BTreeMap<String, Vec<u32>> = BTreeMap::new();

        for row in 0..batch.num_rows() {
            let values = partition_indices
                .iter()
                .zip(&self.partition_columns)
                .map(|(&index, column)| {
                    let array = batch.column(index);
                    let value = if array.is_null(row) {
                        None
                    } else {
                        Some(array_value_to_string(array, row)?)
                    };
                    Ok((column.as_str(), value))
                })
                .collect::<Result<Vec<_>, arrow::error::ArrowError>>()
                .context(BatchBuildSnafu { table: self.table })?;

            groups
                .entry(partition_path(&values))
                .or_default()
                .push(row as u32);
        }

        Ok(groups)
    }

    fn encode_partition(
        &self,
        prefix: &str,
        data: &RecordBatch,
        files: &mut Vec<FinishedFile>,
    ) -> Result<(), SinkError> {
        let max_rows = self.config.max_rows_per_file.max(1);
        let chunk_count = data.num_rows().div_ceil(max_rows).max(1);

        for part in 0..chunk_count {
            let offset = part * max_rows;
            let length = max_rows.min(data.num_rows() - offset);
            let chunk = data.slice(offset, length);

            let start = Instant::now();
            let bytes = self.encode(data.schema(), &chunk)?;

            let filename = if prefix.is_empty() {
                format!("part-{part:05}.parquet")
            } else {
                format!("{prefix}/part-{part:05}.parquet")
            };

            debug!(
                target = %self.table,
                file = %filename,
                records = length,
                size = bytes.len(),
                duration_ms = start.elapsed().as_millis(),
                "Encoded parquet file"
            );

            files.push(FinishedFile {
                partition_values: self.partition_extractor.extract(&filename),
                filename,
                size: bytes.len(),
                record_count: length,
                bytes,
            });
        }

        Ok(())
    }

    fn encode(&self, schema: SchemaRef, chunk: &RecordBatch) -> Result<Bytes, SinkError> {
        let properties = Self::writer_properties(&self.config);
        let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(properties))
            .context(WriterCreateSnafu)?;

        writer.write(chunk).context(ParquetWriteSnafu)?;
        let buffer = writer.into_inner().context(ParquetWriteSnafu)?;

        Ok(Bytes::from(buffer))
    }
}
