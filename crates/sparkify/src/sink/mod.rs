//! Sink components for writing output tables.

mod storage;
mod table;
mod writer;

pub use storage::{STAGING_DIR, SUCCESS_MARKER, TableSink, TableWriteStats};
pub use table::TableRows;
pub use writer::{DEFAULT_MAX_ROWS_PER_FILE, FinishedFile, ParquetWriter, ParquetWriterConfig};
