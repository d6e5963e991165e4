//! sparkify-core: Shared plumbing for the sparkify star-schema builder.
//!
//! - `storage/` - Storage abstraction over S3 and the local filesystem
//! - `config/` - Environment variable interpolation and common config types
//! - `metrics/` - Internal metric events and the `emit!` macro
//! - `partition` - Hive-style partition path encoding and extraction
//! - `tracing` - Subscriber setup for the CLI
//! - `error` - Storage and configuration errors

pub mod config;
pub mod error;
pub mod metrics;
pub mod partition;
pub mod storage;
pub mod tracing;

pub use config::{ParquetCompression, interpolate};
pub use error::{ConfigError, StorageError};
pub use partition::{HIVE_DEFAULT_PARTITION, PartitionExtractor, partition_path};
pub use storage::{StorageProvider, StorageProviderRef};
pub use tracing::init_tracing;
