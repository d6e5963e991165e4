//! Sparkify: builds an analytics star schema of song plays.
//!
//! This crate handles:
//! - Reading song catalog and event log JSON files from S3 or local storage
//! - Building the `songs`, `artists`, `time` and `users` dimensions
//! - Joining playback events to the catalog into the `songplays` fact table
//! - Writing every table as (partitioned) Parquet with overwrite semantics

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod transform;

// Re-export commonly used items
pub use config::{CliArgs, Config};
pub use error::PipelineError;
pub use pipeline::{PipelineStats, StarSchema, run_pipeline};

pub use sparkify_core::{ParquetCompression, StorageProvider, StorageProviderRef, init_tracing};
