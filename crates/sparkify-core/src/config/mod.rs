//! Configuration primitives shared by the sparkify crates.

mod vars;

pub use vars::{InterpolationResult, interpolate, interpolate_with};

use serde::{Deserialize, Serialize};

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}
