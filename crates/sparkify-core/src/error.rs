//! Error types shared by the sparkify crates.
//!
//! Storage failures and configuration failures are defined here; the
//! pipeline crate wraps them in its own top-level error.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Input root is missing or empty.
    #[snafu(display("Input root cannot be empty"))]
    EmptyInputRoot,

    /// Output root is missing or empty.
    #[snafu(display("Output root cannot be empty"))]
    EmptyOutputRoot,

    /// A source path pattern is empty.
    #[snafu(display("Path pattern for '{source_name}' cannot be empty"))]
    EmptyPattern { source_name: String },

    /// Duration tolerance is negative or not a number.
    #[snafu(display("Duration tolerance must be a non-negative number, got {value}"))]
    InvalidTolerance { value: f64 },

    /// Rows per file must be positive.
    #[snafu(display("max_rows_per_file must be greater than zero"))]
    ZeroRowsPerFile,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
