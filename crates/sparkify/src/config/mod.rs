//! Configuration for the sparkify star-schema builder.

mod cli;

pub use cli::CliArgs;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::sink::{DEFAULT_MAX_ROWS_PER_FILE, ParquetWriterConfig};
use crate::transform::{JoinOptions, UnmatchedPolicy};
use sparkify_core::error::{ReadFileSnafu, YamlParseSnafu};
use sparkify_core::config::{ParquetCompression, interpolate};

/// Configuration for the raw inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Root URL holding both record families (S3 or local).
    #[serde(default)]
    pub root: String,
    /// Path pattern of the song catalog files, relative to `root`.
    #[serde(default = "default_song_data")]
    pub song_data: String,
    /// Path pattern of the event log files, relative to `root`.
    #[serde(default = "default_log_data")]
    pub log_data: String,
    /// Storage options for the input root (credentials, region, endpoint).
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
    /// Maximum concurrent file downloads.
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

fn default_song_data() -> String {
    "song_data/*/*/*/*.json".to_string()
}

fn default_log_data() -> String {
    "log_data/*/*/*.json".to_string()
}

fn default_max_concurrent_files() -> usize {
    16
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            song_data: default_song_data(),
            log_data: default_log_data(),
            storage_options: HashMap::new(),
            max_concurrent_files: default_max_concurrent_files(),
        }
    }
}

/// Configuration for the output tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root URL the five tables are written under.
    #[serde(default)]
    pub root: String,
    /// Storage options for the output root.
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,
    /// Start a new file after this many rows.
    #[serde(default = "default_max_rows_per_file")]
    pub max_rows_per_file: usize,
}

fn default_max_rows_per_file() -> usize {
    DEFAULT_MAX_ROWS_PER_FILE
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            storage_options: HashMap::new(),
            compression: ParquetCompression::default(),
            max_rows_per_file: default_max_rows_per_file(),
        }
    }
}

impl OutputConfig {
    pub fn writer_config(&self) -> ParquetWriterConfig {
        ParquetWriterConfig::default()
            .with_compression(self.compression)
            .with_max_rows_per_file(self.max_rows_per_file)
    }
}

/// Transform settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Allowed absolute difference between event length and song duration
    /// in seconds. `0.0` requires exact equality.
    #[serde(default)]
    pub duration_tolerance: f64,
    /// What to do with playback events that match no song.
    #[serde(default)]
    pub unmatched_songplays: UnmatchedPolicy,
}

impl TransformConfig {
    pub fn join_options(&self) -> JoinOptions {
        JoinOptions {
            duration_tolerance: self.duration_tolerance,
            unmatched: self.unmatched_songplays,
        }
    }
}

/// Main configuration for sparkify.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Validation is left to the caller so CLI overrides can be applied first.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let result = interpolate(contents);
        if !result.is_ok() {
            return Err(ConfigError::EnvInterpolation {
                message: result.errors.join("\n"),
            });
        }

        serde_yaml::from_str(&result.text).context(YamlParseSnafu)
    }

    /// Build a configuration from the roots alone, everything else default.
    pub fn from_roots(input_root: impl Into<String>, output_root: impl Into<String>) -> Self {
        Self {
            input: InputConfig {
                root: input_root.into(),
                ..InputConfig::default()
            },
            output: OutputConfig {
                root: output_root.into(),
                ..OutputConfig::default()
            },
            transform: TransformConfig::default(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.root.trim().is_empty() {
            return Err(ConfigError::EmptyInputRoot);
        }
        if self.output.root.trim().is_empty() {
            return Err(ConfigError::EmptyOutputRoot);
        }
        for (source_name, pattern) in [
            ("song_data", &self.input.song_data),
            ("log_data", &self.input.log_data),
        ] {
            if pattern.trim_matches('/').trim().is_empty() {
                return Err(ConfigError::EmptyPattern {
                    source_name: source_name.to_string(),
                });
            }
        }
        let tolerance = self.transform.duration_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance { value: tolerance });
        }
        if self.output.max_rows_per_file == 0 {
            return Err(ConfigError::ZeroRowsPerFile);
        }
        Ok(())
    }
}
