//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use super::Config;
use crate::error::ConfigError;

/// Build the sparkify star schema from raw song and event records.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "sparkify", version, about)]
pub struct CliArgs {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input root URL or local path, overrides `input.root`
    #[arg(long)]
    pub input_root: Option<String>,

    /// Output root URL or local path, overrides `output.root`
    #[arg(long)]
    pub output_root: Option<String>,
}

impl CliArgs {
    /// Resolve the effective configuration: file (if any), then overrides,
    /// then validation.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(root) = &self.input_root {
            config.input.root = root.clone();
        }
        if let Some(root) = &self.output_root {
            config.output.root = root.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_roots_only() {
        let args = CliArgs::parse_from([
            "sparkify",
            "--input-root",
            "/data/in",
            "--output-root",
            "/data/out",
        ]);
        let config = args.load_config().unwrap();

        assert_eq!(config.input.root, "/data/in");
        assert_eq!(config.output.root, "/data/out");
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "input:\n  root: /from/file\noutput:\n  root: /from/file/out\n  compression: gzip"
        )
        .unwrap();

        let args = CliArgs::parse_from([
            "sparkify",
            "--config",
            file.path().to_str().unwrap(),
            "--output-root",
            "/override",
        ]);
        let config = args.load_config().unwrap();

        assert_eq!(config.input.root, "/from/file");
        assert_eq!(config.output.root, "/override");
        assert_eq!(
            config.output.compression,
            sparkify_core::ParquetCompression::Gzip
        );
    }

    #[test]
    fn test_nothing_given_is_a_config_error() {
        let args = CliArgs::parse_from(["sparkify"]);
        assert!(matches!(
            args.load_config(),
            Err(ConfigError::EmptyInputRoot)
        ));
    }
}
