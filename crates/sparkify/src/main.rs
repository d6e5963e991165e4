//! Sparkify CLI: builds the song play star schema in one batch run.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use sparkify::{CliArgs, init_tracing, run_pipeline};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match args.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run_pipeline(&config).await {
        Ok(stats) => {
            info!(
                "Wrote {} table(s), {} file(s) from {} catalog and {} event record(s)",
                stats.tables.len(),
                stats.files_written(),
                stats.catalog_records,
                stats.event_records
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
