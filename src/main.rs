//! Droidup - Android SDK bootstrapper
//!
//! Parses the command line, runs the bootstrap and reports a fatal error to
//! the CI job runner when it fails.

use std::process::ExitCode;
use clap::Parser;
use tracing::{error, info};

use droidup::cli::Cli;
use droidup::core::{workflow, APP_NAME, VERSION};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = cli.init_logging() {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    info!("{} v{} starting...", APP_NAME, VERSION);

    match cli.install.execute().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            workflow::fatal(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
