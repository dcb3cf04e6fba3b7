//! CLI argument parsing and logging setup

use clap::Parser;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::commands::InstallCommand;

/// Droidup - Android SDK bootstrapper
///
/// Ensures the Android platform, build tools, emulator, system image and
/// optional NDK/CMake are installed under $ANDROID_SDK_ROOT before a CI job
/// builds or tests.
#[derive(Parser, Debug)]
#[command(name = "droidup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub install: InstallCommand,
}

impl Cli {
    /// Install the global tracing subscriber.
    ///
    /// Logs go to stderr so stdout only carries workflow commands and
    /// `export` lines.
    pub fn init_logging(&self) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
        let level = if self.verbose { Level::DEBUG } else { Level::INFO };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
    }
}
