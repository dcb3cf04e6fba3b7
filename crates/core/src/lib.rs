//! Droidup Core - Shared types
//!
//! Configuration, error types and CI workflow output shared by the
//! toolchain crate and the `droidup` binary.

pub mod config;
pub mod error;
pub mod workflow;

pub use config::{ConfigFile, HostPlatform, InstallRequest, RunnerSettings};
pub use error::{DroidupError, Result};
pub use workflow::{ExportSink, WorkflowCommand};

/// Droidup version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Droidup";
