//! Error types for Droidup
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for Droidup
#[derive(Error, Debug)]
pub enum DroidupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Installation failed: {0}")]
    Install(String),

    #[error("{program} exited with {status}")]
    Process { program: String, status: String },

    #[error("Download error: {0}")]
    Download(String),

    #[error("Extraction error: {0}")]
    Extraction(String),
}

/// Result type alias for Droidup operations
pub type Result<T> = std::result::Result<T, DroidupError>;

impl DroidupError {
    /// Whether this error was raised before any side effect took place
    pub fn is_config(&self) -> bool {
        matches!(self, DroidupError::Config(_) | DroidupError::TomlParse(_))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            DroidupError::Io(e) => format!("File operation failed: {}", e),
            DroidupError::Config(msg) => format!("Configuration error: {}", msg),
            DroidupError::Install(msg) => format!("Android SDK installation failed: {}", msg),
            DroidupError::Download(msg) => format!("Download failed: {}. Please check the runner's network access.", msg),
            _ => self.to_string(),
        }
    }
}
