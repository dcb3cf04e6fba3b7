//! Bootstrap Configuration
//!
//! Holds everything a bootstrap run is parameterised by:
//! - the install request (API level, image target and arch, optional pins)
//! - runner settings (fresh-install flag, sudo, host platform)
//! - an optional TOML file that pre-fills both

use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DroidupError, Result};

/// Host platform the runner executes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    Darwin,
    Linux,
}

impl HostPlatform {
    /// Platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            HostPlatform::Darwin
        } else {
            HostPlatform::Linux
        }
    }

    /// Parse a platform name. Anything other than `darwin` is treated as Linux.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("darwin") {
            HostPlatform::Darwin
        } else {
            HostPlatform::Linux
        }
    }

    pub fn is_mac(&self) -> bool {
        matches!(self, HostPlatform::Darwin)
    }

    pub fn name(&self) -> &'static str {
        match self {
            HostPlatform::Darwin => "darwin",
            HostPlatform::Linux => "linux",
        }
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::current()
    }
}

/// What to install into the SDK root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Platform API level, e.g. 30
    pub api_level: u32,
    /// System image target tag, e.g. `google_apis`
    pub target: String,
    /// System image CPU architecture, e.g. `x86_64`
    pub arch: String,
    /// Exact emulator build id; latest emulator package when absent
    pub emulator_build: Option<String>,
    /// NDK version to install
    pub ndk_version: Option<String>,
    /// CMake version to install
    pub cmake_version: Option<String>,
}

impl InstallRequest {
    /// Create a request with no optional components
    pub fn new(api_level: u32, target: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            api_level,
            target: target.into(),
            arch: arch.into(),
            emulator_build: None,
            ndk_version: None,
            cmake_version: None,
        }
    }

    pub fn with_emulator_build(mut self, build: impl Into<String>) -> Self {
        self.emulator_build = normalize_optional(Some(build.into()));
        self
    }

    pub fn with_ndk(mut self, version: impl Into<String>) -> Self {
        self.ndk_version = normalize_optional(Some(version.into()));
        self
    }

    pub fn with_cmake(mut self, version: impl Into<String>) -> Self {
        self.cmake_version = normalize_optional(Some(version.into()));
        self
    }

    /// Check the request is usable and blank optional values are dropped
    pub fn validate(mut self) -> Result<Self> {
        if self.api_level == 0 {
            return Err(DroidupError::Config("API level must be a positive integer".into()));
        }
        self.target = self.target.trim().to_string();
        self.arch = self.arch.trim().to_string();
        if self.target.is_empty() {
            return Err(DroidupError::Config("system image target must not be empty".into()));
        }
        if self.arch.is_empty() {
            return Err(DroidupError::Config("system image arch must not be empty".into()));
        }
        self.emulator_build = normalize_optional(self.emulator_build.take());
        self.ndk_version = normalize_optional(self.ndk_version.take());
        self.cmake_version = normalize_optional(self.cmake_version.take());
        Ok(self)
    }
}

/// Runner-level settings that do not describe packages
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Skip ownership normalization of the SDK root
    pub fresh_install: bool,
    /// Run the ownership change through sudo
    pub use_sudo: bool,
    /// Host platform, decides URLs and Linux-only steps
    pub platform: HostPlatform,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            fresh_install: false,
            use_sudo: true,
            platform: HostPlatform::current(),
        }
    }
}

/// `[request]` table of the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RequestSection {
    pub api_level: Option<u32>,
    pub target: Option<String>,
    pub arch: Option<String>,
    pub emulator_build: Option<String>,
    pub ndk: Option<String>,
    pub cmake: Option<String>,
}

/// `[runner]` table of the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunnerSection {
    pub fresh_install: Option<bool>,
    pub use_sudo: Option<bool>,
    pub platform: Option<HostPlatform>,
}

/// On-disk configuration, every value optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub request: RequestSection,
    #[serde(default)]
    pub runner: RunnerSection,
}

impl ConfigFile {
    /// Load a config file from disk
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DroidupError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }

        info!("Loading configuration from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse config file contents
    pub fn parse(content: &str) -> Result<Self> {
        let config: ConfigFile = toml::from_str(content)?;
        debug!("Parsed configuration: {:?}", config);
        Ok(config)
    }

    /// Apply the `[runner]` table on top of defaults
    pub fn runner_settings(&self) -> RunnerSettings {
        let defaults = RunnerSettings::default();
        RunnerSettings {
            fresh_install: self.runner.fresh_install.unwrap_or(defaults.fresh_install),
            use_sudo: self.runner.use_sudo.unwrap_or(defaults.use_sudo),
            platform: self.runner.platform.unwrap_or(defaults.platform),
        }
    }
}

/// Interpret a raw flag string.
///
/// Empty, `0`, `false`, `no` and `off` are false (case-insensitive); any other
/// value is true.
pub fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

/// Treat blank optional inputs as absent
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
