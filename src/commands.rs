//! CLI commands for Droidup
//!
//! The install command turns flags, `INPUT_*` variables and an optional
//! config file into an [`InstallRequest`] and runs the bootstrapper.

use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use droidup_android_toolchain::{
    BootstrapFailure, BootstrapReport, Environment, SdkBootstrapper, SystemHost, DEFAULT_ARCH,
    DEFAULT_TARGET, KNOWN_ARCHS, KNOWN_TARGETS,
};
use droidup_core::config::{normalize_optional, parse_flag, ConfigFile};
use droidup_core::{DroidupError, ExportSink, HostPlatform, InstallRequest, RunnerSettings};

/// Install command options
#[derive(Args, Debug, Clone, Default)]
pub struct InstallCommand {
    /// Platform API level to install, e.g. 30
    #[arg(long, env = "INPUT_API_LEVEL")]
    pub api_level: Option<u32>,

    /// System image target tag (default, google_apis, ...)
    #[arg(long, env = "INPUT_TARGET")]
    pub target: Option<String>,

    /// System image CPU architecture (x86, x86_64, ...)
    #[arg(long, env = "INPUT_ARCH")]
    pub arch: Option<String>,

    /// Exact emulator build id; the latest emulator is installed when omitted
    #[arg(long, env = "INPUT_EMULATOR_BUILD")]
    pub emulator_build: Option<String>,

    /// NDK version to install
    #[arg(long, env = "INPUT_NDK")]
    pub ndk: Option<String>,

    /// CMake version to install
    #[arg(long, env = "INPUT_CMAKE")]
    pub cmake: Option<String>,

    /// TOML file providing defaults for any of the options
    #[arg(long, env = "DROIDUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip ownership normalization of the SDK root (truthy string)
    #[arg(long, env = "FRESH_INSTALL")]
    pub fresh_install: Option<String>,

    /// Run chown without sudo
    #[arg(long)]
    pub no_sudo: bool,

    /// Host platform override (darwin or linux)
    #[arg(long)]
    pub platform: Option<String>,
}

impl InstallCommand {
    /// Merge file values under the command-line values
    pub fn resolve(&self, file: &ConfigFile) -> Result<(InstallRequest, RunnerSettings)> {
        let api_level = self
            .api_level
            .or(file.request.api_level)
            .ok_or_else(|| DroidupError::Config("an API level is required (--api-level)".into()))?;

        let pick = |cli: &Option<String>, file: &Option<String>| {
            normalize_optional(cli.clone()).or_else(|| normalize_optional(file.clone()))
        };

        let request = InstallRequest {
            api_level,
            target: pick(&self.target, &file.request.target).unwrap_or_else(|| DEFAULT_TARGET.to_string()),
            arch: pick(&self.arch, &file.request.arch).unwrap_or_else(|| DEFAULT_ARCH.to_string()),
            emulator_build: pick(&self.emulator_build, &file.request.emulator_build),
            ndk_version: pick(&self.ndk, &file.request.ndk),
            cmake_version: pick(&self.cmake, &file.request.cmake),
        }
        .validate()?;

        let mut settings = file.runner_settings();
        if let Some(flag) = &self.fresh_install {
            settings.fresh_install = parse_flag(flag);
        }
        if self.no_sudo {
            settings.use_sudo = false;
        }
        if let Some(platform) = &self.platform {
            settings.platform = HostPlatform::from_name(platform);
        }

        Ok((request, settings))
    }

    /// Execute the install command
    pub async fn execute(&self) -> Result<BootstrapReport> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path).await?,
            None => ConfigFile::default(),
        };
        let (request, settings) = self.resolve(&file)?;

        if !KNOWN_TARGETS.contains(&request.target.as_str()) {
            warn!("Unrecognized system image target {:?}", request.target);
        }
        if !KNOWN_ARCHS.contains(&request.arch.as_str()) {
            warn!("Unrecognized system image arch {:?}", request.arch);
        }

        let env = Environment::capture();
        let sink = ExportSink::from_lookup(|name| env.get(name).map(str::to_string));
        let host = SystemHost::new()?;

        let result = SdkBootstrapper::new(&host, settings).install_sdk(&request, env.clone()).await;

        // Whatever was exported before a failure stays visible to later steps.
        let exported = match &result {
            Ok(report) => &report.environment,
            Err(failure) => &failure.environment,
        };
        exported
            .flush(&sink)
            .await
            .context("failed to export environment to later steps")?;

        let report = result.map_err(|failure: BootstrapFailure| {
            let message = failure.error.user_message();
            anyhow::Error::new(failure).context(message)
        })?;

        info!(
            "Android SDK ready at {:?} (base installed: {}, command-line tools installed: {})",
            report.sdk_root, report.base_installed, report.cmdline_tools_installed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_cli_overrides_file() {
        let file = ConfigFile::parse(
            r#"
            [request]
            api-level = 29
            target = "google_apis"
            ndk = "21.0.6113669"

            [runner]
            fresh-install = true
            "#,
        )
        .unwrap();
        let command = InstallCommand {
            api_level: Some(30),
            arch: Some("x86_64".into()),
            fresh_install: Some("false".into()),
            no_sudo: true,
            platform: Some("darwin".into()),
            ..Default::default()
        };

        let (request, settings) = command.resolve(&file).unwrap();
        assert_eq!(request.api_level, 30);
        assert_eq!(request.target, "google_apis");
        assert_eq!(request.arch, "x86_64");
        assert_eq!(request.ndk_version.as_deref(), Some("21.0.6113669"));
        assert_eq!(request.cmake_version, None);
        assert!(!settings.fresh_install);
        assert!(!settings.use_sudo);
        assert_eq!(settings.platform, HostPlatform::Darwin);
    }

    #[test]
    fn test_resolve_defaults() {
        let command = InstallCommand {
            api_level: Some(29),
            emulator_build: Some("".into()),
            ..Default::default()
        };

        let (request, settings) = command.resolve(&ConfigFile::default()).unwrap();
        assert_eq!(request.target, DEFAULT_TARGET);
        assert_eq!(request.arch, DEFAULT_ARCH);
        assert_eq!(request.emulator_build, None);
        assert!(!settings.fresh_install);
        assert!(settings.use_sudo);
    }

    #[test]
    fn test_resolve_requires_api_level() {
        let err = InstallCommand::default().resolve(&ConfigFile::default()).unwrap_err();
        let err = err.downcast::<DroidupError>().unwrap();
        assert!(err.is_config());
    }
}
