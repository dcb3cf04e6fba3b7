//! SDK Bootstrapper
//!
//! Brings an SDK root into a state where the requested platform, build tools,
//! emulator, system image and optional NDK/CMake are installed. Every step is
//! guarded by a filesystem check so a warm runner skips work already done.
//!
//! Progress moves strictly forward through [`BootstrapState`]. The first
//! failing step stops the run where it is; nothing is rolled back or retried.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use droidup_core::workflow;
use droidup_core::{DroidupError, InstallRequest, RunnerSettings};

use crate::base::BaseInstaller;
use crate::downloader::cmdline_tools_info;
use crate::emulator::EmulatorInstaller;
use crate::env::Environment;
use crate::host::{remove_file_if_exists, run_checked, Invocation, ToolHost};
use crate::licenses::{write_license_markers, LicenseAcceptor, LicenseMarker};
use crate::sdk_manager::{SdkComponent, SdkManager, BUILD_TOOLS_VERSION};

/// How far a bootstrap run got
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapState {
    Unconfigured,
    BaseInstalled,
    ToolsInstalled,
    PackagesInstalled,
    Complete,
}

/// Individual steps, used to report where a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    Configuration,
    BaseSdk,
    Licenses,
    Ownership,
    CmdlineTools,
    LicenseMarkers,
    Packages,
    Emulator,
    SystemImage,
    Ndk,
    Cmake,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapStep::Configuration => "configuration check",
            BootstrapStep::BaseSdk => "base SDK installation",
            BootstrapStep::Licenses => "license acceptance",
            BootstrapStep::Ownership => "ownership normalization",
            BootstrapStep::CmdlineTools => "command-line tools installation",
            BootstrapStep::LicenseMarkers => "license marker files",
            BootstrapStep::Packages => "SDK package installation",
            BootstrapStep::Emulator => "emulator installation",
            BootstrapStep::SystemImage => "system image installation",
            BootstrapStep::Ndk => "NDK installation",
            BootstrapStep::Cmake => "CMake installation",
        };
        f.write_str(name)
    }
}

/// A run that stopped at `step`
#[derive(Debug, thiserror::Error)]
#[error("{step} failed: {error}")]
pub struct BootstrapFailure {
    /// Last state reached before the failing step
    pub state: BootstrapState,
    pub step: BootstrapStep,
    #[source]
    pub error: DroidupError,
    /// Environment as it stood when the step failed, exports included
    pub environment: Environment,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub sdk_root: PathBuf,
    pub environment: Environment,
    pub state: BootstrapState,
    /// The base SDK was downloaded during this run
    pub base_installed: bool,
    /// The command-line tools were downloaded during this run
    pub cmdline_tools_installed: bool,
    pub ownership_normalized: bool,
    /// License marker files written during this run
    pub license_markers: Vec<LicenseMarker>,
}

/// Mutable progress of one run
struct Progress {
    state: BootstrapState,
    env: Environment,
}

type StepResult<T> = std::result::Result<T, (BootstrapStep, DroidupError)>;

fn at(step: BootstrapStep) -> impl FnOnce(DroidupError) -> (BootstrapStep, DroidupError) {
    move |error| (step, error)
}

/// Runs the ordered, idempotent installation steps
pub struct SdkBootstrapper<'a> {
    host: &'a dyn ToolHost,
    settings: RunnerSettings,
}

impl<'a> SdkBootstrapper<'a> {
    pub fn new(host: &'a dyn ToolHost, settings: RunnerSettings) -> Self {
        Self { host, settings }
    }

    /// Install everything `request` asks for into the SDK root named by `env`
    pub async fn install_sdk(
        &self,
        request: &InstallRequest,
        env: Environment,
    ) -> std::result::Result<BootstrapReport, BootstrapFailure> {
        let mut progress = Progress {
            state: BootstrapState::Unconfigured,
            env,
        };

        match self.execute(request, &mut progress).await {
            Ok(report) => Ok(report),
            Err((step, error)) => Err(BootstrapFailure {
                state: progress.state,
                step,
                error,
                environment: progress.env,
            }),
        }
    }

    async fn execute(&self, request: &InstallRequest, progress: &mut Progress) -> StepResult<BootstrapReport> {
        let sdk_root = progress.env.sdk_root().map_err(at(BootstrapStep::Configuration))?;
        let platform = self.settings.platform;
        info!(
            "Bootstrapping Android SDK at {:?} (API {}, {};{}, {})",
            sdk_root,
            request.api_level,
            request.target,
            request.arch,
            platform.name()
        );

        let base_installed = self.ensure_base(&sdk_root, progress).await?;
        progress.state = BootstrapState::BaseInstalled;

        let ownership_normalized = self
            .normalize_ownership(&sdk_root, &progress.env)
            .await
            .map_err(at(BootstrapStep::Ownership))?;

        let cmdline_tools_installed = self.ensure_cmdline_tools(&sdk_root, progress).await?;

        let license_markers = write_license_markers(&sdk_root, platform, request.api_level)
            .await
            .map_err(at(BootstrapStep::LicenseMarkers))?;
        progress.state = BootstrapState::ToolsInstalled;

        self.install_packages(&sdk_root, request, &progress.env).await?;
        progress.state = BootstrapState::PackagesInstalled;

        self.install_optional(&sdk_root, request, &progress.env).await?;
        progress.state = BootstrapState::Complete;

        info!("Android SDK bootstrap complete");
        Ok(BootstrapReport {
            sdk_root,
            environment: progress.env.clone(),
            state: progress.state,
            base_installed,
            cmdline_tools_installed,
            ownership_normalized,
            license_markers,
        })
    }

    /// Install the base SDK and accept licenses unless the root already exists
    async fn ensure_base(&self, sdk_root: &Path, progress: &mut Progress) -> StepResult<bool> {
        if sdk_root.exists() {
            info!("Android SDK already present at {:?}, skipping base installation", sdk_root);
            return Ok(false);
        }

        let _group = workflow::group("Install base Android SDK");

        let (env, installed) = BaseInstaller::new(self.host, self.settings.platform)
            .install(sdk_root, progress.env.clone())
            .await
            .map_err(at(BootstrapStep::BaseSdk))?;
        progress.env = env;
        if !installed {
            return Err((
                BootstrapStep::BaseSdk,
                DroidupError::Install("base Android SDK installation did not complete".into()),
            ));
        }

        let accepted = LicenseAcceptor::new(self.host)
            .accept(sdk_root, &progress.env)
            .await
            .map_err(at(BootstrapStep::Licenses))?;
        if !accepted {
            return Err((
                BootstrapStep::Licenses,
                DroidupError::Install("Android SDK licenses were not accepted".into()),
            ));
        }

        Ok(true)
    }

    /// `chown -R user:user <sdk-root>` on Linux unless this is a fresh install
    async fn normalize_ownership(&self, sdk_root: &Path, env: &Environment) -> droidup_core::Result<bool> {
        if self.settings.platform.is_mac() || self.settings.fresh_install {
            return Ok(false);
        }

        let Some(user) = env.user() else {
            warn!("USER is not set, skipping ownership normalization of {:?}", sdk_root);
            return Ok(false);
        };

        run_checked(self.host, &ownership_invocation(sdk_root, user, self.settings.use_sudo)).await?;
        Ok(true)
    }

    /// Download the command-line tools if `<sdk-root>/cmdline-tools` is missing
    async fn ensure_cmdline_tools(&self, sdk_root: &Path, progress: &mut Progress) -> StepResult<bool> {
        let cmdline_tools = sdk_root.join("cmdline-tools");
        if cmdline_tools.exists() {
            info!("Command-line tools already present at {:?}", cmdline_tools);
            return Ok(false);
        }

        let _group = workflow::group("Install Android SDK command-line tools");

        let archive = cmdline_tools_info(self.settings.platform);
        let archive_path = archive.path_in(&progress.env.download_dir(sdk_root));
        let step = at(BootstrapStep::CmdlineTools);

        let result: droidup_core::Result<()> = async {
            self.host.download(&archive.url, &archive_path).await?;
            self.host.extract(&archive_path, &cmdline_tools).await?;
            remove_file_if_exists(&archive_path).await
        }
        .await;
        result.map_err(step)?;

        progress.env = progress.env.clone().add_path(vec![
            cmdline_tools.join("tools"),
            cmdline_tools.join("tools").join("bin"),
            sdk_root.join("platform-tools"),
        ]);
        Ok(true)
    }

    /// Build tools, platform tools, platform, emulator and system image
    async fn install_packages(&self, sdk_root: &Path, request: &InstallRequest, env: &Environment) -> StepResult<()> {
        let _group = workflow::group("Install Android SDK packages");
        let manager = SdkManager::new(self.host, sdk_root);

        manager
            .install(
                env,
                &[
                    SdkComponent::BuildTools(BUILD_TOOLS_VERSION.to_string()),
                    SdkComponent::PlatformTools,
                    SdkComponent::Platform(request.api_level),
                ],
            )
            .await
            .map_err(at(BootstrapStep::Packages))?;

        EmulatorInstaller::new(self.host, self.settings.platform)
            .install(sdk_root, env, request.emulator_build.as_deref())
            .await
            .map_err(at(BootstrapStep::Emulator))?;

        let image = SdkComponent::SystemImage {
            api: request.api_level,
            target: request.target.clone(),
            arch: request.arch.clone(),
        };
        manager
            .install(env, &[image])
            .await
            .map_err(at(BootstrapStep::SystemImage))?;

        Ok(())
    }

    /// NDK and CMake, each only when a version was requested
    async fn install_optional(&self, sdk_root: &Path, request: &InstallRequest, env: &Environment) -> StepResult<()> {
        let manager = SdkManager::new(self.host, sdk_root);

        if let Some(version) = &request.ndk_version {
            info!("Installing NDK {}", version);
            manager
                .install(env, &[SdkComponent::Ndk(version.clone())])
                .await
                .map_err(at(BootstrapStep::Ndk))?;
        }

        if let Some(version) = &request.cmake_version {
            info!("Installing CMake {}", version);
            manager
                .install(env, &[SdkComponent::Cmake(version.clone())])
                .await
                .map_err(at(BootstrapStep::Cmake))?;
        }

        Ok(())
    }
}

/// Recursive ownership change of the SDK root to `user:user`
pub fn ownership_invocation(sdk_root: &Path, user: &str, use_sudo: bool) -> Invocation {
    let args = [
        "-R".to_string(),
        format!("{}:{}", user, user),
        sdk_root.to_string_lossy().to_string(),
    ];
    if use_sudo {
        Invocation::new("sudo").arg("chown").args(args)
    } else {
        Invocation::new("chown").args(args)
    }
}
