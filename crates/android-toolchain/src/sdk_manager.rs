//! SDK Manager
//!
//! Wraps the Android SDK manager to install SDK components and accept licenses.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use droidup_core::Result;

use crate::env::{Environment, PATH_VAR, SDK_HOME_VAR};
use crate::host::{run_checked, Invocation, ToolHost};

/// Build tools version installed alongside every platform
pub const BUILD_TOOLS_VERSION: &str = "30.0.0";

/// Number of affirmative answers fed to license prompts.
///
/// The pinned base SDK asks for fewer than ten licenses; sdkmanager closes
/// stdin when it exits and the remaining answers are discarded.
const LICENSE_ANSWERS: usize = 32;

/// SDK component types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkComponent {
    Platform(u32),       // platforms;android-XX
    BuildTools(String),  // build-tools;XX.X.X
    PlatformTools,       // platform-tools
    Emulator,            // emulator
    SystemImage { api: u32, target: String, arch: String },
    Ndk(String),         // ndk;XX.X.XXXXX
    Cmake(String),       // cmake;X.XX.X
}

impl SdkComponent {
    /// Get the SDK manager package name
    pub fn package_name(&self) -> String {
        match self {
            SdkComponent::Platform(api) => format!("platforms;android-{}", api),
            SdkComponent::BuildTools(version) => format!("build-tools;{}", version),
            SdkComponent::PlatformTools => "platform-tools".to_string(),
            SdkComponent::Emulator => "emulator".to_string(),
            SdkComponent::SystemImage { api, target, arch } => {
                format!("system-images;android-{};{};{}", api, target, arch)
            }
            SdkComponent::Ndk(version) => format!("ndk;{}", version),
            SdkComponent::Cmake(version) => format!("cmake;{}", version),
        }
    }
}

/// Android SDK Manager wrapper
pub struct SdkManager<'a> {
    host: &'a dyn ToolHost,
    sdk_root: PathBuf,
}

impl<'a> SdkManager<'a> {
    pub fn new(host: &'a dyn ToolHost, sdk_root: impl Into<PathBuf>) -> Self {
        Self {
            host,
            sdk_root: sdk_root.into(),
        }
    }

    /// Find the sdkmanager executable, newest layout first.
    ///
    /// Falls back to the bare name so the child's PATH resolves it.
    pub fn locate(sdk_root: &Path) -> PathBuf {
        let exe_name = "sdkmanager";
        let cmdline_tools = sdk_root.join("cmdline-tools");

        let mut candidates = vec![
            cmdline_tools.join("latest").join("bin").join(exe_name),
            cmdline_tools.join("tools").join("bin").join(exe_name),
        ];

        // Versioned cmdline-tools/X.X directories
        if let Ok(entries) = std::fs::read_dir(&cmdline_tools) {
            let mut versioned: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path().join("bin").join(exe_name))
                .collect();
            versioned.sort();
            candidates.extend(versioned);
        }

        // Legacy tools bundle shipped with the base SDK
        candidates.push(sdk_root.join("tools").join("bin").join(exe_name));

        candidates
            .into_iter()
            .find(|path| path.exists())
            .unwrap_or_else(|| PathBuf::from(exe_name))
    }

    /// Base invocation carrying the snapshot's SDK variables
    fn command(&self, env: &Environment) -> Invocation {
        let root = self.sdk_root.to_string_lossy().to_string();
        let mut inv = Invocation::new(Self::locate(&self.sdk_root))
            .env("ANDROID_SDK_ROOT", root.clone())
            .env("ANDROID_HOME", root)
            .env(PATH_VAR, env.path());

        if let Some(home) = env.get(SDK_HOME_VAR) {
            inv = inv.env(SDK_HOME_VAR, home);
        }
        inv
    }

    /// Invocation installing `components` in one call, output suppressed
    pub fn install_invocation(&self, env: &Environment, components: &[SdkComponent]) -> Invocation {
        self.command(env)
            .arg("--install")
            .args(components.iter().map(SdkComponent::package_name))
            .quiet()
    }

    /// Invocation answering every license prompt with `y`
    pub fn licenses_invocation(&self, env: &Environment) -> Invocation {
        self.command(env)
            .arg("--licenses")
            .stdin(b"y\n".repeat(LICENSE_ANSWERS))
            .quiet()
    }

    /// Install SDK components; a failing sdkmanager fails the call
    pub async fn install(&self, env: &Environment, components: &[SdkComponent]) -> Result<()> {
        let packages: Vec<String> = components.iter().map(SdkComponent::package_name).collect();
        info!("Installing SDK packages: {:?}", packages);

        run_checked(self.host, &self.install_invocation(env, components)).await?;

        debug!("Installed {:?}", packages);
        Ok(())
    }

    /// Feed `y` to the license prompts. The exit status is only logged.
    pub async fn accept_licenses(&self, env: &Environment) -> Result<()> {
        info!("Accepting Android SDK licenses...");

        let outcome = self.host.run(&self.licenses_invocation(env)).await?;
        if !outcome.success {
            warn!("sdkmanager --licenses exited with {:?}", outcome.code);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;

    #[test]
    fn test_component_package_name() {
        assert_eq!(SdkComponent::Platform(30).package_name(), "platforms;android-30");
        assert_eq!(
            SdkComponent::BuildTools(BUILD_TOOLS_VERSION.into()).package_name(),
            "build-tools;30.0.0"
        );
        assert_eq!(
            SdkComponent::SystemImage {
                api: 30,
                target: "google_apis".into(),
                arch: "x86_64".into(),
            }
            .package_name(),
            "system-images;android-30;google_apis;x86_64"
        );
        assert_eq!(SdkComponent::Cmake("3.10.2.4988404".into()).package_name(), "cmake;3.10.2.4988404");
    }

    #[test]
    fn test_locate_prefers_cmdline_tools() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        assert_eq!(SdkManager::locate(root), PathBuf::from("sdkmanager"));

        let legacy = root.join("tools/bin");
        std::fs::create_dir_all(&legacy).unwrap();
        std::fs::write(legacy.join("sdkmanager"), b"").unwrap();
        assert_eq!(SdkManager::locate(root), legacy.join("sdkmanager"));

        let cmdline = root.join("cmdline-tools/tools/bin");
        std::fs::create_dir_all(&cmdline).unwrap();
        std::fs::write(cmdline.join("sdkmanager"), b"").unwrap();
        assert_eq!(SdkManager::locate(root), cmdline.join("sdkmanager"));
    }

    #[test]
    fn test_install_invocation_is_structured() {
        let host = RecordingHost::new();
        let env = Environment::from_vars([("PATH", "/usr/bin"), (SDK_HOME_VAR, "/sdk/sdk_home")]);
        let manager = SdkManager::new(&host, "/sdk");

        let inv = manager.install_invocation(
            &env,
            &[SdkComponent::PlatformTools, SdkComponent::Platform(29)],
        );

        assert_eq!(inv.args, vec!["--install", "platform-tools", "platforms;android-29"]);
        assert!(inv.quiet);
        assert_eq!(inv.env.get("ANDROID_SDK_ROOT").map(String::as_str), Some("/sdk"));
        assert_eq!(inv.env.get(SDK_HOME_VAR).map(String::as_str), Some("/sdk/sdk_home"));
        assert_eq!(inv.env.get(PATH_VAR).map(String::as_str), Some("/usr/bin"));
    }

    #[test]
    fn test_licenses_invocation_answers_every_prompt() {
        let host = RecordingHost::new();
        let manager = SdkManager::new(&host, "/sdk");

        let inv = manager.licenses_invocation(&Environment::default());

        assert_eq!(inv.args, vec!["--licenses"]);
        let stdin = String::from_utf8(inv.stdin.unwrap()).unwrap();
        assert_eq!(stdin.lines().count(), LICENSE_ANSWERS);
        assert!(stdin.lines().all(|answer| answer == "y"));
    }

    #[tokio::test]
    async fn test_license_failure_is_tolerated() {
        let host = RecordingHost::new().failing("sdkmanager");
        let manager = SdkManager::new(&host, "/sdk");
        let env = Environment::default();

        manager.accept_licenses(&env).await.unwrap();
        assert!(manager.install(&env, &[SdkComponent::Emulator]).await.is_err());
        assert_eq!(host.runs_of("sdkmanager")[0], vec!["--licenses"]);
    }
}
