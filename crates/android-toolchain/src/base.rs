//! Base SDK Installer
//!
//! Fetches the foundational SDK package into an empty SDK root and points
//! the environment at the new installation.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use droidup_core::{HostPlatform, Result};

use crate::downloader::base_sdk_info;
use crate::env::{without_android_entries, Environment, SDK_HOME_VAR};
use crate::host::{remove_file_if_exists, ToolHost};
use crate::licenses::SDK_HOME_DIR;

/// Installs the base SDK package
pub struct BaseInstaller<'a> {
    host: &'a dyn ToolHost,
    platform: HostPlatform,
}

impl<'a> BaseInstaller<'a> {
    pub fn new(host: &'a dyn ToolHost, platform: HostPlatform) -> Self {
        Self { host, platform }
    }

    /// Tool directories of the base installation, in PATH order
    pub fn tool_dirs(sdk_root: &Path) -> Vec<PathBuf> {
        vec![
            sdk_root.join("tools"),
            sdk_root.join("tools").join("bin"),
            sdk_root.join("platform-tools"),
        ]
    }

    /// Download and unpack the base SDK.
    ///
    /// Returns the updated environment and `true` once every step completed.
    /// The archive contents are not verified.
    pub async fn install(&self, sdk_root: &Path, env: Environment) -> Result<(Environment, bool)> {
        let archive = base_sdk_info(self.platform);
        info!("Installing base Android SDK into {:?}", sdk_root);

        let sdk_home = sdk_root.join(SDK_HOME_DIR);
        if sdk_home.exists() {
            let backup = backup_path(&sdk_home);
            warn!("Existing SDK home found, moving it to {:?}", backup);
            tokio::fs::rename(&sdk_home, &backup).await?;
        }

        let download_dir = env.download_dir(sdk_root);
        let archive_path = archive.path_in(&download_dir);
        self.host.download(&archive.url, &archive_path).await?;

        self.host.extract(&archive_path, sdk_root).await?;
        remove_file_if_exists(&archive_path).await?;

        tokio::fs::create_dir_all(&sdk_home).await?;

        let env = env.export_var(SDK_HOME_VAR, sdk_home.to_string_lossy());
        let env = rewrite_path(env, sdk_root);

        info!("Base Android SDK installed");
        Ok((env, true))
    }
}

/// Prepend the base tool directories and drop prior Android entries
fn rewrite_path(env: Environment, sdk_root: &Path) -> Environment {
    let mut entries: Vec<String> = BaseInstaller::tool_dirs(sdk_root)
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();

    let previous = env.path_entries();
    let kept = without_android_entries(&previous);
    let dropped = previous.len() - kept.len();
    if dropped > 0 {
        info!("Removed {} Android entr(ies) from PATH", dropped);
    }
    entries.extend(kept.into_iter().map(str::to_string));

    env.export_path(&entries)
}

/// `<dir>.backup.<unix millis>`
fn backup_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Utc::now().timestamp_millis();
    let mut name = dir.as_os_str().to_os_string();
    name.push(format!(".backup.{}", stamp));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::PATH_VAR;
    use crate::host::testing::{Action, RecordingHost};

    #[tokio::test]
    async fn test_install_exports_sdk_home_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sdk");
        let home = dir.path().join("home");
        let host = RecordingHost::new();
        let env = Environment::from_vars([
            ("HOME", home.to_string_lossy().to_string()),
            (PATH_VAR, "/opt/Android/sdk/tools:/usr/bin:/bin".to_string()),
        ]);

        let (env, ok) = BaseInstaller::new(&host, HostPlatform::Linux)
            .install(&root, env)
            .await
            .unwrap();

        assert!(ok);
        assert!(root.join("sdk_home").is_dir());
        assert!(!home.join("android-sdk-base.zip").exists());

        let expected_home = root.join("sdk_home").to_string_lossy().to_string();
        assert_eq!(env.exported().get(SDK_HOME_VAR), Some(&expected_home));

        let path = env.path_entries();
        assert_eq!(path[0], root.join("tools").to_string_lossy());
        assert_eq!(path[2], root.join("platform-tools").to_string_lossy());
        assert_eq!(&path[3..], &["/usr/bin", "/bin"]);

        assert_eq!(
            host.actions()[0],
            Action::Download {
                url: "https://dl.google.com/android/repository/sdk-tools-linux-4333796.zip".into(),
                dest: home.join("android-sdk-base.zip"),
            }
        );
    }

    #[tokio::test]
    async fn test_existing_sdk_home_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sdk");
        std::fs::create_dir_all(root.join("sdk_home")).unwrap();
        std::fs::write(root.join("sdk_home/avd.ini"), b"keep").unwrap();
        let host = RecordingHost::new();

        BaseInstaller::new(&host, HostPlatform::Darwin)
            .install(&root, Environment::from_vars([("HOME", dir.path().to_string_lossy())]))
            .await
            .unwrap();

        let backups: Vec<_> = std::fs::read_dir(&root)
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with("sdk_home.backup."))
            .collect();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].path().join("avd.ini").exists());
        assert!(!root.join("sdk_home/avd.ini").exists());
        assert!(host.downloads()[0].contains("sdk-tools-darwin"));
    }
}
