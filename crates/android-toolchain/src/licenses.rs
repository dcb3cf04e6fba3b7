//! License Handling
//!
//! Makes the SDK manager's license prompts non-interactive, either by
//! answering them or by writing the marker files it looks for.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use droidup_core::{HostPlatform, Result};

use crate::env::Environment;
use crate::host::ToolHost;
use crate::sdk_manager::SdkManager;

/// SDK home directory name under the SDK root
pub const SDK_HOME_DIR: &str = "sdk_home";

/// Acceptance hash of the preview license
pub const PREVIEW_LICENSE_HASH: &str = "84831b9409646a918e30573bab4c9c91346d8abd";

/// Acceptance hash of the ARM DBT license, needed for API 30 images
pub const ARM_DBT_LICENSE_HASH: &str = "859f317696f67ef3d7f30a50a5560e7834b43903";

/// A license marker file under `<sdk-root>/licenses`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseMarker {
    Preview,
    ArmDbt,
}

impl LicenseMarker {
    pub fn file_name(&self) -> &'static str {
        match self {
            LicenseMarker::Preview => "android-sdk-preview-license",
            LicenseMarker::ArmDbt => "android-sdk-arm-dbt-license",
        }
    }

    pub fn hash(&self) -> &'static str {
        match self {
            LicenseMarker::Preview => PREVIEW_LICENSE_HASH,
            LicenseMarker::ArmDbt => ARM_DBT_LICENSE_HASH,
        }
    }

    /// File contents: a blank line followed by the hash
    pub fn contents(&self) -> String {
        format!("\n{}", self.hash())
    }

    pub fn path(&self, sdk_root: &Path) -> PathBuf {
        sdk_root.join("licenses").join(self.file_name())
    }

    /// Markers required for a platform and API level
    pub fn required(platform: HostPlatform, api_level: u32) -> Vec<LicenseMarker> {
        if platform.is_mac() {
            return Vec::new();
        }
        let mut markers = vec![LicenseMarker::Preview];
        if api_level == 30 {
            markers.push(LicenseMarker::ArmDbt);
        }
        markers
    }
}

/// Write the markers required for this run, leaving existing ones untouched.
///
/// Returns the markers actually written.
pub async fn write_license_markers(
    sdk_root: &Path,
    platform: HostPlatform,
    api_level: u32,
) -> Result<Vec<LicenseMarker>> {
    let mut written = Vec::new();

    for marker in LicenseMarker::required(platform, api_level) {
        let path = marker.path(sdk_root);
        if path.exists() {
            debug!("License marker {:?} already present", path);
            continue;
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, marker.contents()).await?;
        info!("Wrote license marker {:?}", path);
        written.push(marker);
    }

    Ok(written)
}

/// Accepts every SDK license through the package manager
pub struct LicenseAcceptor<'a> {
    host: &'a dyn ToolHost,
}

impl<'a> LicenseAcceptor<'a> {
    pub fn new(host: &'a dyn ToolHost) -> Self {
        Self { host }
    }

    /// Prepare the SDK home and answer the license prompts.
    ///
    /// Returns `true` once the command has been issued; the package manager's
    /// exit status is not inspected.
    pub async fn accept(&self, sdk_root: &Path, env: &Environment) -> Result<bool> {
        let sdk_home = sdk_root.join(SDK_HOME_DIR);
        tokio::fs::create_dir_all(&sdk_home).await?;
        tokio::fs::create_dir_all(sdk_root.join("licenses")).await?;

        let repositories = sdk_home.join("repositories.cfg");
        if !repositories.exists() {
            tokio::fs::write(&repositories, "").await?;
            debug!("Created {:?}", repositories);
        }

        SdkManager::new(self.host, sdk_root).accept_licenses(env).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;

    #[test]
    fn test_required_markers() {
        assert_eq!(
            LicenseMarker::required(HostPlatform::Linux, 30),
            vec![LicenseMarker::Preview, LicenseMarker::ArmDbt]
        );
        assert_eq!(LicenseMarker::required(HostPlatform::Linux, 29), vec![LicenseMarker::Preview]);
        assert!(LicenseMarker::required(HostPlatform::Darwin, 30).is_empty());
    }

    #[tokio::test]
    async fn test_markers_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let written = write_license_markers(root, HostPlatform::Linux, 30).await.unwrap();
        assert_eq!(written.len(), 2);

        let preview = std::fs::read_to_string(root.join("licenses/android-sdk-preview-license")).unwrap();
        assert_eq!(preview, "\n84831b9409646a918e30573bab4c9c91346d8abd");

        let written = write_license_markers(root, HostPlatform::Linux, 30).await.unwrap();
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_accept_prepares_sdk_home() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sdk");
        let host = RecordingHost::new().failing("sdkmanager");

        let accepted = LicenseAcceptor::new(&host)
            .accept(&root, &Environment::default())
            .await
            .unwrap();

        assert!(accepted);
        assert!(root.join("licenses").is_dir());
        assert_eq!(std::fs::read_to_string(root.join("sdk_home/repositories.cfg")).unwrap(), "");
        assert_eq!(host.runs_of("sdkmanager"), vec![vec!["--licenses".to_string()]]);
    }
}
