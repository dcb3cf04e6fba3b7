//! Emulator Installer
//!
//! Installs either an exact emulator build from its archive or the latest
//! emulator package through the SDK manager.

use std::path::Path;
use tracing::info;

use droidup_core::{HostPlatform, Result};

use crate::downloader::emulator_info;
use crate::env::Environment;
use crate::host::{remove_file_if_exists, ToolHost};
use crate::sdk_manager::{SdkComponent, SdkManager};

pub struct EmulatorInstaller<'a> {
    host: &'a dyn ToolHost,
    platform: HostPlatform,
}

impl<'a> EmulatorInstaller<'a> {
    pub fn new(host: &'a dyn ToolHost, platform: HostPlatform) -> Self {
        Self { host, platform }
    }

    /// Install the pinned `build`, or the latest emulator when `None`
    pub async fn install(&self, sdk_root: &Path, env: &Environment, build: Option<&str>) -> Result<()> {
        match build {
            Some(build) => self.install_build(sdk_root, env, build).await,
            None => {
                info!("Installing latest emulator");
                SdkManager::new(self.host, sdk_root)
                    .install(env, &[SdkComponent::Emulator])
                    .await
            }
        }
    }

    /// Replace `<sdk-root>/emulator` with the archive of an exact build
    async fn install_build(&self, sdk_root: &Path, env: &Environment, build: &str) -> Result<()> {
        info!("Installing emulator build {}", build);

        let archive = emulator_info(self.platform, build);
        let archive_path = archive.path_in(&env.download_dir(sdk_root));
        self.host.download(&archive.url, &archive_path).await?;

        let emulator_dir = sdk_root.join("emulator");
        if emulator_dir.exists() {
            tokio::fs::remove_dir_all(&emulator_dir).await?;
        }

        self.host.extract(&archive_path, sdk_root).await?;
        remove_file_if_exists(&archive_path).await?;
        Ok(())
    }
}
