//! Toolchain Downloader
//!
//! Knows where the SDK archives live, downloads them and extracts them.

use std::ffi::{OsStr, OsString};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::time::Duration;
use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use droidup_core::{DroidupError, HostPlatform, Result};

/// Base URL of the SDK repository
pub const REPOSITORY_URL: &str = "https://dl.google.com/android/repository";

/// Command-line tools build pinned for both platforms
pub const CMDLINE_TOOLS_BUILD: &str = "6609375";

/// Legacy SDK tools build used as the base installation
pub const BASE_SDK_BUILD: &str = "4333796";

/// A downloadable archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub url: String,
    /// File name the archive is saved under while it is unpacked
    pub file_name: String,
}

impl ArchiveInfo {
    fn new(url: String, file_name: &str) -> Self {
        Self {
            url,
            file_name: file_name.to_string(),
        }
    }

    /// Full path of the archive inside `dir`
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file_name)
    }
}

/// Base SDK package for the host platform
pub fn base_sdk_info(platform: HostPlatform) -> ArchiveInfo {
    let url = format!(
        "{}/sdk-tools-{}-{}.zip",
        REPOSITORY_URL,
        platform.name(),
        BASE_SDK_BUILD
    );
    ArchiveInfo::new(url, "android-sdk-base.zip")
}

/// Command-line tools package for the host platform
pub fn cmdline_tools_info(platform: HostPlatform) -> ArchiveInfo {
    let tag = if platform.is_mac() { "mac" } else { "linux" };
    let url = format!(
        "{}/commandlinetools-{}-{}_latest.zip",
        REPOSITORY_URL, tag, CMDLINE_TOOLS_BUILD
    );
    ArchiveInfo::new(url, "android-sdk.zip")
}

/// Emulator package for an exact build id
pub fn emulator_info(platform: HostPlatform, build: &str) -> ArchiveInfo {
    let url = format!("{}/emulator-{}-{}.zip", REPOSITORY_URL, platform.name(), build);
    ArchiveInfo::new(url, "emulator.zip")
}

/// HTTP downloader and archive extractor
pub struct ToolchainDownloader {
    client: Client,
}

impl ToolchainDownloader {
    /// Create a new downloader
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DroidupError::Download(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Download a file
    pub async fn download_file(&self, url: &str, target: &Path) -> Result<()> {
        info!("Downloading {} to {:?}", url, target);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DroidupError::Download(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(DroidupError::Download(format!("{}: HTTP {}", url, response.status())));
        }

        let total_size = response.content_length().unwrap_or(0);
        let mut downloaded: u64 = 0;

        let mut file = tokio::fs::File::create(target).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DroidupError::Download(format!("{}: {}", url, e)))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;

        debug!("Downloaded {} of {} bytes", downloaded, total_size);
        info!("Download complete: {:?}", target);
        Ok(())
    }

    /// Extract a ZIP archive into `target_dir`.
    ///
    /// Entries are unpacked into a sibling staging directory first and only
    /// moved into place once the whole archive was read, so a corrupt or
    /// truncated download leaves `target_dir` as it was.
    pub async fn extract(archive: &Path, target_dir: &Path) -> Result<()> {
        info!("Extracting {:?} to {:?}", archive, target_dir);

        let archive = archive.to_path_buf();
        let target_dir = target_dir.to_path_buf();

        // Run in blocking task since zip crate is synchronous
        tokio::task::spawn_blocking(move || -> Result<()> {
            let file = std::fs::File::open(&archive)?;
            let mut zip = zip::ZipArchive::new(file)
                .map_err(|e| DroidupError::Extraction(format!("{}: {}", archive.display(), e)))?;

            let staging = staging_dir(&target_dir);
            if staging.exists() {
                std::fs::remove_dir_all(&staging)?;
            }
            std::fs::create_dir_all(&staging)?;

            let result = unpack_entries(&mut zip, &staging)
                .map_err(|e| match e {
                    DroidupError::Io(io) => {
                        DroidupError::Extraction(format!("{}: {}", archive.display(), io))
                    }
                    other => other,
                })
                .and_then(|()| merge_into(&staging, &target_dir));

            if result.is_err() && staging.exists() {
                if let Err(e) = std::fs::remove_dir_all(&staging) {
                    warn!("Failed to clean up {:?}: {}", staging, e);
                }
            }
            result
        })
        .await
        .map_err(|e| DroidupError::Extraction(e.to_string()))?
    }
}

/// Hidden sibling of `target` used while an archive is unpacked
fn staging_dir(target: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(target.file_name().unwrap_or_else(|| OsStr::new("archive")));
    name.push(".partial");
    target.with_file_name(name)
}

fn unpack_entries<R: Read + Seek>(zip: &mut zip::ZipArchive<R>, dir: &Path) -> Result<()> {
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| DroidupError::Extraction(e.to_string()))?;

        let relative = entry.enclosed_name().map(Path::to_path_buf).ok_or_else(|| {
            DroidupError::Extraction(format!("unsafe entry path: {}", entry.name()))
        })?;
        let outpath = dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = std::fs::File::create(&outpath)?;
            std::io::copy(&mut entry, &mut outfile)?;
        }

        // sdkmanager and friends must stay executable
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
            }
        }
    }
    Ok(())
}

/// Move `src` onto `dest`, merging directories and overwriting files like `unzip -o`
fn merge_into(src: &Path, dest: &Path) -> Result<()> {
    if !dest.exists() {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(src, dest)?;
        return Ok(());
    }

    if src.is_dir() && dest.is_dir() {
        for entry in std::fs::read_dir(src)? {
            let entry = entry?;
            merge_into(&entry.path(), &dest.join(entry.file_name()))?;
        }
        std::fs::remove_dir(src)?;
    } else {
        if dest.is_dir() {
            std::fs::remove_dir_all(dest)?;
        } else {
            std::fs::remove_file(dest)?;
        }
        std::fs::rename(src, dest)?;
    }
    Ok(())
}
