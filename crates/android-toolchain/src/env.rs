//! Environment Snapshot
//!
//! The bootstrap never touches the process-global environment. It captures
//! the variables once, threads the snapshot through every step by value, and
//! records what has to be exported to later job steps.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use droidup_core::{DroidupError, ExportSink, Result};

/// Variable designating the SDK root; required
pub const SDK_ROOT_VAR: &str = "ANDROID_SDK_ROOT";
/// Variable designating the SDK home (user settings, AVDs)
pub const SDK_HOME_VAR: &str = "ANDROID_SDK_HOME";
/// Executable search path
pub const PATH_VAR: &str = "PATH";

const PATH_SEPARATOR: &str = ":";

/// Snapshot of environment variables plus pending exports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
    exported: BTreeMap<String, String>,
    path_additions: Vec<PathBuf>,
}

impl Environment {
    /// Capture the current process environment
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build a snapshot from explicit pairs
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ..Default::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set a variable in the snapshot only
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Set a variable and export it to later job steps
    pub fn export_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        debug!("Exporting {}={}", key, value);
        self.vars.insert(key.clone(), value.clone());
        self.exported.insert(key, value);
        self
    }

    /// SDK root, a configuration error when unset or blank
    pub fn sdk_root(&self) -> Result<PathBuf> {
        self.get(SDK_ROOT_VAR)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                DroidupError::Config(format!("{} environment variable is not set", SDK_ROOT_VAR))
            })
    }

    /// Invoking user name, used for ownership normalization
    pub fn user(&self) -> Option<&str> {
        self.get("USER").filter(|u| !u.trim().is_empty())
    }

    /// Where archives are downloaded to before unpacking
    pub fn download_dir(&self, sdk_root: &Path) -> PathBuf {
        self.get("HOME")
            .filter(|h| !h.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| sdk_root.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| sdk_root.to_path_buf())
    }

    /// Current PATH value
    pub fn path(&self) -> &str {
        self.get(PATH_VAR).unwrap_or_default()
    }

    /// PATH split into its non-empty segments
    pub fn path_entries(&self) -> Vec<&str> {
        self.path()
            .split(PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    /// Replace PATH entirely and export the new value
    pub fn export_path(self, entries: &[String]) -> Self {
        let value = entries.join(PATH_SEPARATOR);
        self.export_var(PATH_VAR, value)
    }

    /// Prepend directories to PATH for the rest of the job
    pub fn add_path(mut self, entries: Vec<PathBuf>) -> Self {
        let mut segments: Vec<String> = entries
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        segments.extend(self.path_entries().into_iter().map(str::to_string));
        self.vars
            .insert(PATH_VAR.to_string(), segments.join(PATH_SEPARATOR));

        for entry in entries {
            if !self.path_additions.contains(&entry) {
                self.path_additions.push(entry);
            }
        }
        self
    }

    /// Variables exported so far, in name order
    pub fn exported(&self) -> &BTreeMap<String, String> {
        &self.exported
    }

    /// PATH prefixes added so far, in the order they appear on PATH
    pub fn path_additions(&self) -> &[PathBuf] {
        &self.path_additions
    }

    /// Write pending exports through the job runner's file commands
    pub async fn flush(&self, sink: &ExportSink) -> Result<()> {
        for (key, value) in &self.exported {
            sink.export_variable(key, value).await?;
        }
        sink.add_path(&self.path_additions).await?;

        if !self.exported.is_empty() || !self.path_additions.is_empty() {
            info!(
                "Exported {} variable(s) and {} PATH entr(ies) to later steps",
                self.exported.len(),
                self.path_additions.len()
            );
        }
        Ok(())
    }
}

/// Drop PATH segments that point into an existing Android installation
pub fn without_android_entries<'a>(entries: &[&'a str]) -> Vec<&'a str> {
    entries
        .iter()
        .copied()
        .filter(|segment| !segment.contains("Android"))
        .collect()
}
