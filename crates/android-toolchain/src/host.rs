//! Tool Host
//!
//! Every side effect with an external tool goes through [`ToolHost`]: child
//! processes built as an explicit argument vector, archive downloads and
//! archive extraction.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use droidup_core::{DroidupError, Result};

use crate::downloader::ToolchainDownloader;

/// A structured child process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Bytes written to the child's stdin before it is closed
    pub stdin: Option<Vec<u8>>,
    /// Discard the child's stdout
    pub quiet: bool,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            stdin: None,
            quiet: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// File name of the program, for matching and messages
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a child process finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub success: bool,
    pub code: Option<i32>,
}

impl ProcessOutcome {
    pub fn success() -> Self {
        Self { success: true, code: Some(0) }
    }

    pub fn failure(code: i32) -> Self {
        Self { success: false, code: Some(code) }
    }

    fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        }
    }
}

/// Executes external tools on behalf of the bootstrapper
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// Run a process to completion
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutcome>;

    /// Download `url` into the file `dest`
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;

    /// Unpack `archive` into the directory `dest`
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Run a process and turn a non-zero exit into an error
pub async fn run_checked(host: &dyn ToolHost, invocation: &Invocation) -> Result<()> {
    let outcome = host.run(invocation).await?;
    if outcome.success {
        Ok(())
    } else {
        Err(DroidupError::Process {
            program: invocation.program_name(),
            status: outcome.describe(),
        })
    }
}

/// [`ToolHost`] backed by real processes, HTTP and archive crates
pub struct SystemHost {
    downloader: ToolchainDownloader,
}

impl SystemHost {
    pub fn new() -> Result<Self> {
        Ok(Self {
            downloader: ToolchainDownloader::new()?,
        })
    }
}

#[async_trait]
impl ToolHost for SystemHost {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutcome> {
        info!("[command]{}", invocation);

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.envs(&invocation.env);
        cmd.stdin(if invocation.stdin.is_some() { Stdio::piped() } else { Stdio::null() });
        if invocation.quiet {
            cmd.stdout(Stdio::null());
        }

        let mut child = cmd.spawn().map_err(|e| {
            DroidupError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to start {}: {}", invocation.program.display(), e),
            ))
        })?;

        if let (Some(input), Some(mut stdin)) = (&invocation.stdin, child.stdin.take()) {
            // The child may stop reading early, the same as `yes | tool`.
            if let Err(e) = stdin.write_all(input).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
                debug!("{} closed stdin early", invocation.program_name());
            }
            drop(stdin);
        }

        let status = child.wait().await?;
        if !status.success() {
            warn!("{} exited with {:?}", invocation.program_name(), status.code());
        }

        Ok(ProcessOutcome {
            success: status.success(),
            code: status.code(),
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        self.downloader.download_file(url, dest).await
    }

    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        ToolchainDownloader::extract(archive, dest).await
    }
}

/// Remove a file, treating an already-missing file as success (`rm -f`)
pub async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::RecordingHost;

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("/sdk/cmdline-tools/tools/bin/sdkmanager")
            .arg("--install")
            .args(["build-tools;30.0.0", "platform-tools"]);
        assert_eq!(
            inv.to_string(),
            "/sdk/cmdline-tools/tools/bin/sdkmanager --install build-tools;30.0.0 platform-tools"
        );
        assert_eq!(inv.program_name(), "sdkmanager");
    }

    #[tokio::test]
    async fn test_run_checked_reports_failure() {
        let host = RecordingHost::new().failing("chown");
        let err = run_checked(&host, &Invocation::new("chown").arg("-R"))
            .await
            .unwrap_err();
        assert!(matches!(err, DroidupError::Process { ref program, .. } if program == "chown"));

        run_checked(&host, &Invocation::new("sdkmanager")).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_file_if_exists(&dir.path().join("android-sdk.zip")).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_host_feeds_stdin() {
        let host = SystemHost::new().unwrap();
        let inv = Invocation::new("sh")
            .args(["-c", "read answer && test \"$answer\" = y"])
            .stdin(b"y\n".to_vec())
            .quiet();
        let outcome = host.run(&inv).await.unwrap();
        assert!(outcome.success);

        let outcome = host.run(&Invocation::new("sh").args(["-c", "exit 3"])).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::failure(3));
    }
}
