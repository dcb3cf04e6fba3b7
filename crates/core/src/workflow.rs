//! Workflow Commands
//!
//! Talks to the CI job runner hosting the bootstrap: `::error::` and
//! `::group::` commands on stdout, plus the `GITHUB_ENV` / `GITHUB_PATH` file
//! commands that make exported variables visible to later steps.

use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::Result;

/// Delimiter used for heredoc-style multi-line `GITHUB_ENV` values
const HEREDOC_DELIMITER: &str = "DROIDUP_EOF";

/// A v2 workflow command: `::command::data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowCommand {
    pub command: String,
    pub data: String,
}

impl WorkflowCommand {
    pub fn new(command: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            data: data.into(),
        }
    }
}

impl fmt::Display for WorkflowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "::{}::{}", self.command, escape_data(&self.data))
    }
}

/// Escape command data so it survives on a single line
pub fn escape_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Mark the step failed with a message the runner surfaces as an annotation
pub fn fatal(message: &str) {
    println!("{}", WorkflowCommand::new("error", message));
}

/// Open a collapsible log group
pub fn start_group(title: &str) {
    println!("{}", WorkflowCommand::new("group", title));
}

/// Close the current log group
pub fn end_group() {
    println!("::endgroup::");
}

/// Closes its log group when dropped, including on early returns
#[must_use = "the group closes as soon as the guard is dropped"]
pub struct GroupGuard(());

impl Drop for GroupGuard {
    fn drop(&mut self) {
        end_group();
    }
}

/// Open a log group that lasts as long as the returned guard
pub fn group(title: &str) -> GroupGuard {
    start_group(title);
    GroupGuard(())
}

/// Destination for variables and PATH entries exported to later job steps
#[derive(Debug, Clone, Default)]
pub struct ExportSink {
    env_file: Option<PathBuf>,
    path_file: Option<PathBuf>,
}

impl ExportSink {
    /// Build a sink from explicit file command paths
    pub fn new(env_file: Option<PathBuf>, path_file: Option<PathBuf>) -> Self {
        Self { env_file, path_file }
    }

    /// Build a sink from `GITHUB_ENV` / `GITHUB_PATH` looked up through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let file = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };
        Self::new(file("GITHUB_ENV"), file("GITHUB_PATH"))
    }

    /// Export a variable for the rest of the job
    pub async fn export_variable(&self, name: &str, value: &str) -> Result<()> {
        match &self.env_file {
            Some(file) => {
                let line = if value.contains('\n') {
                    format!("{name}<<{HEREDOC_DELIMITER}\n{value}\n{HEREDOC_DELIMITER}\n")
                } else {
                    format!("{name}={value}\n")
                };
                append(file, &line).await?;
                debug!("GITHUB_ENV: {}={}", name, value);
            }
            None => println!("{}", export_line(name, value)),
        }
        Ok(())
    }

    /// Prepend entries to PATH for the rest of the job
    pub async fn add_path(&self, entries: &[PathBuf]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        match &self.path_file {
            Some(file) => {
                // The runner prepends each line, so the last line ends up first.
                let mut content = String::new();
                for entry in entries.iter().rev() {
                    content.push_str(&entry.to_string_lossy());
                    content.push('\n');
                }
                append(file, &content).await?;
                debug!("GITHUB_PATH: {:?}", entries);
            }
            None => println!("{}", path_export_line(entries)),
        }
        Ok(())
    }
}

/// Quote `value` for a POSIX shell; nothing inside single quotes expands
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// `export NAME='value'`, safe to `eval`
pub fn export_line(name: &str, value: &str) -> String {
    format!("export {}={}", name, shell_quote(value))
}

/// `export PATH='a:b':"$PATH"`, safe to `eval`
pub fn path_export_line(entries: &[PathBuf]) -> String {
    let joined: Vec<String> = entries
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();
    format!("export PATH={}:\"$PATH\"", shell_quote(&joined.join(":")))
}

async fn append(file: &Path, content: &str) -> Result<()> {
    let mut handle = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .await?;
    handle.write_all(content.as_bytes()).await?;
    handle.flush().await?;
    Ok(())
}
