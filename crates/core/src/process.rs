//! [`AnalysisBackend`] that runs the configured commands as child processes.
//!
//! Command lines are split on whitespace (no shell). The process runs in the
//! project root and must print one JSON document on stdout. A non-zero exit
//! status is fine as long as stdout holds a result; compilers exit non-zero
//! when the build has errors.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::process::Command;
use tracing::debug;

use crate::backend::{AnalysisBackend, CompletionEntry, HoverInfo, SourceLocation, SymbolEntry};
use crate::config::BuildConfig;
use crate::error::BackendError;
use crate::model::BuildResult;
use crate::position::Position;

pub struct ProcessBackend {
    root: Option<PathBuf>,
    check_command: String,
    query_command: Option<String>,
    timeout: Duration,
}

impl ProcessBackend {
    pub fn new(config: &BuildConfig, root: Option<&Path>) -> Self {
        let mut backend = ProcessBackend {
            root: None,
            check_command: String::new(),
            query_command: None,
            timeout: Duration::ZERO,
        };
        backend.configure(config, root);
        backend
    }

    /// Run `command` followed by `extra_args` and decode its stdout.
    async fn run_json<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        command: &str,
        extra_args: &[String],
        cwd: Option<&Path>,
    ) -> Result<T, BackendError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(BackendError::NoCommand(kind))?;

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .args(extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        debug!(command, ?extra_args, "running analysis tool");
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| BackendError::Spawn {
                command: command.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(BackendError::TimedOut {
                    command: command.to_string(),
                    secs: self.timeout.as_secs(),
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() && !output.status.success() {
            return Err(BackendError::Exited {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_str(&stdout).map_err(|source| BackendError::Malformed {
            command: command.to_string(),
            source,
        })
    }

    /// Run `queryCommand <kind> <file> [<line> <col>]`, or return `T::default()`
    /// when no query command is configured.
    async fn query<T: DeserializeOwned + Default>(
        &self,
        kind: &'static str,
        file: &Path,
        position: Option<Position>,
    ) -> Result<T, BackendError> {
        let Some(command) = &self.query_command else {
            return Ok(T::default());
        };
        let mut args = vec![kind.to_string(), file.display().to_string()];
        if let Some(position) = position {
            let (line, col) = position.to_compiler();
            args.push(line.to_string());
            args.push(col.to_string());
        }
        self.run_json("query", command, &args, self.root.as_deref())
            .await
    }
}

#[async_trait]
impl AnalysisBackend for ProcessBackend {
    fn configure(&mut self, config: &BuildConfig, root: Option<&Path>) {
        self.root = root.map(Path::to_path_buf);
        self.check_command = config.quick_command().to_string();
        self.query_command = config.query_command.clone();
        self.timeout = config.timeout();
    }

    async fn build(&self, command: &str, root: &Path) -> Result<BuildResult, BackendError> {
        let mut result: BuildResult = self.run_json("build", command, &[], Some(root)).await?;
        result.quick_build = false;
        Ok(result)
    }

    async fn quick_build(&self, file: &Path) -> Result<BuildResult, BackendError> {
        let args = [file.display().to_string()];
        let mut result: BuildResult = self
            .run_json("check", &self.check_command, &args, self.root.as_deref())
            .await?;
        result.quick_build = true;
        result.file.get_or_insert_with(|| file.to_path_buf());
        Ok(result)
    }

    async fn hover(
        &self,
        file: &Path,
        position: Position,
    ) -> Result<Option<HoverInfo>, BackendError> {
        self.query("hover", file, Some(position)).await
    }

    async fn completions(
        &self,
        file: &Path,
        position: Position,
    ) -> Result<Vec<CompletionEntry>, BackendError> {
        self.query("completion", file, Some(position)).await
    }

    async fn definition(
        &self,
        file: &Path,
        position: Position,
    ) -> Result<Option<SourceLocation>, BackendError> {
        self.query("definition", file, Some(position)).await
    }

    async fn symbols(&self, file: &Path) -> Result<Vec<SymbolEntry>, BackendError> {
        self.query("symbols", file, None).await
    }
}
