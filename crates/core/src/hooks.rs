//! Before/after command execution.
//!
//! Commands run one at a time through the platform shell. The first command
//! that exits non-zero stops the list and is reported as a [`HookError`].

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::env::Redactor;
use crate::errors::HookError;

/// Commands as configured: one multi-line script or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandList {
    Script(String),
    Lines(Vec<String>),
}

impl Default for CommandList {
    fn default() -> Self {
        Self::Script(String::new())
    }
}

impl CommandList {
    /// Individual commands, in order, without blank entries. Scripts are
    /// split on `\n`, `\r\n` and `\r`.
    pub fn commands(&self) -> Vec<String> {
        let lines: Vec<&str> = match self {
            Self::Script(script) => script.split(['\r', '\n']).collect(),
            Self::Lines(lines) => lines.iter().map(String::as_str).collect(),
        };
        lines
            .into_iter()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.commands().is_empty()
    }
}

impl From<&str> for CommandList {
    fn from(script: &str) -> Self {
        Self::Script(script.to_string())
    }
}

impl From<Vec<String>> for CommandList {
    fn from(lines: Vec<String>) -> Self {
        Self::Lines(lines)
    }
}

/// Working directory, extra environment and secret redaction for a
/// command run.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    redactor: Option<Redactor>,
}

impl HookContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Scrub the secret from command text and output before it is logged
    /// or returned.
    pub fn redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = Some(redactor);
        self
    }

    fn scrub(&self, text: &str) -> String {
        match &self.redactor {
            Some(redactor) => redactor.redact(text),
            None => text.to_string(),
        }
    }
}

/// Run every command in `commands`, stopping at the first failure.
///
/// Returns the number of commands executed. An empty list is a no-op.
pub fn run_commands(commands: &CommandList, context: &HookContext) -> Result<usize, HookError> {
    let commands = commands.commands();
    if commands.is_empty() {
        return Ok(0);
    }

    for command in &commands {
        run_one(command, context)?;
    }
    Ok(commands.len())
}

fn run_one(command: &str, context: &HookContext) -> Result<(), HookError> {
    let shown = context.scrub(command);
    info!(command = %shown, "running command");

    let mut cmd = shell(command);
    if let Some(dir) = &context.cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in &context.env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd.output().map_err(|source| HookError::SpawnFailed {
        command: shown.clone(),
        source,
    })?;

    let stdout = context.scrub(String::from_utf8_lossy(&output.stdout).trim());
    if !stdout.is_empty() {
        debug!(command = %shown, %stdout, "command output");
    }

    if !output.status.success() {
        let stderr = context.scrub(String::from_utf8_lossy(&output.stderr).trim());
        let exit_code = output.status.code().unwrap_or(-1);
        warn!(command = %shown, exit_code, %stderr, "command failed");
        return Err(HookError::CommandFailed {
            command: shown,
            exit_code,
            stderr,
        });
    }
    Ok(())
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
