//! Discovery of the git executable.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::env::expand_value;
use crate::errors::GitError;

/// Shell probes tried, in order, when `which` comes up empty. Some service
/// managers start processes with a `PATH` that only a login shell fixes.
const SHELL_PROBES: &[&str] = &["command -v git", "type -p git"];

/// Find the git executable.
///
/// Resolution order:
/// 1. `explicit`, when set and non-empty after expansion.
/// 2. `which git` against the current `PATH`.
/// 3. Each of [`SHELL_PROBES`] run through `sh -c`.
pub fn locate_git(explicit: Option<&str>) -> Result<PathBuf, GitError> {
    if let Some(path) = explicit.and_then(expand_value) {
        debug!(path = %path, "using configured git executable");
        return Ok(PathBuf::from(path));
    }

    if let Ok(path) = which::which("git") {
        debug!(path = %path.display(), "found git on PATH");
        return Ok(path);
    }

    for probe in SHELL_PROBES {
        if let Some(path) = shell_probe(probe) {
            info!(path = %path.display(), probe, "found git through shell probe");
            return Ok(path);
        }
    }

    Err(GitError::BinaryNotFound(
        "git was not found on PATH; set `git_command` in the configuration".into(),
    ))
}

#[cfg(unix)]
fn shell_probe(probe: &str) -> Option<PathBuf> {
    let output = Command::new("sh")
        .args(["-c", probe])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let path = stdout.lines().next()?.trim();
    // `type -p` on some shells prints "git is /usr/bin/git".
    let path = path.rsplit(' ').next().unwrap_or(path);
    (!path.is_empty()).then(|| PathBuf::from(path))
}

#[cfg(not(unix))]
fn shell_probe(_probe: &str) -> Option<PathBuf> {
    None
}
