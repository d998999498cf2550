//! Error types for the gitdeploy core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from git working-copy operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// No git executable could be located.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// The path does not exist or is not a git working tree.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// The named remote is not configured in the working copy.
    #[error("git remote '{0}' not found")]
    RemoteNotFound(String),

    /// A `git` command exited with a non-zero status.
    #[error("git {command} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Hook errors
// ---------------------------------------------------------------------------

/// Errors from running the configured before/after commands.
#[derive(Debug, Error)]
pub enum HookError {
    /// The command could not be started.
    #[error("failed to start command `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command exited with a non-zero status.
    #[error("command `{command}` failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

// ---------------------------------------------------------------------------
// Deploy errors
// ---------------------------------------------------------------------------

/// Errors that abort the remote deployment of a site.
///
/// Messages are redacted before one of these is built, so the display text
/// is safe to show to users.
#[derive(Debug, Error)]
pub enum DeployError {
    /// A git step failed.
    #[error("remote deploy of site '{site}' failed: {detail}")]
    Git {
        site: String,
        detail: String,
    },

    /// A before/after command failed.
    #[error("{phase} commands for site '{site}' failed: {detail}")]
    Hook {
        site: String,
        phase: HookPhase,
        detail: String,
    },
}

impl DeployError {
    /// Site UID the failure belongs to.
    pub fn site(&self) -> &str {
        match self {
            Self::Git { site, .. } | Self::Hook { site, .. } => site,
        }
    }
}

/// Which command list a [`DeployError::Hook`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
        }
    }
}
