//! Git working-copy operations for gitdeploy.
//!
//! The deployer talks to git through the [`GitBackend`] / [`WorkingCopy`]
//! traits. [`GitCli`] is the production implementation, driving the git
//! binary; tests substitute an in-memory recorder.

pub mod client;
pub mod locate;
pub mod remote_url;

#[cfg(test)]
pub(crate) mod recording;

use std::path::Path;

use crate::errors::GitError;

pub use client::GitCli;
pub use locate::locate_git;
pub use remote_url::build_authenticated_url;

/// Opens working copies.
pub trait GitBackend: Send + Sync {
    /// Open the working tree rooted at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn WorkingCopy>, GitError>;
}

/// The git operations a deployment needs against one working tree.
pub trait WorkingCopy {
    /// Root of the working tree.
    fn path(&self) -> &Path;

    /// Set a config value local to this working copy.
    fn set_config(&self, key: &str, value: &str) -> Result<(), GitError>;

    /// Current push URL of `remote`.
    fn remote_push_url(&self, remote: &str) -> Result<String, GitError>;

    /// Replace the URL of `remote`.
    fn set_remote_url(&self, remote: &str, url: &str) -> Result<(), GitError>;

    fn fetch(&self, remote: &str) -> Result<(), GitError>;

    /// Merge `remote/branch` into the current branch.
    fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// Stage every change in the working tree, including deletions.
    fn add_all(&self) -> Result<(), GitError>;

    /// Switch to `branch`, creating it when it exists nowhere yet.
    fn checkout(&self, branch: &str) -> Result<(), GitError>;

    /// Name of the checked-out branch, `None` when HEAD is detached.
    fn current_branch(&self) -> Result<Option<String>, GitError>;

    /// Whether `remote/branch` exists locally as a remote-tracking ref.
    fn has_remote_branch(&self, remote: &str, branch: &str) -> Result<bool, GitError>;

    /// Whether the working tree or index differs from HEAD.
    fn has_changes(&self) -> Result<bool, GitError>;

    fn commit(&self, message: &str) -> Result<(), GitError>;

    fn push(&self, remote: &str, branch: &str) -> Result<(), GitError>;
}
