//! In-memory [`GitBackend`] that records every call, for unit tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{GitBackend, WorkingCopy};
use crate::errors::GitError;

/// Shared behaviour and call log of a [`RecordingBackend`].
#[derive(Debug, Default)]
pub struct Script {
    pub calls: Vec<String>,
    pub remote_url: String,
    pub current_branch: Option<String>,
    pub remote_branch_exists: bool,
    pub has_changes: bool,
    /// Operation name that fails, e.g. `"push"`.
    pub fail_on: Option<&'static str>,
    /// Stderr used for the scripted failure.
    pub failure_text: String,
    /// Paths that fail to open.
    pub missing: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    pub script: Arc<Mutex<Script>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        {
            let mut s = backend.script.lock().unwrap();
            s.remote_url = "https://github.com/acme/site.git".into();
            s.current_branch = Some("master".into());
            s.has_changes = true;
        }
        backend
    }

    pub fn with(self, f: impl FnOnce(&mut Script)) -> Self {
        f(&mut self.script.lock().unwrap());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Operation names only, without arguments.
    pub fn ops(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }
}

impl GitBackend for RecordingBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn WorkingCopy>, GitError> {
        let mut s = self.script.lock().unwrap();
        s.calls.push(format!("open {}", path.display()));
        if s.missing.iter().any(|p| p == path) {
            return Err(GitError::RepositoryNotFound(path.display().to_string()));
        }
        drop(s);
        Ok(Box::new(RecordingCopy {
            path: path.to_path_buf(),
            script: Arc::clone(&self.script),
        }))
    }
}

struct RecordingCopy {
    path: PathBuf,
    script: Arc<Mutex<Script>>,
}

impl RecordingCopy {
    fn record(&self, op: &'static str, detail: String) -> Result<(), GitError> {
        let mut s = self.script.lock().unwrap();
        s.calls.push(if detail.is_empty() {
            op.to_string()
        } else {
            format!("{} {}", op, detail)
        });
        if s.fail_on == Some(op) {
            return Err(GitError::CommandFailed {
                command: op.to_string(),
                exit_code: 128,
                stderr: s.failure_text.clone(),
            });
        }
        Ok(())
    }
}

impl WorkingCopy for RecordingCopy {
    fn path(&self) -> &Path {
        &self.path
    }

    fn set_config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.record("config", format!("{}={}", key, value))
    }

    fn remote_push_url(&self, remote: &str) -> Result<String, GitError> {
        self.record("get-url", remote.to_string())?;
        Ok(self.script.lock().unwrap().remote_url.clone())
    }

    fn set_remote_url(&self, remote: &str, url: &str) -> Result<(), GitError> {
        self.record("set-url", format!("{} {}", remote, url))?;
        self.script.lock().unwrap().remote_url = url.to_string();
        Ok(())
    }

    fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.record("fetch", remote.to_string())
    }

    fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.record("pull", format!("{} {}", remote, branch))
    }

    fn add_all(&self) -> Result<(), GitError> {
        self.record("add", String::new())
    }

    fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.record("checkout", branch.to_string())?;
        self.script.lock().unwrap().current_branch = Some(branch.to_string());
        Ok(())
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        Ok(self.script.lock().unwrap().current_branch.clone())
    }

    fn has_remote_branch(&self, _remote: &str, _branch: &str) -> Result<bool, GitError> {
        Ok(self.script.lock().unwrap().remote_branch_exists)
    }

    fn has_changes(&self) -> Result<bool, GitError> {
        Ok(self.script.lock().unwrap().has_changes)
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.record("commit", message.to_string())?;
        self.script.lock().unwrap().has_changes = false;
        Ok(())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.record("push", format!("{} {}", remote, branch))
    }
}
