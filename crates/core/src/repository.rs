//! Site to repository resolution.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::config::DeployerConfig;
use crate::env::expand_value;
use crate::site::{SiteId, SiteRegistry};

/// A usable repository for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryConfig {
    /// Stable site UID the repository belongs to.
    pub site_uid: String,
    /// Expanded, normalized working tree path.
    pub repository_path: PathBuf,
    pub branch: String,
    pub remote: String,
}

/// Resolves repositories against a loaded [`DeployerConfig`].
///
/// Resolution is pure: every call re-reads the settings it was given.
#[derive(Debug, Clone, Copy)]
pub struct RepositoryResolver<'a> {
    config: &'a DeployerConfig,
}

impl<'a> RepositoryResolver<'a> {
    pub fn new(config: &'a DeployerConfig) -> Self {
        Self { config }
    }

    /// Repository for the site `uid`, or `None` when the site has no
    /// configured path or its path does not expand.
    pub fn resolve(&self, uid: &str) -> Option<RepositoryConfig> {
        let entry = self.config.repositories.get(uid)?;
        if entry.repository_path.trim().is_empty() {
            debug!(site = %uid, "site has no repository path");
            return None;
        }
        let Some(expanded) = expand_value(&entry.repository_path) else {
            debug!(site = %uid, "repository path did not expand");
            return None;
        };

        Some(RepositoryConfig {
            site_uid: uid.to_string(),
            repository_path: normalize_path(Path::new(&expanded)),
            branch: or_default(&entry.branch, &self.config.default_branch),
            remote: or_default(&entry.remote, &self.config.default_remote),
        })
    }

    /// Repository for a numeric site id, looked up through `registry`.
    pub fn resolve_site(&self, registry: &dyn SiteRegistry, site_id: SiteId) -> Option<RepositoryConfig> {
        let uid = registry.uid_for(site_id)?;
        self.resolve(&uid)
    }

    /// Every configured site UID with the outcome of resolving it, in UID
    /// order.
    pub fn all(&self) -> Vec<(&'a str, Option<RepositoryConfig>)> {
        self.config
            .repositories
            .keys()
            .map(|uid| (uid.as_str(), self.resolve(uid)))
            .collect()
    }
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.trim().to_string()
    } else {
        value.to_string()
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
/// Relative paths are anchored at the current directory.
pub fn normalize_path(path: &Path) -> PathBuf {
    let anchored = if path.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    };

    let mut out = PathBuf::new();
    for component in anchored.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
