//! TOML-based configuration for gitdeploy.
//!
//! The access token is stored as raw text that may reference an environment
//! variable (`personal_access_token = "$GIT_TOKEN"`). It is expanded only
//! when a [`DeployerIdentity`] is built, and the raw text is what shows up in
//! any redacted message.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::env::{expand_value, Redactor};
use crate::errors::ConfigError;
use crate::hooks::CommandList;
use crate::validation::ValidationErrors;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Deployer settings loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployerConfig {
    /// Credentials and commit author.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Commit message template, see [`crate::commit_message`].
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Commands run before each site's git deployment.
    #[serde(default)]
    pub commands_before: CommandList,

    /// Commands run after each successful git deployment.
    #[serde(default)]
    pub commands_after: CommandList,

    /// Branch used when a repository does not name one.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Remote used when a repository does not name one.
    #[serde(default = "default_remote")]
    pub default_remote: String,

    /// Explicit path to the git executable.
    #[serde(default)]
    pub git_command: Option<String>,

    /// What a failing site does to the rest of the run.
    #[serde(default)]
    pub on_site_failure: FailurePolicy,

    /// Repository per site, keyed by stable site UID.
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryEntry>,

    /// Site UID to numeric site id.
    #[serde(default)]
    pub sites: BTreeMap<String, u32>,

    /// On-disk artifact cache used by the CLI.
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_commit_message() -> String {
    "Auto deploy commit".into()
}
fn default_branch() -> String {
    "master".into()
}
fn default_remote() -> String {
    "origin".into()
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            commit_message: default_commit_message(),
            commands_before: CommandList::default(),
            commands_after: CommandList::default(),
            default_branch: default_branch(),
            default_remote: default_remote(),
            git_command: None,
            on_site_failure: FailurePolicy::default(),
            repositories: BTreeMap::new(),
            sites: BTreeMap::new(),
            cache: CacheConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Raw identity settings as written in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Username embedded in the remote URL.
    #[serde(default)]
    pub username: String,

    /// Access token, possibly an environment reference.
    #[serde(default)]
    pub personal_access_token: String,

    /// Commit author name.
    #[serde(default)]
    pub name: String,

    /// Commit author email.
    #[serde(default)]
    pub email: String,
}

/// Resolved identity used for a deployment run.
#[derive(Debug, Clone)]
pub struct DeployerIdentity {
    pub username: String,
    pub name: String,
    pub email: String,
    redactor: Redactor,
}

impl DeployerIdentity {
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        redactor: Redactor,
    ) -> Self {
        Self {
            username: username.into(),
            name: name.into(),
            email: email.into(),
            redactor,
        }
    }

    /// The expanded access token.
    pub fn secret(&self) -> &str {
        self.redactor.secret()
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }
}

// ---------------------------------------------------------------------------
// Repositories and cache
// ---------------------------------------------------------------------------

/// Raw repository settings for one site.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryEntry {
    /// Working tree path, possibly containing environment references.
    #[serde(default)]
    pub repository_path: String,

    /// Target branch; empty means the deployer default.
    #[serde(default)]
    pub branch: String,

    /// Remote name; empty means the deployer default.
    #[serde(default)]
    pub remote: String,
}

/// Location of the on-disk artifact cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Behaviour when one site's remote deployment fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run and return the error.
    #[default]
    Abort,
    /// Record the failure and move on to the next site.
    Continue,
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
            .expect("email pattern is valid")
    })
}

/// Whether `email` is a syntactically valid address.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email.trim())
}

impl DeployerConfig {
    /// Load a [`DeployerConfig`] from a TOML file at the given path.
    ///
    /// This does **not** validate -- call [`validate`](Self::validate)
    /// afterwards, or use [`load_and_validate`](Self::load_and_validate).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;

        debug!(
            repositories = config.repositories.len(),
            "configuration parsed successfully"
        );
        Ok(config)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Check every required setting, collecting all problems.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        let required = [
            ("identity.username", &self.identity.username),
            ("identity.personal_access_token", &self.identity.personal_access_token),
            ("identity.name", &self.identity.name),
            ("identity.email", &self.identity.email),
            ("commit_message", &self.commit_message),
            ("default_branch", &self.default_branch),
            ("default_remote", &self.default_remote),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.add(field, "must not be empty");
            }
        }

        if !self.identity.personal_access_token.trim().is_empty()
            && expand_value(&self.identity.personal_access_token).is_none()
        {
            errors.add(
                "identity.personal_access_token",
                format!(
                    "`{}` does not resolve to a value",
                    self.identity.personal_access_token
                ),
            );
        }

        if !self.identity.email.trim().is_empty() && !is_valid_email(&self.identity.email) {
            errors.add("identity.email", "not a valid email address");
        }

        errors
    }

    /// Convenience: load and validate in one call, failing on the first
    /// problem.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        if let Some(first) = config.validate().first() {
            return Err(ConfigError::InvalidValue {
                field: first.attribute.clone(),
                detail: first.message.clone(),
            });
        }
        Ok(config)
    }

    /// Build the identity used for a run, expanding the access token.
    pub fn identity(&self) -> DeployerIdentity {
        DeployerIdentity::new(
            self.identity.username.trim(),
            self.identity.name.trim(),
            self.identity.email.trim(),
            Redactor::new(&self.identity.personal_access_token),
        )
    }
}
