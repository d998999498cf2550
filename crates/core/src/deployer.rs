//! Deployment orchestrator.
//!
//! [`GitDeployer`] groups the requested pages by site, writes each page into
//! its site's repository and then publishes every repository in turn:
//! before-commit listeners, `commands_before`, git reconciliation,
//! after-commit listeners, `commands_after`.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cache::ArtifactCache;
use crate::commit_message::{CommitMessage, MessageContext};
use crate::config::{DeployerConfig, DeployerIdentity, FailurePolicy};
use crate::engine::ReconciliationEngine;
use crate::errors::{DeployError, GitError, HookPhase};
use crate::file_sync::{artifact_path, sync_file, FileAction};
use crate::git::{GitBackend, GitCli};
use crate::hooks::{run_commands, CommandList, HookContext};
use crate::repository::{RepositoryConfig, RepositoryResolver};
use crate::site::{group_by_site, SiteId, SiteRegistry, SiteUri};

// ---------------------------------------------------------------------------
// Events and progress
// ---------------------------------------------------------------------------

/// Passed to commit listeners for one site.
#[derive(Debug, Clone, Copy)]
pub struct CommitEvent<'a> {
    pub site_uid: &'a str,
    pub site_id: SiteId,
    pub repository: &'a RepositoryConfig,
}

/// A progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Pages processed so far.
    pub count: usize,
    /// Pages that will be processed in this run.
    pub total: usize,
    pub label: String,
}

type BeforeCommit = Box<dyn Fn(&CommitEvent<'_>) -> bool + Send + Sync>;
type AfterCommit = Box<dyn Fn(&CommitEvent<'_>) + Send + Sync>;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// How a site's remote deployment ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SiteOutcome {
    Deployed { committed: bool },
    /// A before-commit listener vetoed the remote step.
    Cancelled,
    /// Redacted failure text.
    Failed { error: String },
}

/// Per-site result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub site_uid: String,
    pub site_id: SiteId,
    pub written: usize,
    pub deleted: usize,
    pub failed_files: usize,
    pub outcome: SiteOutcome,
}

/// Result of a deployment run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeployReport {
    pub total: usize,
    pub sites: Vec<SiteReport>,
    /// Requested sites without a usable repository.
    pub skipped: Vec<SiteId>,
}

impl DeployReport {
    pub fn has_failures(&self) -> bool {
        self.sites
            .iter()
            .any(|s| matches!(s.outcome, SiteOutcome::Failed { .. }))
    }

    pub fn deployed(&self) -> usize {
        self.sites
            .iter()
            .filter(|s| matches!(s.outcome, SiteOutcome::Deployed { .. }))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Deployer
// ---------------------------------------------------------------------------

/// Publishes cached pages to per-site git repositories.
pub struct GitDeployer {
    config: DeployerConfig,
    cache: Arc<dyn ArtifactCache>,
    registry: Arc<dyn SiteRegistry>,
    backend: Box<dyn GitBackend>,
    before_commit: Vec<BeforeCommit>,
    after_commit: Vec<AfterCommit>,
}

impl GitDeployer {
    pub fn new(
        config: DeployerConfig,
        cache: Arc<dyn ArtifactCache>,
        registry: Arc<dyn SiteRegistry>,
        backend: Box<dyn GitBackend>,
    ) -> Self {
        Self {
            config,
            cache,
            registry,
            backend,
            before_commit: Vec::new(),
            after_commit: Vec::new(),
        }
    }

    /// Build a deployer driving the git binary found via the config.
    pub fn with_git_cli(
        config: DeployerConfig,
        cache: Arc<dyn ArtifactCache>,
        registry: Arc<dyn SiteRegistry>,
    ) -> Result<Self, GitError> {
        let identity = config.identity();
        let git = GitCli::discover(config.git_command.as_deref(), identity.redactor().clone())?;
        Ok(Self::new(config, cache, registry, Box::new(git)))
    }

    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }

    /// Register a listener that may veto a site's remote deployment by
    /// returning `false`.
    pub fn on_before_commit<F>(&mut self, listener: F)
    where
        F: Fn(&CommitEvent<'_>) -> bool + Send + Sync + 'static,
    {
        self.before_commit.push(Box::new(listener));
    }

    /// Register a listener told about every successful remote deployment.
    pub fn on_after_commit<F>(&mut self, listener: F)
    where
        F: Fn(&CommitEvent<'_>) + Send + Sync + 'static,
    {
        self.after_commit.push(Box::new(listener));
    }

    /// Deploy without progress reporting.
    pub fn deploy<I>(&self, uris: I) -> Result<DeployReport, DeployError>
    where
        I: IntoIterator<Item = SiteUri>,
    {
        self.deploy_with_progress(uris, &mut |_| {})
    }

    /// Deploy `uris`, reporting progress after every page and before every
    /// site's remote step.
    ///
    /// With [`FailurePolicy::Abort`] the first failing site ends the run with
    /// its error. With [`FailurePolicy::Continue`] failures are recorded in
    /// the report and the run moves on.
    pub fn deploy_with_progress<I>(
        &self,
        uris: I,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<DeployReport, DeployError>
    where
        I: IntoIterator<Item = SiteUri>,
    {
        let identity = self.config.identity();
        let resolver = RepositoryResolver::new(&self.config);
        let mut report = DeployReport::default();

        let mut plan = Vec::new();
        for (site_id, site_uris) in group_by_site(uris) {
            match resolver.resolve_site(self.registry.as_ref(), site_id) {
                Some(repo) => plan.push((site_id, repo, site_uris)),
                None => {
                    debug!(site_id, "no usable repository, skipping site");
                    report.skipped.push(site_id);
                }
            }
        }

        report.total = plan.iter().map(|(_, _, uris)| uris.len()).sum();
        let total = report.total;
        let mut count = 0;
        progress(&Progress {
            count,
            total,
            label: format!("Deploying {} pages to {} repositories", total, plan.len()),
        });

        for (site_id, repo, site_uris) in &plan {
            let mut site = SiteReport {
                site_uid: repo.site_uid.clone(),
                site_id: *site_id,
                written: 0,
                deleted: 0,
                failed_files: 0,
                outcome: SiteOutcome::Cancelled,
            };

            for uri in site_uris {
                let content = self.cache.get(uri);
                match sync_file(&content, &artifact_path(&repo.repository_path, &uri.uri)) {
                    FileAction::Written => site.written += 1,
                    FileAction::Deleted => site.deleted += 1,
                    FileAction::Absent => {}
                    FileAction::Failed(_) => site.failed_files += 1,
                }
                count += 1;
                progress(&Progress {
                    count,
                    total,
                    label: format!("Synchronized /{}", uri.uri),
                });
            }

            progress(&Progress {
                count,
                total,
                label: format!("Deploying {} to remote", repo.site_uid),
            });

            let event = CommitEvent {
                site_uid: &repo.site_uid,
                site_id: *site_id,
                repository: repo,
            };
            site.outcome = match self.deploy_site(&identity, &event, site_uris.len()) {
                Ok(Some(committed)) => SiteOutcome::Deployed { committed },
                Ok(None) => SiteOutcome::Cancelled,
                Err(e) => {
                    error!(site = %repo.site_uid, error = %e, "site deployment failed");
                    if self.config.on_site_failure == FailurePolicy::Abort {
                        return Err(e);
                    }
                    SiteOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.sites.push(site);
        }

        info!(
            total,
            deployed = report.deployed(),
            failed = report.has_failures(),
            "deployment finished"
        );
        Ok(report)
    }

    /// Remote step for one site. `Ok(None)` when a listener cancelled it,
    /// otherwise whether a commit was made.
    fn deploy_site(
        &self,
        identity: &DeployerIdentity,
        event: &CommitEvent<'_>,
        count: usize,
    ) -> Result<Option<bool>, DeployError> {
        let repo = event.repository;
        // Every listener sees the event, even after one has vetoed.
        let vetoes = self
            .before_commit
            .iter()
            .filter(|listener| !listener(event))
            .count();
        if vetoes > 0 {
            info!(site = %repo.site_uid, "remote deployment cancelled by listener");
            return Ok(None);
        }

        let hook_context = HookContext::new()
            .cwd(&repo.repository_path)
            .env("GITDEPLOY_SITE", &repo.site_uid)
            .env("GITDEPLOY_REPOSITORY", repo.repository_path.display().to_string())
            .env("GITDEPLOY_BRANCH", &repo.branch)
            .env("GITDEPLOY_REMOTE", &repo.remote)
            .redactor(identity.redactor().clone());

        self.run_hooks(identity, &self.config.commands_before, &hook_context, repo, HookPhase::Before)?;

        let message = CommitMessage::new(self.config.commit_message.clone());
        let ctx = MessageContext {
            site_uid: repo.site_uid.clone(),
            site_id: Some(event.site_id),
            branch: repo.branch.clone(),
            remote: repo.remote.clone(),
            count,
            date: Utc::now(),
        };
        let outcome = ReconciliationEngine::new(self.backend.as_ref(), identity)
            .deploy_repository(repo, &message, &ctx)
            .map_err(|e| DeployError::Git {
                site: repo.site_uid.clone(),
                detail: identity.redactor().redact(&e.to_string()),
            })?;

        for listener in &self.after_commit {
            listener(event);
        }

        self.run_hooks(identity, &self.config.commands_after, &hook_context, repo, HookPhase::After)?;
        Ok(Some(outcome.committed()))
    }

    fn run_hooks(
        &self,
        identity: &DeployerIdentity,
        commands: &CommandList,
        context: &HookContext,
        repo: &RepositoryConfig,
        phase: HookPhase,
    ) -> Result<(), DeployError> {
        match run_commands(commands, context) {
            Ok(0) => Ok(()),
            Ok(n) => {
                debug!(site = %repo.site_uid, %phase, commands = n, "commands finished");
                Ok(())
            }
            Err(e) => {
                let detail = identity.redactor().redact(&e.to_string());
                warn!(site = %repo.site_uid, %phase, error = %detail, "commands failed");
                Err(DeployError::Hook {
                    site: repo.site_uid.clone(),
                    phase,
                    detail,
                })
            }
        }
    }
}
