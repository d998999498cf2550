//! Git reconciliation for one repository.
//!
//! Steps, stopping at the first failure:
//!
//! 1. open the working copy
//! 2. set the local commit identity
//! 3. rewrite the remote push URL to carry the credentials
//! 4. fetch, then pull when the target branch is checked out and tracked
//! 5. stage everything, then check out the target branch
//! 6. commit, only when something is staged
//! 7. push the target branch

use tracing::{debug, error, info, instrument};

use crate::commit_message::{CommitMessage, MessageContext};
use crate::config::DeployerIdentity;
use crate::errors::GitError;
use crate::git::{build_authenticated_url, GitBackend, WorkingCopy};
use crate::repository::RepositoryConfig;

/// What a successful reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Message of the new commit, `None` when the tree was already clean.
    pub commit_message: Option<String>,
    pub pulled: bool,
}

impl ReconcileOutcome {
    pub fn committed(&self) -> bool {
        self.commit_message.is_some()
    }
}

/// Drives a [`GitBackend`] through a deployment.
pub struct ReconciliationEngine<'a> {
    backend: &'a dyn GitBackend,
    identity: &'a DeployerIdentity,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(backend: &'a dyn GitBackend, identity: &'a DeployerIdentity) -> Self {
        Self { backend, identity }
    }

    /// Publish the working tree of `repo`.
    ///
    /// Errors are logged with the secret replaced by its configured
    /// placeholder and then returned unchanged.
    #[instrument(skip_all, fields(site = %repo.site_uid, branch = %repo.branch))]
    pub fn deploy_repository(
        &self,
        repo: &RepositoryConfig,
        message: &CommitMessage,
        ctx: &MessageContext,
    ) -> Result<ReconcileOutcome, GitError> {
        self.reconcile(repo, message, ctx).map_err(|e| {
            error!(
                site = %repo.site_uid,
                error = %self.identity.redactor().redact(&e.to_string()),
                "git deployment failed"
            );
            e
        })
    }

    /// Open the working copy and fetch from its remote, leaving branches
    /// and the remote repository untouched.
    #[instrument(skip_all, fields(site = %repo.site_uid))]
    pub fn check_connection(&self, repo: &RepositoryConfig) -> Result<(), GitError> {
        let copy = self.open_prepared(repo)?;
        copy.fetch(&repo.remote)
    }

    /// Steps 1 to 3: open, set the identity, credential the remote.
    fn open_prepared(&self, repo: &RepositoryConfig) -> Result<Box<dyn WorkingCopy>, GitError> {
        let copy = self.backend.open(&repo.repository_path)?;

        copy.set_config("user.name", &self.identity.name)?;
        copy.set_config("user.email", &self.identity.email)?;

        let current_url = copy.remote_push_url(&repo.remote)?;
        let url = build_authenticated_url(&current_url, &self.identity.username, self.identity.secret());
        copy.set_remote_url(&repo.remote, &url)?;
        debug!(remote = %repo.remote, "remote url rewritten");
        Ok(copy)
    }

    fn reconcile(
        &self,
        repo: &RepositoryConfig,
        message: &CommitMessage,
        ctx: &MessageContext,
    ) -> Result<ReconcileOutcome, GitError> {
        let copy = self.open_prepared(repo)?;

        copy.fetch(&repo.remote)?;
        let on_target = copy.current_branch()?.as_deref() == Some(repo.branch.as_str());
        let pulled = on_target && copy.has_remote_branch(&repo.remote, &repo.branch)?;
        if pulled {
            copy.pull(&repo.remote, &repo.branch)?;
        }

        copy.add_all()?;
        copy.checkout(&repo.branch)?;

        let commit_message = if copy.has_changes()? {
            let rendered = message.render(ctx);
            copy.commit(&rendered)?;
            Some(rendered)
        } else {
            info!("nothing to commit");
            None
        };

        copy.push(&repo.remote, &repo.branch)?;
        info!(
            path = %copy.path().display(),
            committed = commit_message.is_some(),
            "repository deployed"
        );

        Ok(ReconcileOutcome {
            commit_message,
            pulled,
        })
    }
}
