//! Connectivity test for every configured repository.
//!
//! Checks never stop at the first problem: each repository is checked in
//! turn and every problem is recorded against `repositories.<site-uid>`.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::DeployerConfig;
use crate::engine::ReconciliationEngine;
use crate::git::GitBackend;
use crate::repository::RepositoryResolver;
use crate::validation::ValidationErrors;

/// Outcome of [`ConnectivityTester::test_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestReport {
    /// Repositories that passed every check.
    pub passed: Vec<String>,
    pub errors: ValidationErrors,
}

impl TestReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates settings and reaches every repository's remote.
pub struct ConnectivityTester<'a> {
    config: &'a DeployerConfig,
    backend: &'a dyn GitBackend,
}

impl<'a> ConnectivityTester<'a> {
    pub fn new(config: &'a DeployerConfig, backend: &'a dyn GitBackend) -> Self {
        Self { config, backend }
    }

    /// Run every check. The remote repositories are only fetched from.
    pub fn test_all(&self) -> TestReport {
        let identity = self.config.identity();
        let redactor = identity.redactor();
        let mut report = TestReport::default();

        for problem in &self.config.validate() {
            report
                .errors
                .add(problem.attribute.clone(), redactor.redact(&problem.message));
        }

        let engine = ReconciliationEngine::new(self.backend, &identity);
        for (uid, resolved) in RepositoryResolver::new(self.config).all() {
            let attribute = format!("repositories.{}", uid);
            let raw_path = self
                .config
                .repositories
                .get(uid)
                .map(|e| e.repository_path.trim())
                .unwrap_or_default();

            let Some(repo) = resolved else {
                if raw_path.is_empty() {
                    debug!(site = %uid, "no repository path, nothing to test");
                } else {
                    report.errors.add(
                        attribute,
                        format!("Repository path `{}` does not resolve to a value.", raw_path),
                    );
                }
                continue;
            };

            let path = repo.repository_path.display().to_string();
            if !repo.repository_path.is_dir() {
                report
                    .errors
                    .add(attribute, format!("Repository path `{}` is not a directory.", path));
                continue;
            }
            if !is_writable(&repo.repository_path) {
                report
                    .errors
                    .add(attribute, format!("Repository path `{}` is not writeable.", path));
                continue;
            }

            match engine.check_connection(&repo) {
                Ok(()) => {
                    debug!(site = %uid, "repository reachable");
                    report.passed.push(uid.to_string());
                }
                Err(e) => report.errors.add(
                    attribute,
                    redactor.redact(&format!("Error connecting to repository: {}", e)),
                ),
            }
        }

        info!(
            passed = report.passed.len(),
            errors = report.errors.len(),
            "connectivity test finished"
        );
        report
    }
}

/// Whether a file can be created in `dir`.
fn is_writable(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".gitdeploy-probe")
        .tempfile_in(dir)
        .is_ok()
}
