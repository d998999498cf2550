//! gitdeploy core library.
//!
//! This crate publishes cached page artifacts to per-site git repositories:
//! configuration, repository resolution, credentialed remotes, file
//! synchronization, before/after commands, git reconciliation, the
//! deployment orchestrator and the connectivity tester.

pub mod cache;
pub mod commit_message;
pub mod config;
pub mod deployer;
pub mod engine;
pub mod env;
pub mod errors;
pub mod file_sync;
pub mod git;
pub mod hooks;
pub mod repository;
pub mod site;
pub mod tester;
#[cfg(test)]
mod test_support;
pub mod validation;

// Re-exports for convenience.
pub use cache::{ArtifactCache, DirectoryCache, MemoryCache};
pub use config::{DeployerConfig, FailurePolicy};
pub use deployer::{DeployReport, GitDeployer, Progress, SiteOutcome};
pub use errors::CoreError;
pub use git::{GitBackend, GitCli};
pub use repository::{RepositoryConfig, RepositoryResolver};
pub use site::{SiteId, SiteRegistry, SiteUri, StaticSiteRegistry};
pub use tester::{ConnectivityTester, TestReport};
