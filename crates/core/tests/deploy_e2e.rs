//! End-to-end tests for deploying pages through the real git binary.
//!
//! Each test builds:
//! - a bare "origin" repository (via `git2`)
//! - a working copy whose remote is an `https://` URL
//! - a `url.<path>.insteadOf` rule so the credentialed URL the deployer
//!   writes resolves back to the local bare repository
//!
//! No network I/O. Tests skip gracefully if `git` is not installed.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tempfile::TempDir;

use gitdeploy_core::cache::MemoryCache;
use gitdeploy_core::config::{DeployerConfig, RepositoryEntry};
use gitdeploy_core::deployer::{GitDeployer, SiteOutcome};
use gitdeploy_core::git::client::RemoteLookup;
use gitdeploy_core::git::GitCli;
use gitdeploy_core::site::{SiteUri, StaticSiteRegistry};
use gitdeploy_core::tester::ConnectivityTester;

const TOKEN: &str = "tok-e2e-9f8e7d";
const REMOTE: &str = "https://git.example.invalid/acme/site.git";

// ===========================================================================
// Helpers
// ===========================================================================

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

struct Env {
    _tmp: TempDir,
    origin: PathBuf,
    site: PathBuf,
    config: DeployerConfig,
    cache: Arc<MemoryCache>,
}

impl Env {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let origin = tmp.path().join("origin.git");
        git2::Repository::init_bare(&origin).expect("failed to init bare origin");

        let site = tmp.path().join("site");
        std::fs::create_dir_all(&site).unwrap();
        git(&site, &["init", "--quiet"]);
        git(&site, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        git(&site, &["config", "commit.gpgsign", "false"]);
        git(&site, &["remote", "add", "origin", REMOTE]);

        let mut env = Self {
            _tmp: tmp,
            origin,
            site,
            config: DeployerConfig::default(),
            cache: Arc::new(MemoryCache::new()),
        };
        env.route_remote_to(&env.origin.clone());

        env.config.identity.username = "deploy-bot".into();
        env.config.identity.personal_access_token = TOKEN.into();
        env.config.identity.name = "Deploy Bot".into();
        env.config.identity.email = "bot@example.com".into();
        env.config.commit_message = "Deploy {site}: {count} pages".into();
        env.config.repositories.insert(
            "blog".into(),
            RepositoryEntry {
                repository_path: env.site.display().to_string(),
                ..Default::default()
            },
        );
        env
    }

    /// Make the credentialed remote URL resolve to `target`.
    fn route_remote_to(&mut self, target: &Path) {
        let key = format!("url.{}.insteadOf", target.display());
        let authenticated = format!("https://deploy-bot:{}@git.example.invalid/acme/site.git", TOKEN);
        git(&self.site, &["config", "--replace-all", &key, &authenticated]);
    }

    /// `remote get-url` would apply the `insteadOf` rule, so read the
    /// configured URL directly.
    fn git_cli(&self) -> GitCli {
        GitCli::discover(None, self.config.identity().redactor().clone())
            .expect("git not found")
            .with_remote_lookup(RemoteLookup::ConfigKeys)
    }

    fn deployer(&self) -> GitDeployer {
        GitDeployer::new(
            self.config.clone(),
            self.cache.clone(),
            Arc::new(StaticSiteRegistry::new([("blog", 1)])),
            Box::new(self.git_cli()),
        )
    }

    /// Content of `path` on origin's master branch.
    fn origin_file(&self, path: &str) -> Option<String> {
        let repo = git2::Repository::open_bare(&self.origin).unwrap();
        let commit = repo
            .find_reference("refs/heads/master")
            .ok()?
            .peel_to_commit()
            .ok()?;
        let entry = commit.tree().ok()?.get_path(Path::new(path)).ok()?;
        let blob = repo.find_blob(entry.id()).ok()?;
        Some(String::from_utf8_lossy(blob.content()).into_owned())
    }

    fn origin_commit_count(&self) -> usize {
        let repo = git2::Repository::open_bare(&self.origin).unwrap();
        let mut walk = repo.revwalk().unwrap();
        if walk.push_ref("refs/heads/master").is_err() {
            return 0;
        }
        walk.count()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn test_deploy_publishes_pages_to_origin() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let env = Env::new();
    env.cache.insert(SiteUri::new(1, ""), "<h1>home</h1>");
    env.cache.insert(SiteUri::new(1, "posts/hello"), "<h1>hello</h1>");

    let report = env
        .deployer()
        .deploy(vec![SiteUri::new(1, ""), SiteUri::new(1, "posts/hello")])
        .expect("deploy failed");

    assert_eq!(report.total, 2);
    assert_eq!(report.sites[0].outcome, SiteOutcome::Deployed { committed: true });
    assert_eq!(env.origin_file("index.html").as_deref(), Some("<h1>home</h1>"));
    assert_eq!(
        env.origin_file("posts/hello/index.html").as_deref(),
        Some("<h1>hello</h1>")
    );

    let repo = git2::Repository::open_bare(&env.origin).unwrap();
    let head = repo.find_reference("refs/heads/master").unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message(), Some("Deploy blog: 2 pages\n"));
    assert_eq!(head.author().name(), Some("Deploy Bot"));
    assert_eq!(head.author().email(), Some("bot@example.com"));
}

#[test]
fn test_redeploy_without_changes_pushes_without_commit() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let env = Env::new();
    env.cache.insert(SiteUri::new(1, "about"), "<p>about</p>");
    let uris = vec![SiteUri::new(1, "about")];

    env.deployer().deploy(uris.clone()).expect("first deploy failed");
    assert_eq!(env.origin_commit_count(), 1);

    let report = env.deployer().deploy(uris).expect("second deploy failed");
    assert_eq!(report.sites[0].outcome, SiteOutcome::Deployed { committed: false });
    assert_eq!(env.origin_commit_count(), 1);
}

#[test]
fn test_uncached_page_is_removed_from_origin() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let env = Env::new();
    let uri = SiteUri::new(1, "old-post");
    env.cache.insert(uri.clone(), "<p>old</p>");
    env.deployer().deploy(vec![uri.clone()]).expect("first deploy failed");
    assert!(env.origin_file("old-post/index.html").is_some());

    env.cache.remove(&uri);
    let report = env.deployer().deploy(vec![uri]).expect("second deploy failed");

    assert_eq!(report.sites[0].deleted, 1);
    assert!(env.origin_file("old-post/index.html").is_none());
    assert_eq!(env.origin_commit_count(), 2);
}

#[test]
fn test_failure_never_leaks_token() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let mut env = Env::new();
    let missing = env.site.parent().unwrap().join("does-not-exist.git");
    env.route_remote_to(&missing);
    git(&env.site, &["config", "--unset-all", &format!("url.{}.insteadOf", env.origin.display())]);
    env.cache.insert(SiteUri::new(1, "a"), "a");

    let err = env
        .deployer()
        .deploy(vec![SiteUri::new(1, "a")])
        .expect_err("deploy should fail");

    let text = err.to_string();
    assert_eq!(err.site(), "blog");
    assert!(!text.contains(TOKEN), "token leaked: {}", text);

    let backend = env.git_cli();
    let report = ConnectivityTester::new(&env.config, &backend).test_all();
    assert!(!report.is_ok());
    let messages = report.errors.for_attribute("repositories.blog");
    assert_eq!(messages.len(), 1);
    assert!(!messages[0].contains(TOKEN));
}

#[test]
fn test_connectivity_check_passes_against_origin() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let env = Env::new();
    let backend = env.git_cli();
    let report = ConnectivityTester::new(&env.config, &backend).test_all();
    assert!(report.is_ok(), "unexpected errors: {}", report.errors);
    assert_eq!(report.passed, vec!["blog"]);
    assert_eq!(env.origin_commit_count(), 0);
}
