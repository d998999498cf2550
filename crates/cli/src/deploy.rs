//! Deploy command with progress visualization.

use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use gitdeploy_core::cache::DirectoryCache;
use gitdeploy_core::config::DeployerConfig;
use gitdeploy_core::deployer::{DeployReport, GitDeployer, SiteOutcome};
use gitdeploy_core::site::{SiteUri, StaticSiteRegistry};

use super::style;

/// Deploy `uris` (or every cached page with `all`) from the on-disk cache.
pub fn run_deploy(config: DeployerConfig, uris: &[String], all: bool) -> Result<()> {
    let errors = config.validate();
    if !errors.is_empty() {
        anyhow::bail!("configuration is invalid:\n{}", errors);
    }

    let cache_dir = config
        .cache
        .directory
        .clone()
        .context("no artifact cache configured; set [cache] directory")?;
    let registry = StaticSiteRegistry::new(config.sites.clone());
    let cache = DirectoryCache::new(cache_dir, registry.clone());

    let requested: Vec<SiteUri> = if all {
        config.sites.keys().flat_map(|uid| cache.list(uid)).collect()
    } else {
        uris.iter()
            .map(|raw| raw.parse::<SiteUri>().map_err(anyhow::Error::msg))
            .collect::<Result<_>>()?
    };

    if requested.is_empty() {
        println!(
            "{}",
            style::warn(&format!("Nothing to deploy from {}", cache.root().display()))
        );
        return Ok(());
    }

    let deployer = GitDeployer::with_git_cli(config, Arc::new(cache), Arc::new(registry))
        .context("failed to locate git")?;

    println!();
    println!("Deploying {} page(s)...", requested.len());
    println!();

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.blue} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = deployer.deploy_with_progress(requested, &mut |progress| {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.count as u64);
        bar.set_message(progress.label.clone());
    });
    bar.finish_and_clear();

    let report = result.context("deployment failed")?;
    print_report(&report);

    if report.has_failures() {
        anyhow::bail!("one or more sites failed to deploy");
    }
    Ok(())
}

fn print_report(report: &DeployReport) {
    for site in &report.sites {
        let files = format!(
            "{} written, {} deleted, {} failed",
            site.written, site.deleted, site.failed_files
        );
        let line = match &site.outcome {
            SiteOutcome::Deployed { committed: true } => {
                style::success(&format!("{:<20} deployed ({})", site.site_uid, files))
            }
            SiteOutcome::Deployed { committed: false } => style::success(&format!(
                "{:<20} up to date, pushed ({})",
                site.site_uid, files
            )),
            SiteOutcome::Cancelled => {
                style::warn(&format!("{:<20} cancelled ({})", site.site_uid, files))
            }
            SiteOutcome::Failed { error } => {
                style::error(&format!("{:<20} {}", site.site_uid, error))
            }
        };
        println!("  {}", line);
    }

    if !report.skipped.is_empty() {
        let ids: Vec<String> = report.skipped.iter().map(|id| id.to_string()).collect();
        println!(
            "  {}",
            style::dim(&format!("skipped site(s) without a repository: {}", ids.join(", ")))
        );
    }
    println!();
    println!(
        "{} page(s) processed across {} site(s).",
        report.total,
        report.sites.len()
    );
}
