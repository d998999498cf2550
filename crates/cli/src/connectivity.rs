//! Connectivity test command.

use anyhow::{Context, Result};

use gitdeploy_core::config::DeployerConfig;
use gitdeploy_core::git::GitCli;
use gitdeploy_core::tester::ConnectivityTester;

use super::style;

/// Test every repository, printing a checklist or JSON.
pub fn run_test(config: &DeployerConfig, json: bool) -> Result<()> {
    let identity = config.identity();
    let git = GitCli::discover(config.git_command.as_deref(), identity.redactor().clone())
        .context("failed to locate git")?;

    let report = ConnectivityTester::new(config, &git).test_all();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    } else {
        let title = "gitdeploy connectivity test";
        println!();
        println!("{}", style::header(title));
        println!("{}", style::rule(title));
        println!("{}", style::dim(&format!("git: {}", git.executable().display())));
        println!();

        for uid in &report.passed {
            println!("  {}", style::success(&format!("{:<24} OK", uid)));
        }
        for e in &report.errors {
            println!("  {}", style::error(&format!("{:<24} {}", e.attribute, e.message)));
        }
        println!();
    }

    if !report.is_ok() {
        anyhow::bail!("connectivity test failed ({} problem(s))", report.errors.len());
    }
    if !json {
        println!("{}", style::success("All repositories reachable"));
        println!();
    }
    Ok(())
}
