//! Resolved repository listing.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use gitdeploy_core::config::DeployerConfig;
use gitdeploy_core::repository::RepositoryResolver;

use super::style;

/// Print every configured site with the repository it resolves to.
pub fn run_repos(config: &DeployerConfig) -> Result<()> {
    let resolved = RepositoryResolver::new(config).all();

    if resolved.is_empty() {
        println!();
        println!("{}", style::warn("No repositories configured"));
        println!();
        return Ok(());
    }

    println!();
    println!("{}", style::header(&format!("Repositories ({})", resolved.len())));
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Site", "ID", "Path", "Branch", "Remote"]);

    for (uid, repo) in &resolved {
        let site_id = config
            .sites
            .get(*uid)
            .map(|id| id.to_string())
            .unwrap_or_else(|| "—".to_string());

        match repo {
            Some(repo) => table.add_row(vec![
                Cell::new(uid),
                Cell::new(&site_id),
                Cell::new(repo.repository_path.display()),
                Cell::new(&repo.branch),
                Cell::new(&repo.remote),
            ]),
            None => table.add_row(vec![
                Cell::new(uid),
                Cell::new(&site_id),
                Cell::new("unresolved").fg(Color::Yellow),
                Cell::new("—"),
                Cell::new("—"),
            ]),
        };
    }

    println!("{}", table);
    println!();

    let unresolved = resolved.iter().filter(|(_, r)| r.is_none()).count();
    if unresolved > 0 {
        println!(
            "{}",
            style::dim(&format!(
                "{} site(s) have no usable repository path and are skipped on deploy.",
                unresolved
            ))
        );
        println!();
    }

    Ok(())
}
