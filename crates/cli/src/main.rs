//! gitdeploy command-line tool.
//!
//! Provides subcommands for generating and validating the settings file,
//! listing resolved repositories, testing connectivity and deploying cached
//! pages to their git repositories.

mod connectivity;
mod deploy;
mod repos;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gitdeploy_core::config::DeployerConfig;

/// Environment variable naming the settings file.
const CONFIG_ENV: &str = "GITDEPLOY_CONFIG";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// gitdeploy command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "gitdeploy",
    version,
    about = "Publish cached pages to per-site git repositories"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log progress at info level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./gitdeploy.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// List the repository resolved for every configured site.
    Repos,

    /// Check that every repository is a writable working copy whose remote
    /// can be fetched.
    Test {
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Deploy pages from the artifact cache.
    Deploy {
        /// Pages as `<site-id>:<uri>`, e.g. `1:blog/hello`.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        uris: Vec<String>,

        /// Deploy every page in the cache of every configured site.
        #[arg(long)]
        all: bool,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let explicit = cli.config;
    match cli.command {
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => cmd_validate(&resolve_config_path(explicit)?),
        Commands::Repos => repos::run_repos(&load_config(&resolve_config_path(explicit)?)?),
        Commands::Test { json } => {
            connectivity::run_test(&load_config(&resolve_config_path(explicit)?)?, json)
        }
        Commands::Deploy { uris, all } => {
            deploy::run_deploy(load_config(&resolve_config_path(explicit)?)?, &uris, all)
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// `--config`, then `$GITDEPLOY_CONFIG`, then the per-user config directory.
fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => path,
        None => match std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .map(|dir| dir.join("gitdeploy").join("config.toml"))
                .context("no configuration directory on this platform; pass --config")?,
        },
    };
    debug!(path = %path.display(), "using configuration");
    Ok(path)
}

fn load_config(path: &Path) -> Result<DeployerConfig> {
    DeployerConfig::load_from_file(path).context("failed to load configuration file")
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# gitdeploy configuration
# Values may reference environment variables: $VAR or ${VAR}.

# Commit message. Tokens: {site} {site_id} {branch} {remote} {count} {date}
commit_message = "Auto deploy commit"

# Branch and remote used when a repository does not name its own.
default_branch = "master"
default_remote = "origin"

# Explicit git executable. Found on PATH when unset.
# git_command = "/usr/bin/git"

# What a failing site does to the rest of the run: "abort" or "continue".
on_site_failure = "abort"

# Commands run in the repository directory around each site's deployment.
# GITDEPLOY_SITE, GITDEPLOY_REPOSITORY, GITDEPLOY_BRANCH and GITDEPLOY_REMOTE
# are exported to them.
commands_before = ""
commands_after = ""

[identity]
username = "deploy-bot"
personal_access_token = "$GITDEPLOY_TOKEN"
name = "Deploy Bot"
email = "deploy-bot@example.com"

# Site UID -> numeric site id.
[sites]
blog = 1

# One working copy per site UID.
[repositories.blog]
repository_path = "/srv/deploy/blog"
# branch = "gh-pages"
# remote = "origin"

[cache]
directory = "/var/cache/gitdeploy"
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file with your sites and repositories");
    println!("  2. Set the referenced environment variables (GITDEPLOY_TOKEN, etc.)");
    println!(
        "  3. Validate with: gitdeploy validate --config {}",
        output.display()
    );
    println!(
        "  4. Check connectivity: gitdeploy test --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config = load_config(config_path)?;
    println!("  [OK] TOML structure is valid");

    let errors = config.validate();
    if errors.is_empty() {
        println!("  [OK] All required fields are valid");
    } else {
        for e in &errors {
            println!("  [FAIL] {}: {}", e.attribute, e.message);
        }
        anyhow::bail!("configuration validation failed ({} problem(s))", errors.len());
    }

    let identity = config.identity();
    println!();
    println!("Configuration summary:");
    println!("  Username      : {}", identity.username);
    println!(
        "  Access token  : {}",
        if identity.secret().is_empty() {
            "NOT SET"
        } else {
            "set"
        }
    );
    println!("  Author        : {} <{}>", identity.name, identity.email);
    println!("  Default branch: {}", config.default_branch);
    println!("  Default remote: {}", config.default_remote);
    println!("  Repositories  : {}", config.repositories.len());
    println!("  Sites         : {}", config.sites.len());
    println!(
        "  Cache         : {}",
        config
            .cache
            .directory
            .as_deref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "not set".to_string())
    );
    println!();
    println!("Configuration is valid.");

    Ok(())
}
