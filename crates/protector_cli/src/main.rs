//! Protector CLI: enable or remove branch protection across GitHub
//! repositories.
//!
//! Success lines are written to standard output and failure lines to
//! standard error, one line per branch outcome. The process exits 0 once
//! a run completes, regardless of per-branch failures; only
//! configuration errors are fatal.

use std::sync::Arc;

use clap::Parser;
use github_client::{
    create_token_client, BranchProtectionClient, GitHubClient, RepositoryBrowser,
};
use protector_core::{
    repository_source, BranchMatcher, Orchestrator, ProtectionEngine, RunConfig, RunOptions,
};
use secrecy::ExposeSecret;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Protect or free branches over some GitHub repositories
#[derive(Parser)]
#[command(name = "protector")]
#[command(about = "Protect or free branches over some GitHub repositories", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// GitHub API token
    #[arg(long)]
    token: Option<String>,

    /// Do not make any changes, just print out what would have been done
    #[arg(long)]
    dry_run: bool,

    /// Print version and exit
    #[arg(short = 'v', long)]
    version: bool,

    /// Remove branch protection
    #[arg(long)]
    free: bool,

    /// Repositories fullname to protect (ex: jcgay/maven-color)
    #[arg(long = "repos", value_name = "OWNER/NAME")]
    repositories: Vec<String>,

    /// Organizations name to protect
    #[arg(long = "orgs", value_name = "ORG")]
    organizations: Vec<String>,

    /// Branches to include (as regexp)
    #[arg(long = "branches", value_name = "PATTERN")]
    branch_patterns: Vec<String>,
}

impl Cli {
    fn into_options(self) -> RunOptions {
        RunOptions {
            token: self.token.unwrap_or_default(),
            dry_run: self.dry_run,
            unprotect: self.free,
            repositories: self.repositories,
            organizations: self.organizations,
            branch_patterns: self.branch_patterns,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("PROTECTOR_LOG"))
        .init();

    let cli = Cli::parse();

    if cli.version {
        println!("protector v{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let config = match RunConfig::from_options(cli.into_options()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    let octocrab = match create_token_client(config.token().expose_secret()) {
        Ok(octocrab) => octocrab,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };
    let client = Arc::new(GitHubClient::new(octocrab));

    let matcher = BranchMatcher::new(config.branch_patterns().to_vec());
    let engine = Arc::new(ProtectionEngine::new(
        Arc::clone(&client) as Arc<dyn BranchProtectionClient>,
        matcher,
        config.dry_run(),
    ));
    let source = repository_source(&config, client as Arc<dyn RepositoryBrowser>);
    let orchestrator = Orchestrator::new(engine, config.unprotect());

    orchestrator.run(source.as_ref()).await;

    std::process::exit(0);
}
