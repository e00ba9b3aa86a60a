//! `govboard github collect`: push missing repository activity to the
//! dashboard's ingest endpoint.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use govboard_sources::{GithubClient, StatsCollector};
use tracing::error;

use crate::config::GovboardConfig;
use crate::ui;

#[derive(Parser, Debug)]
pub struct GithubArgs {
    #[command(subcommand)]
    pub command: GithubCommand,
}

#[derive(Subcommand, Debug)]
pub enum GithubCommand {
    /// Collect commits, pull requests and issues
    Collect(CollectArgs),
}

#[derive(Parser, Debug)]
pub struct CollectArgs {
    /// owner/name, or a bare name when [github].owner is set (repeatable;
    /// defaults to [github].repos)
    #[arg(long = "repo", short = 'r')]
    pub repos: Vec<String>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Bearer token for the ingest endpoint
    #[arg(long, env = "INGEST_TOKEN", hide_env_values = true)]
    pub ingest_token: Option<String>,
}

pub async fn run_github(args: GithubArgs, config: &GovboardConfig) -> Result<()> {
    match args.command {
        GithubCommand::Collect(args) => collect(args, config).await,
    }
}

async fn collect(args: CollectArgs, config: &GovboardConfig) -> Result<()> {
    let repos = config.github_repos(&args.repos)?;
    let github = GithubClient::new(args.github_token).context("Failed to build GitHub client")?;
    let collector = StatsCollector::new(github, config.collector_config(), args.ingest_token)
        .context("Failed to build collector")?;

    let mut reports = Vec::new();
    let mut failed = Vec::new();
    for repo in &repos {
        let result = ui::with_spinner_async(
            format!("Collecting {repo}"),
            |report: &govboard_sources::CollectorReport| {
                format!("{repo}: {} new items in {} batches", report.new_items, report.batches)
            },
            collector.run(repo),
        )
        .await;

        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(repo = %repo, error = %e, "collection failed");
                failed.push(repo.as_str());
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);

    if !failed.is_empty() {
        bail!("collection failed for {}", failed.join(", "));
    }
    Ok(())
}
