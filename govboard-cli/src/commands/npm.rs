//! `govboard npm`: download counts and latest versions per package.

use anyhow::{bail, Context, Result};
use clap::Parser;
use govboard_sources::NpmClient;
use govboard_store::NpmRepo;
use tracing::{error, info};

use super::connect;
use crate::config::GovboardConfig;
use crate::ui;

#[derive(Parser, Debug)]
pub struct NpmArgs {
    /// Package name (repeatable; defaults to [npm].packages)
    #[arg(long = "package", short = 'p')]
    pub packages: Vec<String>,

    /// Print the stats without writing them
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,
}

pub async fn run_npm(args: NpmArgs, config: &GovboardConfig) -> Result<()> {
    let packages = config.npm_packages(&args.packages)?;
    let client = NpmClient::new().context("Failed to build npm client")?;
    let pool = if args.dry_run {
        None
    } else {
        Some(connect(args.database_url).await?)
    };

    let mut collected = Vec::new();
    let mut failed = Vec::new();
    for package in &packages {
        let pb = ui::spinner(format!("Fetching {package}"));
        let stats = match client.collect_package_stats(package).await {
            Ok(stats) => stats,
            Err(e) => {
                ui::finish_error(pb, format!("{package}: {e}"));
                error!(package = %package, error = %e, "npm fetch failed");
                failed.push(package.as_str());
                continue;
            }
        };

        if let Some(pool) = &pool {
            NpmRepo::new(pool)
                .upsert(&stats)
                .await
                .with_context(|| format!("Failed to store stats for {package}"))?;
        }
        ui::finish_success(pb, format!("{package}: {} downloads last month", stats.last_month));
        info!(package = %package, last_month = stats.last_month, "npm stats collected");
        collected.push(stats);
    }

    println!("{}", serde_json::to_string_pretty(&collected)?);

    if !failed.is_empty() {
        bail!("npm stats failed for {}", failed.join(", "));
    }
    Ok(())
}
