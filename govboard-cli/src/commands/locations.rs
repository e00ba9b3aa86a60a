//! `govboard locations`: geolocate stake pool relays.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use govboard_core::RecordStore;
use govboard_sources::{locate_pools, GeoClient, HickoryLookup};
use govboard_store::{EntityStores, LocationRepo};
use tracing::info;

use super::connect;
use crate::config::GovboardConfig;
use crate::ui;

#[derive(Parser, Debug)]
pub struct LocationsArgs {
    /// Also write the locations to this JSON file
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Only the first N pools
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,
}

pub async fn run_locations(args: LocationsArgs, config: &GovboardConfig) -> Result<()> {
    let pool = connect(args.database_url).await?;

    let mut pools = EntityStores::new(pool.clone())
        .spos()
        .load_all()
        .await
        .context("Failed to load pools")?;
    if pools.is_empty() {
        bail!("no pools stored yet; run `govboard sync spos` first");
    }
    if let Some(limit) = args.limit {
        pools.truncate(limit);
    }

    let dns = HickoryLookup::from_system().context("Failed to build DNS resolver")?;
    let geo = GeoClient::new(config.rate_limit_config()).context("Failed to build geo client")?;

    let pb = ui::spinner(format!("Locating relays of {} pools", pools.len()));
    let (locations, stats) = locate_pools(&pools, &dns, &geo).await;
    ui::finish_success(
        pb,
        format!("{} of {} relays located", stats.located, stats.relays),
    );
    info!(
        pools = stats.pools,
        relays = stats.relays,
        unresolved = stats.unresolved,
        located = stats.located,
        "relay geolocation finished"
    );

    if let Some(out) = &args.out {
        let json = serde_json::to_string_pretty(&locations)?;
        std::fs::write(out, json).with_context(|| format!("Failed to write {}", out.display()))?;
        info!(path = %out.display(), "locations written");
    }

    let written = LocationRepo::new(&pool)
        .upsert(&locations)
        .await
        .context("Failed to store locations")?;
    info!(rows = written, "spo_locations updated");
    Ok(())
}
