//! `govboard sync`: run the Koios reconcilers against Postgres.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use govboard_core::{run_entity, ChainSource, Entity, EntityReport, Stores};
use govboard_store::EntityStores;
use serde_json::json;
use tracing::{error, info};

use super::{connect, koios_client};
use crate::config::GovboardConfig;
use crate::ui;

/// Entities selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets(pub Vec<Entity>);

impl FromStr for Targets {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self(Entity::ALL.to_vec()));
        }
        Entity::from_str(s)
            .map(|entity| Self(vec![entity]))
            .map_err(|e| format!("{e}; expected one of {} or all", entity_names()))
    }
}

fn entity_names() -> String {
    Entity::ALL.iter().map(Entity::as_str).collect::<Vec<_>>().join(", ")
}

#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// network-totals, proposals, spos, dreps, committee, chain-tip, or all
    #[arg(value_parser = clap::value_parser!(Targets))]
    pub target: Targets,

    /// Reconcile against an empty in-memory store and print the rows
    /// instead of writing to Postgres
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,
}

pub async fn run_sync(args: SyncArgs, config: &GovboardConfig) -> Result<()> {
    let settings = config.sync_settings();
    let source: Arc<dyn ChainSource> = Arc::new(koios_client(config)?);

    let stores = if args.dry_run {
        info!("dry run: nothing will be written");
        Stores::memory()
    } else {
        EntityStores::new(connect(args.database_url).await?).stores()
    };

    let mut reports = Vec::new();
    let mut failed = Vec::new();
    for entity in args.target.0 {
        let pb = ui::spinner(format!("Syncing {entity}"));
        match run_entity(entity, &source, &stores, &settings).await {
            Ok(report) => {
                let outcome = &report.outcome;
                ui::finish_success(
                    pb,
                    format!(
                        "{entity}: fetched {}, upserted {}",
                        outcome.fetched, outcome.upserted
                    ),
                );
                reports.push(report);
            }
            Err(e) => {
                ui::finish_error(pb, format!("{entity}: {e}"));
                error!(entity = %entity, error = %e, "sync failed");
                failed.push(entity);
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&summary(&reports, args.dry_run))?);

    if !failed.is_empty() {
        let names = failed.iter().map(Entity::as_str).collect::<Vec<_>>().join(", ");
        bail!("sync failed for {names}");
    }
    Ok(())
}

/// Outcome counters per entity. Dry runs include the rows.
fn summary(reports: &[EntityReport], with_rows: bool) -> serde_json::Value {
    let entries = reports
        .iter()
        .map(|report| {
            let mut entry = json!({
                "entity": report.entity,
                "outcome": report.outcome,
            });
            if with_rows {
                entry["rows"] = report.rows.clone();
            }
            entry
        })
        .collect::<Vec<_>>();
    serde_json::Value::Array(entries)
}
