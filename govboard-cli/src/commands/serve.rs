//! `govboard serve`: the dashboard API.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use govboard_server::{run_server, AppState, ServerConfig};
use govboard_store::EntityStores;

use super::{connect, koios_client};
use crate::config::GovboardConfig;

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: [server].bind, then 127.0.0.1:3030)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Bearer token required by the ingest and sync routes
    #[arg(long, env = "INGEST_TOKEN", hide_env_values = true)]
    pub ingest_token: Option<String>,
}

pub async fn run_serve(args: ServeArgs, config: &GovboardConfig) -> Result<()> {
    let server_config = ServerConfig {
        bind_addr: args.bind.unwrap_or(config.server.bind),
        cors_permissive: args.cors_permissive || config.server.cors_permissive,
    };

    let pool = connect(args.database_url).await?;
    let stores = EntityStores::new(pool.clone()).stores();
    if args.ingest_token.is_none() {
        tracing::warn!("INGEST_TOKEN not set; ingest and sync routes are open");
    }

    let state = AppState::new(pool, stores, koios_client(config)?)
        .with_settings(config.sync_settings())
        .with_cache_ttl(Duration::from_secs(config.server.cache_ttl_secs))
        .with_ingest_token(args.ingest_token);

    run_server(state, server_config).await.context("Server error")
}
