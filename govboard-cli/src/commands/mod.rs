pub mod github;
pub mod locations;
pub mod npm;
pub mod price;
pub mod serve;
pub mod sync;

pub use github::run_github;
pub use locations::run_locations;
pub use npm::run_npm;
pub use price::run_price;
pub use serve::run_serve;
pub use sync::run_sync;

use anyhow::{Context, Result};
use govboard_sources::KoiosClient;
use govboard_store::{create_pool, migrations};
use sqlx::PgPool;

use crate::config::GovboardConfig;

/// Connect and make sure the schema exists.
pub(crate) async fn connect(database_url: Option<String>) -> Result<PgPool> {
    let database_url = database_url.context(
        "DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or ~/.govboard/.env",
    )?;
    let pool = create_pool(&database_url)
        .await
        .context("Failed to create database pool")?;
    migrations::run(&pool)
        .await
        .context("Failed to run migrations")?;
    Ok(pool)
}

pub(crate) fn koios_client(config: &GovboardConfig) -> Result<KoiosClient> {
    let api_key = std::env::var("KOIOS_API_KEY").ok().filter(|key| !key.is_empty());
    KoiosClient::from_config(&config.koios_config(), api_key).context("Failed to build Koios client")
}
