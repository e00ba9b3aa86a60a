//! Schema setup, run on startup.
//!
//! Every statement is idempotent so this can run before each sync job.

use sqlx::PgPool;
use tracing::debug;

use crate::error::DbResult;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS chain_tip (
        id SMALLINT PRIMARY KEY,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS network_totals (
        epoch_no INTEGER PRIMARY KEY,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS governance_proposals (
        proposal_id TEXT PRIMARY KEY,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS spo_data (
        pool_id_bech32 TEXT PRIMARY KEY,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS drep_data (
        drep_id TEXT PRIMARY KEY,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS committee_data (
        cc_cold_id TEXT PRIMARY KEY,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS spo_locations (
        pool_id_bech32 TEXT NOT NULL,
        ip TEXT NOT NULL,
        ticker TEXT,
        relay TEXT NOT NULL,
        country TEXT,
        country_code TEXT,
        region TEXT,
        city TEXT,
        lat DOUBLE PRECISION,
        lon DOUBLE PRECISION,
        isp TEXT,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (pool_id_bech32, ip)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS npm_package_stats (
        package_name TEXT PRIMARY KEY,
        latest_version TEXT,
        last_day BIGINT NOT NULL DEFAULT 0,
        last_week BIGINT NOT NULL DEFAULT 0,
        last_month BIGINT NOT NULL DEFAULT 0,
        last_year BIGINT NOT NULL DEFAULT 0,
        fetched_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS github_commits (
        repo TEXT NOT NULL,
        sha TEXT NOT NULL,
        author TEXT,
        message TEXT NOT NULL,
        committed_at TIMESTAMPTZ,
        PRIMARY KEY (repo, sha)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS github_pull_requests (
        repo TEXT NOT NULL,
        number BIGINT NOT NULL,
        title TEXT NOT NULL,
        state TEXT NOT NULL,
        author TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        merged_at TIMESTAMPTZ,
        closed_at TIMESTAMPTZ,
        PRIMARY KEY (repo, number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS github_issues (
        repo TEXT NOT NULL,
        number BIGINT NOT NULL,
        title TEXT NOT NULL,
        state TEXT NOT NULL,
        author TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        closed_at TIMESTAMPTZ,
        PRIMARY KEY (repo, number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cardano_projects (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        url TEXT,
        logo_url TEXT,
        category TEXT,
        created_by TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cardano_project_roles (
        project_id UUID NOT NULL REFERENCES cardano_projects(id) ON DELETE CASCADE,
        principal TEXT NOT NULL,
        principal_kind TEXT NOT NULL CHECK (principal_kind IN ('wallet', 'nft')),
        role TEXT NOT NULL CHECK (role IN ('admin', 'editor')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (project_id, principal, principal_kind)
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_project_roles_principal ON cardano_project_roles(principal)",
    "CREATE INDEX IF NOT EXISTS idx_github_commits_committed_at ON github_commits(repo, committed_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_spo_locations_country ON spo_locations(country_code)",
];

/// Create all tables and indexes that do not exist yet.
pub async fn run(pool: &PgPool) -> DbResult<()> {
    for statement in SCHEMA.iter().chain(INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!(tables = SCHEMA.len(), indexes = INDEXES.len(), "schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entity_table_has_jsonb_payload() {
        for table in [
            "chain_tip",
            "network_totals",
            "governance_proposals",
            "spo_data",
            "drep_data",
            "committee_data",
        ] {
            let ddl = SCHEMA
                .iter()
                .find(|s| s.contains(&format!("EXISTS {table} (")))
                .unwrap_or_else(|| panic!("missing table {table}"));
            assert!(ddl.contains("data JSONB NOT NULL"), "{table}");
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrations_are_idempotent() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::pool::create_pool(&url).await.expect("pool");
        run(&pool).await.expect("first run");
        run(&pool).await.expect("second run");
    }
}
