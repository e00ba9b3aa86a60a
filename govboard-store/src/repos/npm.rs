use chrono::{DateTime, Utc};
use govboard_core::model::NpmPackageStats;
use sqlx::{FromRow, PgPool};

use crate::error::DbResult;

#[derive(Debug, FromRow)]
struct NpmRow {
    package_name: String,
    latest_version: Option<String>,
    last_day: i64,
    last_week: i64,
    last_month: i64,
    last_year: i64,
    fetched_at: DateTime<Utc>,
}

impl From<NpmRow> for NpmPackageStats {
    fn from(row: NpmRow) -> Self {
        NpmPackageStats {
            package_name: row.package_name,
            latest_version: row.latest_version,
            last_day: row.last_day.max(0) as u64,
            last_week: row.last_week.max(0) as u64,
            last_month: row.last_month.max(0) as u64,
            last_year: row.last_year.max(0) as u64,
            fetched_at: row.fetched_at,
        }
    }
}

pub struct NpmRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> NpmRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, stats: &NpmPackageStats) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO npm_package_stats
                (package_name, latest_version, last_day, last_week, last_month, last_year, fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (package_name) DO UPDATE SET
                latest_version = EXCLUDED.latest_version,
                last_day = EXCLUDED.last_day,
                last_week = EXCLUDED.last_week,
                last_month = EXCLUDED.last_month,
                last_year = EXCLUDED.last_year,
                fetched_at = EXCLUDED.fetched_at
            "#,
        )
        .bind(&stats.package_name)
        .bind(&stats.latest_version)
        .bind(stats.last_day as i64)
        .bind(stats.last_week as i64)
        .bind(stats.last_month as i64)
        .bind(stats.last_year as i64)
        .bind(stats.fetched_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn list(&self) -> DbResult<Vec<NpmPackageStats>> {
        let rows: Vec<NpmRow> = sqlx::query_as(
            r#"
            SELECT package_name, latest_version, last_day, last_week, last_month, last_year, fetched_at
            FROM npm_package_stats
            ORDER BY last_month DESC, package_name
            "#,
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(NpmPackageStats::from).collect())
    }
}
