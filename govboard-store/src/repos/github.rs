//! GitHub activity ingested by the stats collector.

use govboard_core::model::{ExistingIds, IngestBatch, IngestReport, MinCommit, MinIssue, MinPull};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::error::DbResult;

/// Rows per multi-row insert; pull requests bind 8 parameters each.
const INSERT_CHUNK: usize = 1000;

pub struct GithubRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> GithubRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Commit SHAs and PR/issue numbers already stored for `repo`.
    pub async fn existing_ids(&self, repo: &str) -> DbResult<ExistingIds> {
        let commits: Vec<String> =
            sqlx::query_scalar("SELECT sha FROM github_commits WHERE repo = $1")
                .bind(repo)
                .fetch_all(self.pool)
                .await?;
        let pulls: Vec<i64> =
            sqlx::query_scalar("SELECT number FROM github_pull_requests WHERE repo = $1")
                .bind(repo)
                .fetch_all(self.pool)
                .await?;
        let issues: Vec<i64> =
            sqlx::query_scalar("SELECT number FROM github_issues WHERE repo = $1")
                .bind(repo)
                .fetch_all(self.pool)
                .await?;

        Ok(ExistingIds {
            commits,
            pulls: pulls.into_iter().map(|n| n as u64).collect(),
            issues: issues.into_iter().map(|n| n as u64).collect(),
        })
    }

    /// Insert a batch. Commits are immutable and skipped on conflict; pulls
    /// and issues take the newer state.
    pub async fn ingest(&self, batch: &IngestBatch) -> DbResult<IngestReport> {
        let mut report = IngestReport::default();
        let mut tx = self.pool.begin().await?;

        for chunk in batch.commits.chunks(INSERT_CHUNK) {
            let result = commits_insert(&batch.repo, chunk).build().execute(&mut *tx).await?;
            report.commits += result.rows_affected();
        }
        for chunk in batch.pulls.chunks(INSERT_CHUNK) {
            let result = pulls_upsert(&batch.repo, chunk).build().execute(&mut *tx).await?;
            report.pulls += result.rows_affected();
        }
        for chunk in batch.issues.chunks(INSERT_CHUNK) {
            let result = issues_upsert(&batch.repo, chunk).build().execute(&mut *tx).await?;
            report.issues += result.rows_affected();
        }

        tx.commit().await?;
        info!(
            repo = %batch.repo,
            commits = report.commits,
            pulls = report.pulls,
            issues = report.issues,
            "ingested github batch"
        );
        Ok(report)
    }
}

fn commits_insert<'q>(repo: &'q str, commits: &'q [MinCommit]) -> QueryBuilder<'q, Postgres> {
    let mut builder =
        QueryBuilder::new("INSERT INTO github_commits (repo, sha, author, message, committed_at) ");
    builder.push_values(commits, |mut row, c| {
        row.push_bind(repo)
            .push_bind(&c.sha)
            .push_bind(&c.author)
            .push_bind(&c.message)
            .push_bind(c.date);
    });
    builder.push(" ON CONFLICT (repo, sha) DO NOTHING");
    builder
}

fn pulls_upsert<'q>(repo: &'q str, pulls: &'q [MinPull]) -> QueryBuilder<'q, Postgres> {
    let mut builder = QueryBuilder::new(
        "INSERT INTO github_pull_requests (repo, number, title, state, author, created_at, merged_at, closed_at) ",
    );
    builder.push_values(pulls, |mut row, p| {
        row.push_bind(repo)
            .push_bind(p.number as i64)
            .push_bind(&p.title)
            .push_bind(&p.state)
            .push_bind(&p.author)
            .push_bind(p.created_at)
            .push_bind(p.merged_at)
            .push_bind(p.closed_at);
    });
    builder.push(
        " ON CONFLICT (repo, number) DO UPDATE SET title = EXCLUDED.title, state = EXCLUDED.state, \
         merged_at = EXCLUDED.merged_at, closed_at = EXCLUDED.closed_at",
    );
    builder
}

fn issues_upsert<'q>(repo: &'q str, issues: &'q [MinIssue]) -> QueryBuilder<'q, Postgres> {
    let mut builder = QueryBuilder::new(
        "INSERT INTO github_issues (repo, number, title, state, author, created_at, closed_at) ",
    );
    builder.push_values(issues, |mut row, i| {
        row.push_bind(repo)
            .push_bind(i.number as i64)
            .push_bind(&i.title)
            .push_bind(&i.state)
            .push_bind(&i.author)
            .push_bind(i.created_at)
            .push_bind(i.closed_at);
    });
    builder.push(
        " ON CONFLICT (repo, number) DO UPDATE SET title = EXCLUDED.title, state = EXCLUDED.state, \
         closed_at = EXCLUDED.closed_at",
    );
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn commits_are_insert_only() {
        let commits = vec![MinCommit {
            sha: "abc".into(),
            author: Some("alice".into()),
            message: "fix".into(),
            date: Some(Utc::now()),
        }];
        let builder = commits_insert("org/repo", &commits);
        let sql = builder.sql();
        assert!(sql.contains("($1, $2, $3, $4, $5)"));
        assert!(sql.ends_with("ON CONFLICT (repo, sha) DO NOTHING"));
    }

    #[test]
    fn pulls_update_state_on_conflict() {
        let pulls = vec![MinPull {
            number: 7,
            title: "feat".into(),
            state: "closed".into(),
            author: None,
            created_at: Utc::now(),
            merged_at: Some(Utc::now()),
            closed_at: Some(Utc::now()),
        }];
        let builder = pulls_upsert("org/repo", &pulls);
        assert!(builder.sql().contains("state = EXCLUDED.state"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn ingest_is_idempotent_for_commits() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::pool::create_pool(&url).await.expect("pool");
        crate::migrations::run(&pool).await.expect("migrations");
        let repo = GithubRepo::new(&pool);

        let mut batch = IngestBatch::new(format!("test/{}", uuid::Uuid::new_v4()));
        batch.commits.push(MinCommit {
            sha: "deadbeef".into(),
            author: None,
            message: "init".into(),
            date: None,
        });

        assert_eq!(repo.ingest(&batch).await.unwrap().commits, 1);
        assert_eq!(repo.ingest(&batch).await.unwrap().commits, 0);
        let ids = repo.existing_ids(&batch.repo).await.unwrap();
        assert_eq!(ids.commits, vec!["deadbeef".to_string()]);
    }
}
