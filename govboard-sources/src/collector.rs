//! GitHub stats collector: pulls repository activity and pushes whatever the
//! dashboard is missing to its ingest endpoint.

use std::time::Duration;

use govboard_core::model::{ExistingIds, IngestBatch, IngestReport};
use govboard_core::retry::{retry, RetryPolicy};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::github::{GithubClient, RepoRef};
use crate::http::{build_client, check_status, decode_json, Result, SourceError};

const SERVICE: &str = "dashboard";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Dashboard endpoint returning already-ingested ids.
    pub existing_ids_url: String,
    /// Dashboard endpoint accepting [`IngestBatch`] bodies.
    pub ingest_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_min_rate_limit_remaining")]
    pub min_rate_limit_remaining: u64,
}

fn default_batch_size() -> usize {
    200
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_batch_delay_ms() -> u64 {
    500
}

fn default_min_rate_limit_remaining() -> u64 {
    100
}

impl CollectorConfig {
    pub fn new(existing_ids_url: impl Into<String>, ingest_url: impl Into<String>) -> Self {
        Self {
            existing_ids_url: existing_ids_url.into(),
            ingest_url: ingest_url.into(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
            min_rate_limit_remaining: default_min_rate_limit_remaining(),
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectorReport {
    pub repo: String,
    pub fetched_commits: usize,
    pub fetched_pulls: usize,
    pub fetched_issues: usize,
    pub new_items: usize,
    pub batches: usize,
    pub ingested: IngestReport,
}

pub struct StatsCollector {
    github: GithubClient,
    http: Client,
    config: CollectorConfig,
    ingest_token: Option<String>,
}

impl StatsCollector {
    pub fn new(github: GithubClient, config: CollectorConfig, ingest_token: Option<String>) -> Result<Self> {
        Ok(Self {
            github,
            http: build_client(Duration::from_secs(60))?,
            config,
            ingest_token: ingest_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Collect one repository end to end.
    pub async fn run(&self, repo: &str) -> Result<CollectorReport> {
        let repo_ref = RepoRef::parse(repo)?;

        let rate = self.github.rate_limit().await?;
        info!(repo, remaining = rate.remaining, limit = rate.limit, "GitHub rate limit");
        if rate.remaining < self.config.min_rate_limit_remaining {
            return Err(SourceError::RateLimited {
                service: "github",
                attempts: 0,
            });
        }

        let existing = self.existing_ids(repo).await?;

        let fetched = IngestBatch {
            repo: repo.to_string(),
            commits: self.github.all_commits(&repo_ref).await?,
            pulls: self.github.all_pulls(&repo_ref).await?,
            issues: self.github.all_issues(&repo_ref).await?,
        };
        let mut report = CollectorReport {
            repo: repo.to_string(),
            fetched_commits: fetched.commits.len(),
            fetched_pulls: fetched.pulls.len(),
            fetched_issues: fetched.issues.len(),
            ..Default::default()
        };

        let missing = existing.missing(fetched);
        report.new_items = missing.len();
        if missing.is_empty() {
            info!(repo, "dashboard already up to date");
            return Ok(report);
        }

        let batches = missing.into_batches(self.config.batch_size);
        let total = batches.len();
        for (i, batch) in batches.iter().enumerate() {
            let ingested = self.post_batch(batch).await?;
            report.ingested.commits += ingested.commits;
            report.ingested.pulls += ingested.pulls;
            report.ingested.issues += ingested.issues;
            report.batches += 1;
            info!(repo, batch = i + 1, total, items = batch.len(), "batch ingested");

            if i + 1 < total && self.config.batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }
        Ok(report)
    }

    async fn existing_ids(&self, repo: &str) -> Result<ExistingIds> {
        let response = self
            .http
            .get(&self.config.existing_ids_url)
            .query(&[("repo", repo)])
            .send()
            .await
            .map_err(SourceError::transport(SERVICE))?;
        decode_json(SERVICE, response).await
    }

    async fn post_batch(&self, batch: &IngestBatch) -> Result<IngestReport> {
        retry(
            &self.config.retry_policy(),
            || async {
                let mut request = self.http.post(&self.config.ingest_url).json(batch);
                if let Some(token) = &self.ingest_token {
                    request = request.bearer_auth(token);
                }
                let response = request.send().await.map_err(SourceError::transport(SERVICE))?;
                let response = check_status(SERVICE, response).await?;
                response.json::<IngestReport>().await.map_err(|e| SourceError::Decode {
                    service: SERVICE,
                    message: e.to_string(),
                })
            },
            |err: &SourceError| {
                let retryable = err.is_retryable();
                if !retryable {
                    warn!(error = %err, "ingest failed permanently");
                }
                retryable
            },
        )
        .await
    }
}
