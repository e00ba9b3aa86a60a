//! GitHub REST v3 client for repository activity

use std::time::Duration;

use chrono::{DateTime, Utc};
use govboard_core::model::github::summarize_message;
use govboard_core::model::{MinCommit, MinIssue, MinPull};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::http::{build_client, decode_json, Result, SourceError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const PER_PAGE: usize = 100;

const SERVICE: &str = "github";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// Unix seconds at which the window resets.
    pub reset: i64,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateResources,
}

#[derive(Debug, Deserialize)]
struct RateResources {
    core: RateLimit,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CommitBody {
    author: Option<CommitAuthor>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitBody,
    author: Option<User>,
}

#[derive(Debug, Deserialize)]
struct PullItem {
    number: u64,
    title: String,
    state: String,
    user: Option<User>,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct IssueItem {
    number: u64,
    title: String,
    state: String,
    user: Option<User>,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl From<CommitItem> for MinCommit {
    fn from(item: CommitItem) -> Self {
        let (name, date) = match item.commit.author {
            Some(a) => (a.name, a.date),
            None => (None, None),
        };
        MinCommit {
            sha: item.sha,
            author: item.author.map(|u| u.login).or(name),
            message: summarize_message(&item.commit.message),
            date,
        }
    }
}

impl From<PullItem> for MinPull {
    fn from(item: PullItem) -> Self {
        MinPull {
            number: item.number,
            title: item.title,
            state: item.state,
            author: item.user.map(|u| u.login),
            created_at: item.created_at,
            merged_at: item.merged_at,
            closed_at: item.closed_at,
        }
    }
}

impl From<IssueItem> for MinIssue {
    fn from(item: IssueItem) -> Self {
        MinIssue {
            number: item.number,
            title: item.title,
            state: item.state,
            author: item.user.map(|u| u.login),
            created_at: item.created_at,
            closed_at: item.closed_at,
        }
    }
}

/// `owner/name` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(full_name: &str) -> Result<Self> {
        match full_name.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(SourceError::Config(format!(
                "repository must look like owner/name, got {full_name:?}"
            ))),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_api_url(DEFAULT_API_URL, token)
    }

    pub fn with_api_url(api_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        Ok(Self {
            http: build_client(Duration::from_secs(30))?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let request = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", "2022-11-28");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .request(path)
            .query(query)
            .send()
            .await
            .map_err(SourceError::transport(SERVICE))?;
        decode_json(SERVICE, response).await
    }

    pub async fn rate_limit(&self) -> Result<RateLimit> {
        let response: RateLimitResponse = self.get("/rate_limit", &[]).await?;
        Ok(response.resources.core)
    }

    pub async fn commits(&self, repo: &RepoRef, page: usize) -> Result<Vec<MinCommit>> {
        let items: Vec<CommitItem> = self
            .get(&format!("/repos/{repo}/commits"), &page_query(page, None))
            .await?;
        Ok(items.into_iter().map(MinCommit::from).collect())
    }

    pub async fn pulls(&self, repo: &RepoRef, page: usize) -> Result<Vec<MinPull>> {
        let items: Vec<PullItem> = self
            .get(&format!("/repos/{repo}/pulls"), &page_query(page, Some("all")))
            .await?;
        Ok(items.into_iter().map(MinPull::from).collect())
    }

    /// Issues only. The issues endpoint also lists pull requests, those are
    /// dropped here.
    pub async fn issues(&self, repo: &RepoRef, page: usize) -> Result<Vec<MinIssue>> {
        let items: Vec<IssueItem> = self
            .get(&format!("/repos/{repo}/issues"), &page_query(page, Some("all")))
            .await?;
        Ok(items
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(MinIssue::from)
            .collect())
    }

    pub async fn all_commits(&self, repo: &RepoRef) -> Result<Vec<MinCommit>> {
        paginate("commits", |page| self.commits(repo, page)).await
    }

    pub async fn all_pulls(&self, repo: &RepoRef) -> Result<Vec<MinPull>> {
        paginate("pulls", |page| self.pulls(repo, page)).await
    }

    /// Issue pages shrink once pull requests are filtered out, so paging
    /// stops on the raw page size rather than the filtered one.
    pub async fn all_issues(&self, repo: &RepoRef) -> Result<Vec<MinIssue>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let items: Vec<IssueItem> = self
                .get(&format!("/repos/{repo}/issues"), &page_query(page, Some("all")))
                .await?;
            let raw_len = items.len();
            all.extend(
                items
                    .into_iter()
                    .filter(|i| i.pull_request.is_none())
                    .map(MinIssue::from),
            );
            debug!(kind = "issues", page, raw_len, "fetched page");
            if raw_len < PER_PAGE {
                break;
            }
            page += 1;
        }
        info!(kind = "issues", total = all.len(), "pagination complete");
        Ok(all)
    }
}

fn page_query(page: usize, state: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = vec![("per_page", PER_PAGE.to_string()), ("page", page.to_string())];
    if let Some(state) = state {
        query.push(("state", state.to_string()));
    }
    query
}

/// Request pages starting at 1 until one comes back short.
pub async fn paginate<T, F, Fut>(kind: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(usize) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<T>>>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let items = fetch(page).await?;
        let len = items.len();
        all.extend(items);
        debug!(kind, page, len, "fetched page");
        if len < PER_PAGE {
            break;
        }
        page += 1;
    }
    info!(kind, total = all.len(), "pagination complete");
    Ok(all)
}
