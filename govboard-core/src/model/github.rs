//! Minified GitHub activity exchanged between the stats collector and the
//! dashboard ingest endpoint.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Commit messages are cut to their first line and this many characters.
pub const MAX_MESSAGE_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinCommit {
    pub sha: String,
    pub author: Option<String>,
    pub message: String,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinPull {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinIssue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// One POST body for the ingest endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestBatch {
    pub repo: String,
    #[serde(default)]
    pub commits: Vec<MinCommit>,
    #[serde(default)]
    pub pulls: Vec<MinPull>,
    #[serde(default)]
    pub issues: Vec<MinIssue>,
}

impl IngestBatch {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.commits.len() + self.pulls.len() + self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split into batches of at most `size` items, one item kind per batch.
    pub fn into_batches(self, size: usize) -> Vec<IngestBatch> {
        let size = size.max(1);
        let repo = self.repo;
        let mut batches = Vec::new();

        for chunk in self.commits.chunks(size) {
            batches.push(IngestBatch {
                repo: repo.clone(),
                commits: chunk.to_vec(),
                ..Default::default()
            });
        }
        for chunk in self.pulls.chunks(size) {
            batches.push(IngestBatch {
                repo: repo.clone(),
                pulls: chunk.to_vec(),
                ..Default::default()
            });
        }
        for chunk in self.issues.chunks(size) {
            batches.push(IngestBatch {
                repo: repo.clone(),
                issues: chunk.to_vec(),
                ..Default::default()
            });
        }
        batches
    }
}

/// IDs the dashboard already holds for a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExistingIds {
    #[serde(default)]
    pub commits: Vec<String>,
    #[serde(default)]
    pub pulls: Vec<u64>,
    #[serde(default)]
    pub issues: Vec<u64>,
}

impl ExistingIds {
    /// Keep only the items the dashboard does not have yet.
    pub fn missing(&self, fetched: IngestBatch) -> IngestBatch {
        let commits: HashSet<&str> = self.commits.iter().map(String::as_str).collect();
        let pulls: HashSet<u64> = self.pulls.iter().copied().collect();
        let issues: HashSet<u64> = self.issues.iter().copied().collect();

        IngestBatch {
            repo: fetched.repo,
            commits: fetched
                .commits
                .into_iter()
                .filter(|c| !commits.contains(c.sha.as_str()))
                .collect(),
            pulls: fetched
                .pulls
                .into_iter()
                .filter(|p| !pulls.contains(&p.number))
                .collect(),
            issues: fetched
                .issues
                .into_iter()
                .filter(|i| !issues.contains(&i.number))
                .collect(),
        }
    }
}

/// Rows written by one ingest call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub commits: u64,
    pub pulls: u64,
    pub issues: u64,
}

/// First line of a commit message, truncated on a char boundary.
pub fn summarize_message(message: &str) -> String {
    let first = message.lines().next().unwrap_or_default().trim();
    first.chars().take(MAX_MESSAGE_CHARS).collect()
}
