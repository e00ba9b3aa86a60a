use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Download counters for one npm package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpmPackageStats {
    pub package_name: String,
    pub latest_version: Option<String>,
    pub last_day: u64,
    pub last_week: u64,
    pub last_month: u64,
    pub last_year: u64,
    pub fetched_at: DateTime<Utc>,
}
