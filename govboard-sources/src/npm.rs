//! npm registry and download-count API

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use govboard_core::model::NpmPackageStats;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::http::{build_client, decode_json, Result, SourceError};

pub const DOWNLOADS_URL: &str = "https://api.npmjs.org/downloads";
pub const REGISTRY_URL: &str = "https://registry.npmjs.org";

const SERVICE: &str = "npm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    LastDay,
    LastWeek,
    LastMonth,
    LastYear,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastDay => "last-day",
            Self::LastWeek => "last-week",
            Self::LastMonth => "last-month",
            Self::LastYear => "last-year",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PointResponse {
    downloads: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DailyDownloads {
    pub day: NaiveDate,
    pub downloads: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    downloads: Vec<DailyDownloads>,
}

#[derive(Debug, Clone, Deserialize)]
struct RegistryDocument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: DistTags,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DistTags {
    latest: Option<String>,
}

#[derive(Clone)]
pub struct NpmClient {
    http: Client,
    downloads_url: String,
    registry_url: String,
}

impl NpmClient {
    pub fn new() -> Result<Self> {
        Self::with_urls(DOWNLOADS_URL, REGISTRY_URL)
    }

    pub fn with_urls(downloads_url: impl Into<String>, registry_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: build_client(Duration::from_secs(20))?,
            downloads_url: downloads_url.into().trim_end_matches('/').to_string(),
            registry_url: registry_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        debug!(%url, "npm GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(SourceError::transport(SERVICE))?;
        decode_json(SERVICE, response).await
    }

    pub async fn downloads_point(&self, period: Period, package: &str) -> Result<u64> {
        let url = format!("{}/point/{}/{}", self.downloads_url, period.as_str(), package);
        let point: PointResponse = self.get(url).await?;
        Ok(point.downloads)
    }

    pub async fn downloads_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        package: &str,
    ) -> Result<Vec<DailyDownloads>> {
        let url = format!(
            "{}/range/{}:{}/{}",
            self.downloads_url,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            package
        );
        let range: RangeResponse = self.get(url).await?;
        Ok(range.downloads)
    }

    pub async fn latest_version(&self, package: &str) -> Result<Option<String>> {
        let url = format!("{}/{}", self.registry_url, registry_path(package));
        let document: RegistryDocument = self.get(url).await?;
        Ok(document.dist_tags.latest)
    }

    pub async fn collect_package_stats(&self, package: &str) -> Result<NpmPackageStats> {
        let (last_day, last_week, last_month, last_year, latest_version) = futures::try_join!(
            self.downloads_point(Period::LastDay, package),
            self.downloads_point(Period::LastWeek, package),
            self.downloads_point(Period::LastMonth, package),
            self.downloads_point(Period::LastYear, package),
            self.latest_version(package),
        )?;

        Ok(NpmPackageStats {
            package_name: package.to_string(),
            latest_version,
            last_day,
            last_week,
            last_month,
            last_year,
            fetched_at: Utc::now(),
        })
    }
}

/// Scoped names keep the `@` but need their slash escaped on the registry.
pub fn registry_path(package: &str) -> String {
    match package.strip_prefix('@') {
        Some(scoped) => format!("@{}", scoped.replacen('/', "%2F", 1)),
        None => package.to_string(),
    }
}
