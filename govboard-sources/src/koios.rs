//! Koios REST client (Cardano chain data)
//!
//! Koios fronts PostgREST: list endpoints take `offset`/`limit`, bulk
//! endpoints take a JSON body of ids, and every response is a JSON array.

use std::time::Duration;

use async_trait::async_trait;
use govboard_core::model::{
    ChainTip, CommitteeInfo, DrepDetails, DrepMetadata, DrepRecord, EpochSummary,
    GovernanceProposal, NetworkTotals, PoolDetails, SpoRecord, VotingSummary,
};
use govboard_core::ChainSource;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::http::{build_client, decode_json, Result, SourceError};

pub const DEFAULT_BASE_URL: &str = "https://api.koios.rest/api/v1";

const SERVICE: &str = "koios";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KoiosConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for KoiosConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Clone)]
pub struct KoiosClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl KoiosClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        Self::with_timeout(base_url, api_key, Duration::from_secs(default_timeout_secs()))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| SourceError::Config(format!("invalid Koios base URL {base_url}: {e}")))?;
        Ok(Self {
            http: build_client(timeout)?,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn from_config(config: &KoiosConfig, api_key: Option<String>) -> Result<Self> {
        Self::with_timeout(&config.base_url, api_key, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("accept", "application/json");
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        debug!(path, "koios GET");
        let response = self
            .authorize(self.http.get(self.url(path)).query(query))
            .send()
            .await
            .map_err(SourceError::transport(SERVICE))?;
        decode_json(SERVICE, response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        debug!(path, "koios POST");
        let response = self
            .authorize(self.http.post(self.url(path)).json(body))
            .send()
            .await
            .map_err(SourceError::transport(SERVICE))?;
        decode_json(SERVICE, response).await
    }

    /// Pass-through used by the server's proxy routes.
    pub async fn get_raw(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        self.get(path, &query).await
    }

    #[instrument(skip(self))]
    pub async fn fetch_tip(&self) -> Result<ChainTip> {
        let rows: Vec<ChainTip> = self.get("tip", &[]).await?;
        rows.into_iter().next().ok_or_else(|| SourceError::Decode {
            service: SERVICE,
            message: "empty /tip response".to_string(),
        })
    }

    pub async fn fetch_totals(&self, epoch_no: Option<u32>) -> Result<Vec<NetworkTotals>> {
        let query: Vec<(&str, String)> = epoch_no
            .map(|e| vec![("_epoch_no", e.to_string())])
            .unwrap_or_default();
        self.get("totals", &query).await
    }

    pub async fn fetch_epoch_info(&self, epoch_no: u32) -> Result<Option<EpochSummary>> {
        let rows: Vec<EpochSummary> = self
            .get("epoch_info", &[("_epoch_no", epoch_no.to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn fetch_proposals(&self) -> Result<Vec<GovernanceProposal>> {
        self.get("proposal_list", &[]).await
    }

    pub async fn fetch_voting_summary(&self, proposal_id: &str) -> Result<Option<VotingSummary>> {
        let rows: Vec<VotingSummary> = self
            .get("proposal_voting_summary", &[("_proposal_id", proposal_id.to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn fetch_pool_page(&self, offset: usize, limit: usize) -> Result<Vec<SpoRecord>> {
        self.get("pool_list", &paging(offset, limit)).await
    }

    pub async fn fetch_pool_info(&self, pool_ids: &[String]) -> Result<Vec<PoolDetails>> {
        if pool_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.post("pool_info", &json!({ "_pool_bech32_ids": pool_ids }))
            .await
    }

    pub async fn fetch_drep_page(&self, offset: usize, limit: usize) -> Result<Vec<DrepRecord>> {
        self.get("drep_list", &paging(offset, limit)).await
    }

    pub async fn fetch_drep_info(&self, drep_ids: &[String]) -> Result<Vec<DrepDetails>> {
        if drep_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.post("drep_info", &json!({ "_drep_ids": drep_ids })).await
    }

    pub async fn fetch_drep_metadata(&self, drep_ids: &[String]) -> Result<Vec<DrepMetadata>> {
        if drep_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.post("drep_metadata", &json!({ "_drep_ids": drep_ids }))
            .await
    }

    pub async fn fetch_committee(&self) -> Result<Vec<CommitteeInfo>> {
        self.get("committee_info", &[]).await
    }
}

fn paging(offset: usize, limit: usize) -> Vec<(&'static str, String)> {
    vec![("offset", offset.to_string()), ("limit", limit.to_string())]
}

#[async_trait]
impl ChainSource for KoiosClient {
    async fn tip(&self) -> govboard_core::Result<ChainTip> {
        Ok(self.fetch_tip().await?)
    }

    async fn totals(&self, epoch_no: Option<u32>) -> govboard_core::Result<Vec<NetworkTotals>> {
        Ok(self.fetch_totals(epoch_no).await?)
    }

    async fn epoch_info(&self, epoch_no: u32) -> govboard_core::Result<Option<EpochSummary>> {
        Ok(self.fetch_epoch_info(epoch_no).await?)
    }

    async fn proposals(&self) -> govboard_core::Result<Vec<GovernanceProposal>> {
        Ok(self.fetch_proposals().await?)
    }

    async fn proposal_voting_summary(
        &self,
        proposal_id: &str,
    ) -> govboard_core::Result<Option<VotingSummary>> {
        Ok(self.fetch_voting_summary(proposal_id).await?)
    }

    async fn pool_list_page(&self, offset: usize, limit: usize) -> govboard_core::Result<Vec<SpoRecord>> {
        Ok(self.fetch_pool_page(offset, limit).await?)
    }

    async fn pool_info(&self, pool_ids: &[String]) -> govboard_core::Result<Vec<PoolDetails>> {
        Ok(self.fetch_pool_info(pool_ids).await?)
    }

    async fn drep_list_page(&self, offset: usize, limit: usize) -> govboard_core::Result<Vec<DrepRecord>> {
        Ok(self.fetch_drep_page(offset, limit).await?)
    }

    async fn drep_info(&self, drep_ids: &[String]) -> govboard_core::Result<Vec<DrepDetails>> {
        Ok(self.fetch_drep_info(drep_ids).await?)
    }

    async fn drep_metadata(&self, drep_ids: &[String]) -> govboard_core::Result<Vec<DrepMetadata>> {
        Ok(self.fetch_drep_metadata(drep_ids).await?)
    }

    async fn committee_info(&self) -> govboard_core::Result<Vec<CommitteeInfo>> {
        Ok(self.fetch_committee().await?)
    }
}
