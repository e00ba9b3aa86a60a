//! ip-api.com geolocation, paced by a shared [`RateLimiter`].

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use govboard_core::{RateLimitConfig, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::{build_client, decode_json, Result, SourceError};

pub const DEFAULT_BASE_URL: &str = "http://ip-api.com";
pub const MAX_ATTEMPTS: u32 = 5;

const SERVICE: &str = "ip-api";
const FIELDS: &str = "status,message,country,countryCode,regionName,city,lat,lon,isp,query";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoInfo {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub isp: Option<String>,
}

impl GeoInfo {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Clone)]
pub struct GeoClient {
    http: Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl GeoClient {
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, config)
    }

    pub fn with_base_url(base_url: impl Into<String>, config: RateLimitConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(Duration::from_secs(15))?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter: Arc::new(RateLimiter::new(config)),
        })
    }

    /// Look up one address. `Ok(None)` when ip-api has no answer for it
    /// (private or reserved ranges).
    pub async fn lookup(&self, ip: IpAddr) -> Result<Option<GeoInfo>> {
        for attempt in 1..=MAX_ATTEMPTS {
            self.limiter.acquire().await;

            let response = self
                .http
                .get(format!("{}/json/{}", self.base_url, ip))
                .query(&[("fields", FIELDS)])
                .send()
                .await
                .map_err(SourceError::transport(SERVICE))?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                self.limiter.on_rate_limited().await;
                warn!(%ip, attempt, "ip-api rate limited");
                continue;
            }

            let info: GeoInfo = decode_json(SERVICE, response).await?;
            self.limiter.on_success().await;
            if !info.is_success() {
                debug!(%ip, message = ?info.message, "no geolocation");
                return Ok(None);
            }
            return Ok(Some(info));
        }

        Err(SourceError::RateLimited {
            service: SERVICE,
            attempts: MAX_ATTEMPTS,
        })
    }
}
