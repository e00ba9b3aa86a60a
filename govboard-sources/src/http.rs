//! Shared HTTP plumbing for the upstream clients.

use std::time::Duration;

use govboard_core::retry::{is_retryable_status, is_transient_message};
use govboard_core::SyncError;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub const USER_AGENT: &str = concat!("govboard/", env!("CARGO_PKG_VERSION"));

/// Errors raised by the upstream clients.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected {service} payload: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("DNS lookup for {host} failed: {message}")]
    Dns { host: String, message: String },

    #[error("{service} kept rate limiting after {attempts} attempts")]
    RateLimited { service: &'static str, attempts: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || is_transient_message(&source.to_string())
            }
            Self::RateLimited { .. } => true,
            Self::Decode { .. } | Self::Dns { .. } | Self::Config(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { service, source }
    }
}

impl From<SourceError> for SyncError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::RateLimited { service, attempts } => SyncError::RateLimited {
                service: service.to_string(),
                attempts,
            },
            SourceError::Config(reason) => SyncError::config(reason),
            other => {
                let retryable = other.is_retryable();
                let context = match &other {
                    SourceError::Status { service, .. }
                    | SourceError::Transport { service, .. }
                    | SourceError::Decode { service, .. } => (*service).to_string(),
                    SourceError::Dns { host, .. } => host.clone(),
                    _ => "upstream".to_string(),
                };
                SyncError::source(context, other.to_string(), retryable)
            }
        }
    }
}

/// Client with the crate's user agent and a request timeout.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| SourceError::Config(format!("failed to build HTTP client: {e}")))
}

/// Decode a JSON body, turning non-2xx responses into [`SourceError::Status`].
pub async fn decode_json<T: DeserializeOwned>(service: &'static str, response: Response) -> Result<T> {
    let response = check_status(service, response).await?;
    let bytes = response.bytes().await.map_err(SourceError::transport(service))?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode {
        service,
        message: e.to_string(),
    })
}

pub async fn check_status(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(SourceError::Status {
        service,
        status: status.as_u16(),
        body: truncate(&body, 300),
    })
}

fn truncate(body: &str, max: usize) -> String {
    if body.chars().count() <= max {
        body.to_string()
    } else {
        let cut: String = body.chars().take(max).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_classify_by_code() {
        let err = SourceError::Status {
            service: "koios",
            status: 503,
            body: String::new(),
        };
        assert!(err.is_retryable());

        let err = SourceError::Status {
            service: "koios",
            status: 400,
            body: "bad".into(),
        };
        assert!(!err.is_retryable());
        let sync: SyncError = err.into();
        assert!(!sync.is_retryable());
        assert!(sync.to_string().contains("HTTP 400"));
    }

    #[test]
    fn rate_limited_maps_across() {
        let sync: SyncError = SourceError::RateLimited {
            service: "ip-api",
            attempts: 5,
        }
        .into();
        assert!(matches!(sync, SyncError::RateLimited { attempts: 5, .. }));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "e".repeat(1000);
        assert_eq!(truncate(&body, 10), "eeeeeeeeee...");
        assert_eq!(truncate("short", 10), "short");
    }
}
