//! Turning pool relay entries into a single routable IP address.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use async_trait::async_trait;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioResolver;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::http::{Result, SourceError};

/// CNAME chains longer than this are abandoned.
pub const MAX_CNAME_DEPTH: usize = 5;

static IPV4_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b")
        .expect("IPv4 pattern is valid")
});

/// One entry of a pool's `relays` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
    #[serde(default)]
    pub dns: Option<String>,
    #[serde(default)]
    pub srv: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl Relay {
    /// Relays from a pool's `relays` JSON; entries that do not parse are
    /// skipped.
    pub fn list_from(value: &Value) -> Vec<Relay> {
        value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Host or address as written in the registration, for display.
    pub fn label(&self) -> String {
        let host = self
            .ipv4
            .as_deref()
            .or(self.ipv6.as_deref())
            .or(self.dns.as_deref())
            .or(self.srv.as_deref())
            .unwrap_or("?");
        match self.port {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

/// The record lookups the resolver chain needs.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn a(&self, host: &str) -> Result<Vec<Ipv4Addr>>;
    async fn aaaa(&self, host: &str) -> Result<Vec<Ipv6Addr>>;
    /// SRV target host names.
    async fn srv(&self, name: &str) -> Result<Vec<String>>;
    async fn cname(&self, host: &str) -> Result<Option<String>>;
    async fn txt(&self, host: &str) -> Result<Vec<String>>;
}

/// [`DnsLookup`] over the system resolver configuration.
pub struct HickoryLookup {
    resolver: TokioResolver,
}

impl HickoryLookup {
    pub fn from_system() -> Result<Self> {
        let resolver = TokioResolver::builder_tokio()
            .map_err(|e| SourceError::Config(format!("failed to read resolver config: {e}")))?
            .build();
        Ok(Self { resolver })
    }
}

fn dns_error(host: &str, err: impl std::fmt::Display) -> SourceError {
    SourceError::Dns {
        host: host.to_string(),
        message: err.to_string(),
    }
}

fn trim_dot(name: String) -> String {
    name.trim_end_matches('.').to_string()
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn a(&self, host: &str) -> Result<Vec<Ipv4Addr>> {
        let lookup = self.resolver.ipv4_lookup(host).await.map_err(|e| dns_error(host, e))?;
        Ok(lookup.iter().map(|a| a.0).collect())
    }

    async fn aaaa(&self, host: &str) -> Result<Vec<Ipv6Addr>> {
        let lookup = self.resolver.ipv6_lookup(host).await.map_err(|e| dns_error(host, e))?;
        Ok(lookup.iter().map(|aaaa| aaaa.0).collect())
    }

    async fn srv(&self, name: &str) -> Result<Vec<String>> {
        let lookup = self.resolver.srv_lookup(name).await.map_err(|e| dns_error(name, e))?;
        Ok(lookup
            .iter()
            .map(|srv| trim_dot(srv.target().to_utf8()))
            .collect())
    }

    async fn cname(&self, host: &str) -> Result<Option<String>> {
        let lookup = self
            .resolver
            .lookup(host, RecordType::CNAME)
            .await
            .map_err(|e| dns_error(host, e))?;
        Ok(lookup.iter().find_map(|rdata| match rdata {
            RData::CNAME(target) => Some(trim_dot(target.0.to_utf8())),
            _ => None,
        }))
    }

    async fn txt(&self, host: &str) -> Result<Vec<String>> {
        let lookup = self.resolver.txt_lookup(host).await.map_err(|e| dns_error(host, e))?;
        Ok(lookup.iter().map(|txt| txt.to_string()).collect())
    }
}

fn literal_ip(value: Option<&str>) -> Option<IpAddr> {
    value.and_then(|v| v.trim().parse::<IpAddr>().ok())
}

/// First IPv4 address appearing in free text.
pub fn ipv4_in_text(text: &str) -> Option<Ipv4Addr> {
    IPV4_IN_TEXT
        .find_iter(text)
        .find_map(|m| m.as_str().parse().ok())
}

/// Resolve a relay to one address.
///
/// Literal addresses win without touching DNS. Otherwise SRV targets are
/// followed, then the host goes through A, AAAA, CNAME and finally TXT.
pub async fn resolve_relay(relay: &Relay, dns: &dyn DnsLookup) -> Option<IpAddr> {
    if let Some(ip) = literal_ip(relay.ipv4.as_deref()).or(literal_ip(relay.ipv6.as_deref())) {
        return Some(ip);
    }
    if let Some(ip) = literal_ip(relay.dns.as_deref()) {
        return Some(ip);
    }

    if let Some(srv) = relay.srv.as_deref().filter(|s| !s.is_empty()) {
        match dns.srv(srv).await {
            Ok(targets) => {
                for target in targets {
                    if let Some(ip) = resolve_host(&target, dns).await {
                        return Some(ip);
                    }
                }
            }
            Err(err) => debug!(srv, error = %err, "SRV lookup failed"),
        }
    }

    match relay.dns.as_deref().filter(|d| !d.is_empty()) {
        Some(host) => resolve_host(host, dns).await,
        None => None,
    }
}

/// A, AAAA, then CNAME (followed up to [`MAX_CNAME_DEPTH`]), then TXT.
pub async fn resolve_host(host: &str, dns: &dyn DnsLookup) -> Option<IpAddr> {
    let mut current = host.trim_end_matches('.').to_string();

    for _ in 0..=MAX_CNAME_DEPTH {
        if let Some(ip) = literal_ip(Some(current.as_str())) {
            return Some(ip);
        }
        if let Ok(addrs) = dns.a(&current).await {
            if let Some(ip) = addrs.first() {
                return Some(IpAddr::V4(*ip));
            }
        }
        if let Ok(addrs) = dns.aaaa(&current).await {
            if let Some(ip) = addrs.first() {
                return Some(IpAddr::V6(*ip));
            }
        }
        match dns.cname(&current).await {
            Ok(Some(target)) if target != current => {
                debug!(from = %current, to = %target, "following CNAME");
                current = target;
                continue;
            }
            _ => {}
        }
        break;
    }

    match dns.txt(&current).await {
        Ok(records) => records.iter().find_map(|r| ipv4_in_text(r)).map(IpAddr::V4),
        Err(err) => {
            debug!(host = %current, error = %err, "no address found");
            None
        }
    }
}
