//! Upstream API clients for govboard.

pub mod binance;
pub mod collector;
pub mod geo;
pub mod github;
pub mod http;
pub mod koios;
pub mod locations;
pub mod npm;
pub mod relay;

pub use binance::BinanceClient;
pub use collector::{CollectorConfig, CollectorReport, StatsCollector};
pub use geo::GeoClient;
pub use github::{GithubClient, RepoRef};
pub use http::SourceError;
pub use koios::{KoiosClient, KoiosConfig};
pub use locations::{locate_pools, LocateStats};
pub use npm::NpmClient;
pub use relay::{resolve_relay, DnsLookup, HickoryLookup, Relay};
