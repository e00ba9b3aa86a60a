//! Axum server setup
//!
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::Router;
use govboard_core::cache::DEFAULT_TTL;
use govboard_core::{ChainSource, Stores, SyncSettings, TtlCache};
use govboard_sources::KoiosClient;
use serde_json::Value;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;

/// Origins the dashboard front end is served from during development.
const LOCAL_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:3030",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3030",
];

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3030)
    pub bind_addr: SocketAddr,

    /// Allow any origin (default: false = localhost only)
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub pool: PgPool,
    pub stores: Stores,
    pub koios: Arc<KoiosClient>,
    /// Chain source the sync route reconciles against; Koios unless replaced.
    pub chain: Arc<dyn ChainSource>,
    pub settings: SyncSettings,
    pub cache: TtlCache<Value>,
    /// Bearer token required by the write-side GitHub and sync routes.
    pub ingest_token: Option<String>,
}

impl AppState {
    pub fn new(pool: PgPool, stores: Stores, koios: KoiosClient) -> Self {
        let koios = Arc::new(koios);
        Self {
            pool,
            stores,
            chain: koios.clone(),
            koios,
            settings: SyncSettings::default(),
            cache: TtlCache::new(DEFAULT_TTL),
            ingest_token: None,
        }
    }

    pub fn with_chain(mut self, chain: Arc<dyn ChainSource>) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = TtlCache::new(ttl);
        self
    }

    pub fn with_ingest_token(mut self, token: Option<String>) -> Self {
        self.ingest_token = token.filter(|t| !t.is_empty());
        self
    }
}

fn cors_layer(permissive: bool) -> CorsLayer {
    if permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(LOCAL_ORIGINS.map(HeaderValue::from_static))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Assemble every route over `state`.
pub fn build_router(state: Arc<AppState>, cors_permissive: bool) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::dashboard::router())
        .merge(routes::sync::router())
        .merge(routes::koios::router())
        .merge(routes::projects::router())
        .merge(routes::roles::router())
        .merge(routes::github::router())
        .layer(cors_layer(cors_permissive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let app = build_router(Arc::new(state), config.cors_permissive);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use govboard_core::model::{
        ChainTip, CommitteeInfo, DrepDetails, DrepMetadata, DrepRecord, EpochSummary,
        GovernanceProposal, NetworkTotals, PoolDetails, SpoRecord, VotingSummary,
    };
    use govboard_store::lazy_pool;

    /// State over in-memory stores and a pool that never connects unless a
    /// handler reaches the database.
    pub fn state() -> AppState {
        let pool = lazy_pool("postgres://localhost/govboard_test").expect("lazy pool");
        let koios = KoiosClient::new("http://127.0.0.1:9/api/v1", None).expect("koios client");
        AppState::new(pool, Stores::memory(), koios)
    }

    pub fn router(state: AppState) -> Router {
        build_router(Arc::new(state), false)
    }

    /// Chain source with a fixed tip and a handful of totals rows.
    pub struct StubChain {
        pub tip_epoch: u32,
    }

    #[async_trait::async_trait]
    impl ChainSource for StubChain {
        async fn tip(&self) -> govboard_core::Result<ChainTip> {
            Ok(ChainTip {
                hash: "stub".into(),
                epoch_no: self.tip_epoch,
                abs_slot: 0,
                epoch_slot: 0,
                block_height: 0,
                block_time: 0,
            })
        }

        async fn totals(&self, epoch_no: Option<u32>) -> govboard_core::Result<Vec<NetworkTotals>> {
            let epochs = match epoch_no {
                Some(epoch) => vec![epoch],
                None => (self.tip_epoch.saturating_sub(2)..=self.tip_epoch).collect(),
            };
            Ok(epochs.into_iter().map(NetworkTotals::new).collect())
        }

        async fn epoch_info(&self, _epoch_no: u32) -> govboard_core::Result<Option<EpochSummary>> {
            Ok(None)
        }

        async fn proposals(&self) -> govboard_core::Result<Vec<GovernanceProposal>> {
            Ok(Vec::new())
        }

        async fn proposal_voting_summary(&self, _id: &str) -> govboard_core::Result<Option<VotingSummary>> {
            Ok(None)
        }

        async fn pool_list_page(&self, _offset: usize, _limit: usize) -> govboard_core::Result<Vec<SpoRecord>> {
            Ok(Vec::new())
        }

        async fn pool_info(&self, _ids: &[String]) -> govboard_core::Result<Vec<PoolDetails>> {
            Ok(Vec::new())
        }

        async fn drep_list_page(&self, _offset: usize, _limit: usize) -> govboard_core::Result<Vec<DrepRecord>> {
            Ok(Vec::new())
        }

        async fn drep_info(&self, _ids: &[String]) -> govboard_core::Result<Vec<DrepDetails>> {
            Ok(Vec::new())
        }

        async fn drep_metadata(&self, _ids: &[String]) -> govboard_core::Result<Vec<DrepMetadata>> {
            Ok(Vec::new())
        }

        async fn committee_info(&self) -> govboard_core::Result<Vec<CommitteeInfo>> {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3030);
        assert!(!config.cors_permissive);
    }

    #[tokio::test]
    async fn empty_ingest_token_counts_as_unset() {
        let state = testing::state().with_ingest_token(Some(String::new()));
        assert!(state.ingest_token.is_none());
    }
}
