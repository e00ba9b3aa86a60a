//! govboard-server: JSON API behind the governance dashboards
//!
//! Serves the synced tables with a read-through cache, triggers reconcilers,
//! proxies a few Koios endpoints and manages ecosystem project listings.

pub mod http;

pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
