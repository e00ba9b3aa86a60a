use std::sync::Arc;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use govboard_core::RecordStore;
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Epoch of the stored chain tip; `None` before the first tip sync or
    /// when the store cannot be read.
    pub synced_epoch: Option<u32>,
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let synced_epoch = match state.stores.chain_tip.load_all().await {
        Ok(rows) => rows.first().map(|tip| tip.epoch_no),
        Err(e) => {
            tracing::warn!(error = %e, "health: chain tip unavailable");
            None
        }
    };

    Json(HealthResponse {
        status: "ok",
        service: "govboard",
        version: env!("CARGO_PKG_VERSION"),
        synced_epoch,
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
