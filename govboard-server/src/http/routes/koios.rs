//! Cached pass-through to a few Koios endpoints the front end polls.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use super::dashboard::cached;
use crate::http::error::ApiError;
use crate::http::server::AppState;

async fn proxy(state: &AppState, path: &'static str, query: Vec<(String, String)>) -> Result<Json<Value>, ApiError> {
    let mut key = format!("koios:{path}");
    for (name, value) in &query {
        key.push_str(&format!(";{name}={value}"));
    }
    let koios = state.koios.clone();
    cached(state, &key, || async move {
        koios.get_raw(path, &query).await.map_err(ApiError::from)
    })
    .await
}

/// GET /api/koios-tip
async fn tip(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    proxy(&state, "/tip", Vec::new()).await
}

#[derive(Debug, Deserialize)]
struct TotalsQuery {
    epoch_no: Option<u32>,
}

/// GET /api/koios-totals?epoch_no=
async fn totals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TotalsQuery>,
) -> Result<Json<Value>, ApiError> {
    let params = query
        .epoch_no
        .map(|epoch| vec![("_epoch_no".to_string(), epoch.to_string())])
        .unwrap_or_default();
    proxy(&state, "/totals", params).await
}

/// GET /api/koios-proposals
async fn proposals(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    proxy(&state, "/proposal_list", Vec::new()).await
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/koios-tip", get(tip))
        .route("/api/koios-totals", get(totals))
        .route("/api/koios-proposals", get(proposals))
}
