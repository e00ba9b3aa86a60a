//! Read-only dashboard endpoints
//!
//! Every response is served through the state's TTL cache, keyed by the
//! entity name so a sync run can drop exactly what it changed.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use govboard_core::{bin_proposals, Entity, ProposalVotes};
use govboard_store::{LocationRepo, NpmRepo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::error::ApiError;
use crate::http::server::AppState;

const DEFAULT_MAX_COLUMNS: usize = 20;
/// Upper bound on `max_columns`, which also bounds the bins cache keys.
const MAX_COLUMNS: usize = 200;

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(format!("serialize response: {e}")))
}

/// Serve `key` from the cache, computing it with `load` on a miss.
pub(crate) async fn cached<F, Fut>(state: &AppState, key: &str, load: F) -> Result<Json<Value>, ApiError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, ApiError>>,
{
    state.cache.get_or_try_insert_with(key, load).await.map(Json)
}

/// GET /api/network-totals
async fn network_totals(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let store = state.stores.network_totals.clone();
    cached(&state, Entity::NetworkTotals.as_str(), || async move {
        to_json(&store.load_all().await?)
    })
    .await
}

/// GET /api/governance-proposals
async fn proposals(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let store = state.stores.proposals.clone();
    cached(&state, Entity::Proposals.as_str(), || async move {
        to_json(&store.load_all().await?)
    })
    .await
}

#[derive(Debug, Deserialize)]
struct BinsQuery {
    max_columns: Option<usize>,
}

/// GET /api/governance-proposals/bins?max_columns=N
async fn proposal_bins(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BinsQuery>,
) -> Result<Json<Value>, ApiError> {
    let max_columns = query
        .max_columns
        .unwrap_or(DEFAULT_MAX_COLUMNS)
        .clamp(1, MAX_COLUMNS);
    let key = format!("{}/bins?max_columns={max_columns}", Entity::Proposals.as_str());
    let store = state.stores.proposals.clone();
    cached(&state, &key, || async move {
        let proposals = store.load_all().await?;
        let votes: Vec<ProposalVotes> = proposals.iter().map(ProposalVotes::from).collect();
        to_json(&bin_proposals(&votes, max_columns))
    })
    .await
}

/// GET /api/spos
async fn spos(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let store = state.stores.spos.clone();
    cached(&state, Entity::Spos.as_str(), || async move { to_json(&store.load_all().await?) }).await
}

/// GET /api/dreps
async fn dreps(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let store = state.stores.dreps.clone();
    cached(&state, Entity::Dreps.as_str(), || async move { to_json(&store.load_all().await?) }).await
}

/// GET /api/committee
async fn committee(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let store = state.stores.committee.clone();
    cached(&state, Entity::Committee.as_str(), || async move {
        to_json(&store.load_all().await?)
    })
    .await
}

/// GET /api/chain-tip
async fn chain_tip(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let store = state.stores.chain_tip.clone();
    cached(&state, Entity::ChainTip.as_str(), || async move {
        let tip = store.load_all().await?.into_iter().next().ok_or_else(|| ApiError::NotFound {
            resource: "chain tip",
            id: "1".into(),
        })?;
        to_json(&tip)
    })
    .await
}

/// GET /api/npm-stats
async fn npm_stats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let pool = state.pool.clone();
    cached(&state, "npm-stats", || async move { to_json(&NpmRepo::new(&pool).list().await?) }).await
}

/// GET /api/spo-locations
async fn spo_locations(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let pool = state.pool.clone();
    cached(&state, "spo-locations", || async move {
        to_json(&LocationRepo::new(&pool).list().await?)
    })
    .await
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/network-totals", get(network_totals))
        .route("/api/governance-proposals", get(proposals))
        .route("/api/governance-proposals/bins", get(proposal_bins))
        .route("/api/spos", get(spos))
        .route("/api/dreps", get(dreps))
        .route("/api/committee", get(committee))
        .route("/api/chain-tip", get(chain_tip))
        .route("/api/npm-stats", get(npm_stats))
        .route("/api/spo-locations", get(spo_locations))
}
