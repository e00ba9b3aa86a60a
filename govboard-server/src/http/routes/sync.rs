//! POST /api/sync/{entity}: run one reconciler and return what it produced.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use govboard_core::{run_entity, Entity, EntityReport};
use tracing::info;

use crate::http::error::ApiError;
use crate::http::extractors::require_bearer;
use crate::http::server::AppState;

async fn sync_entity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(entity): Path<String>,
) -> Result<Json<EntityReport>, ApiError> {
    require_bearer(&headers, state.ingest_token.as_deref())?;
    let entity: Entity = entity.parse()?;

    let report = run_entity(entity, &state.chain, &state.stores, &state.settings).await?;
    state.cache.invalidate_prefix(entity.as_str()).await;

    info!(
        entity = %entity,
        upserted = report.outcome.upserted,
        returned = report.outcome.returned,
        "sync requested over HTTP"
    );
    Ok(Json(report))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/sync/{entity}", post(sync_entity))
}
