//! Endpoints the GitHub stats collector talks to.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use govboard_core::model::{ExistingIds, IngestBatch, IngestReport, ValidationError};
use govboard_sources::RepoRef;
use govboard_store::GithubRepo;
use serde::Deserialize;

use crate::http::error::ApiError;
use crate::http::extractors::require_bearer;
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
struct RepoQuery {
    repo: String,
}

fn check_repo(repo: &str) -> Result<(), ApiError> {
    RepoRef::parse(repo).map(|_| ()).map_err(|_| {
        ApiError::Validation(ValidationError::InvalidFormat {
            field: "repo",
            reason: "expected owner/name",
        })
    })
}

/// GET /api/github/existing-ids?repo=owner/name
async fn existing_ids(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RepoQuery>,
) -> Result<Json<ExistingIds>, ApiError> {
    check_repo(&query.repo)?;
    Ok(Json(GithubRepo::new(&state.pool).existing_ids(&query.repo).await?))
}

/// POST /api/github/ingest
async fn ingest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(batch): Json<IngestBatch>,
) -> Result<Json<IngestReport>, ApiError> {
    require_bearer(&headers, state.ingest_token.as_deref())?;
    check_repo(&batch.repo)?;
    if batch.is_empty() {
        return Ok(Json(IngestReport::default()));
    }
    Ok(Json(GithubRepo::new(&state.pool).ingest(&batch).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/github/existing-ids", get(existing_ids))
        .route("/api/github/ingest", post(ingest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::server::testing;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn ingest_request(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/github/ingest")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn ingest_requires_configured_token() {
        let state = testing::state().with_ingest_token(Some("s3cret".into()));
        let app = testing::router(state);

        let response = app
            .clone()
            .oneshot(ingest_request(None, r#"{"repo": "org/repo"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(ingest_request(Some("wrong"), r#"{"repo": "org/repo"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_batch_writes_nothing() {
        let state = testing::state().with_ingest_token(Some("s3cret".into()));
        let app = testing::router(state);

        let response = app
            .oneshot(ingest_request(Some("s3cret"), r#"{"repo": "org/repo"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let report: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(report["commits"], 0);
    }

    #[tokio::test]
    async fn existing_ids_rejects_bad_repo() {
        let app = testing::router(testing::state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/github/existing-ids?repo=nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
