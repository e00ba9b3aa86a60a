//! Project role management. Listing is public; changes need admin.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use govboard_core::model::{PrincipalKind, ProjectRole, Role};
use govboard_store::RoleRepo;
use serde::Deserialize;
use uuid::Uuid;

use super::projects::require_role;
use crate::http::error::ApiError;
use crate::http::extractors::Caller;
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
struct ProjectQuery {
    project_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct GrantRequest {
    project_id: Uuid,
    principal: String,
    #[serde(default = "default_kind")]
    principal_kind: PrincipalKind,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct RevokeQuery {
    project_id: Uuid,
    principal: String,
    #[serde(default = "default_kind")]
    principal_kind: PrincipalKind,
}

fn default_kind() -> PrincipalKind {
    PrincipalKind::Wallet
}

/// GET /api/projects/roles?project_id=
async fn list_roles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<ProjectRole>>, ApiError> {
    Ok(Json(RoleRepo::new(&state.pool).list_for_project(query.project_id).await?))
}

/// POST /api/projects/roles
async fn grant_role(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Json(req): Json<GrantRequest>,
) -> Result<(StatusCode, Json<ProjectRole>), ApiError> {
    let principal = normalize(req.principal_kind, &req.principal);
    req.principal_kind.validate(&principal)?;
    require_role(&state.pool, req.project_id, &caller, &[Role::Admin]).await?;

    let role = RoleRepo::new(&state.pool)
        .add(req.project_id, &principal, req.principal_kind, req.role)
        .await?;
    tracing::info!(
        project_id = %req.project_id,
        principal = %principal,
        role = %req.role,
        "role granted"
    );
    Ok((StatusCode::CREATED, Json(role)))
}

/// DELETE /api/projects/roles?project_id=&principal=&principal_kind=
async fn revoke_role(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Query(query): Query<RevokeQuery>,
) -> Result<StatusCode, ApiError> {
    let principal = normalize(query.principal_kind, &query.principal);
    require_role(&state.pool, query.project_id, &caller, &[Role::Admin]).await?;

    RoleRepo::new(&state.pool)
        .remove(query.project_id, &principal, query.principal_kind)
        .await?;
    tracing::info!(project_id = %query.project_id, principal = %principal, "role revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// Asset units are stored lowercase; stake addresses are already.
fn normalize(kind: PrincipalKind, principal: &str) -> String {
    match kind {
        PrincipalKind::Wallet => principal.trim().to_string(),
        PrincipalKind::Nft => principal.trim().to_ascii_lowercase(),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/projects/roles",
        get(list_roles).post(grant_role).delete(revoke_role),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::server::testing;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const STAKE: &str = "stake1u9ylzsgxaa6xctf4juup682ar3juj85n8tx3hthnljg47zctvm3rc";

    #[test]
    fn nft_units_are_lowercased() {
        assert_eq!(normalize(PrincipalKind::Nft, " ABCDEF "), "abcdef");
        assert_eq!(normalize(PrincipalKind::Wallet, STAKE), STAKE);
    }

    #[tokio::test]
    async fn grant_rejects_malformed_principal_before_auth() {
        let app = testing::router(testing::state());
        let body = format!(
            r#"{{"project_id": "{}", "principal": "xyz", "principal_kind": "nft", "role": "editor"}}"#,
            Uuid::new_v4()
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/projects/roles")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn anonymous_revoke_is_401() {
        let app = testing::router(testing::state());
        let uri = format!("/api/projects/roles?project_id={}&principal={STAKE}", Uuid::new_v4());
        let request = Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn listing_requires_project_id() {
        let app = testing::router(testing::state());
        let response = app
            .oneshot(Request::builder().uri("/api/projects/roles").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
