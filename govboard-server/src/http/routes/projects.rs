//! Ecosystem project listings
//!
//! Reads are public. Creating needs a connected wallet, which becomes the
//! project's admin. Editing needs admin or editor, deleting needs admin.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use govboard_core::model::{Principal, Project, ProjectInput, Role};
use govboard_store::{ProjectRepo, RoleRepo};
use sqlx::PgPool;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::extractors::{Caller, ValidUuid};
use crate::http::server::AppState;

/// Fail unless `caller` holds one of `allowed` on the project. Anonymous
/// callers are rejected before the database is touched.
pub(crate) async fn require_role(
    pool: &PgPool,
    project_id: Uuid,
    caller: &Principal,
    allowed: &[Role],
) -> Result<Role, ApiError> {
    if caller.is_anonymous() {
        return Err(ApiError::Unauthorized(
            "connect a wallet (x-wallet-address) to manage projects".into(),
        ));
    }
    ProjectRepo::new(pool).get(project_id).await?;

    match RoleRepo::new(pool).role_of(project_id, caller).await? {
        Some(role) if allowed.contains(&role) => Ok(role),
        _ => Err(ApiError::Forbidden {
            reason: format!(
                "requires {} on project {project_id}",
                allowed.iter().map(Role::as_str).collect::<Vec<_>>().join(" or ")
            ),
        }),
    }
}

/// GET /api/projects
async fn list_projects(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(ProjectRepo::new(&state.pool).list().await?))
}

/// GET /api/projects/{id}
async fn get_project(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(ProjectRepo::new(&state.pool).get(id).await?))
}

/// POST /api/projects
async fn create_project(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let Some(creator) = caller.stake_address.as_deref() else {
        return Err(ApiError::Unauthorized(
            "x-wallet-address is required to create a project".into(),
        ));
    };
    input.validate()?;

    let project = ProjectRepo::new(&state.pool).create(&input, creator).await?;
    tracing::info!(project_id = %project.id, name = %project.name, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT /api/projects/{id}
async fn update_project(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Caller(caller): Caller,
    Json(input): Json<ProjectInput>,
) -> Result<Json<Project>, ApiError> {
    input.validate()?;
    require_role(&state.pool, id, &caller, &[Role::Admin, Role::Editor]).await?;
    Ok(Json(ProjectRepo::new(&state.pool).update(id, &input).await?))
}

/// DELETE /api/projects/{id}
async fn delete_project(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Caller(caller): Caller,
) -> Result<StatusCode, ApiError> {
    require_role(&state.pool, id, &caller, &[Role::Admin]).await?;
    ProjectRepo::new(&state.pool).delete(id).await?;
    tracing::info!(project_id = %id, "project deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::server::testing;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const BODY: &str = r#"{"name": "Mesh", "url": "https://meshjs.dev"}"#;

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn create_without_wallet_is_401() {
        let app = testing::router(testing::state());
        let response = app.oneshot(json_request("POST", "/api/projects", BODY)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_wallet_header_is_400() {
        let app = testing::router(testing::state());
        let mut request = json_request("POST", "/api/projects", BODY);
        request
            .headers_mut()
            .insert("x-wallet-address", "addr1notastakeaddress".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn anonymous_update_and_delete_are_401() {
        let app = testing::router(testing::state());
        let uri = format!("/api/projects/{}", Uuid::new_v4());

        let response = app.clone().oneshot(json_request("PUT", &uri, BODY)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let delete = Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap();
        let response = app.oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_project_id_is_400() {
        let app = testing::router(testing::state());
        let response = app
            .oneshot(Request::builder().uri("/api/projects/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
