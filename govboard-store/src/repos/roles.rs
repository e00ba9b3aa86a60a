//! Per-project roles, bound to a wallet stake address or an NFT asset unit.

use chrono::{DateTime, Utc};
use govboard_core::model::{Principal, PrincipalKind, ProjectRole, Role};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone, FromRow)]
struct RoleRow {
    project_id: Uuid,
    principal: String,
    principal_kind: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for ProjectRole {
    type Error = DbError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        let decode = |e: govboard_core::model::ValidationError| DbError::Sqlx(sqlx::Error::Decode(Box::new(e)));
        Ok(ProjectRole {
            project_id: row.project_id,
            principal: row.principal,
            principal_kind: row.principal_kind.parse().map_err(decode)?,
            role: row.role.parse().map_err(decode)?,
            created_at: row.created_at,
        })
    }
}

fn into_roles(rows: Vec<RoleRow>) -> DbResult<Vec<ProjectRole>> {
    rows.into_iter().map(ProjectRole::try_from).collect()
}

pub struct RoleRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> RoleRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> DbResult<Vec<ProjectRole>> {
        let rows: Vec<RoleRow> = sqlx::query_as(
            r#"
            SELECT project_id, principal, principal_kind, role, created_at
            FROM cardano_project_roles
            WHERE project_id = $1
            ORDER BY role, created_at
            "#,
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;
        into_roles(rows)
    }

    /// Grant `role`, replacing any role the principal already had. Demoting
    /// the last admin of a project is refused.
    pub async fn add(
        &self,
        project_id: Uuid,
        principal: &str,
        kind: PrincipalKind,
        role: Role,
    ) -> DbResult<ProjectRole> {
        let mut tx = self.pool.begin().await?;

        if role != Role::Admin {
            let current = current_role(&mut tx, project_id, principal, kind).await?;
            if current.as_deref() == Some(Role::Admin.as_str()) {
                ensure_other_admin(&mut tx, project_id).await?;
            }
        }

        let row: RoleRow = sqlx::query_as(
            r#"
            INSERT INTO cardano_project_roles (project_id, principal, principal_kind, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (project_id, principal, principal_kind) DO UPDATE SET role = EXCLUDED.role
            RETURNING project_id, principal, principal_kind, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(principal)
        .bind(kind.as_str())
        .bind(role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => DbError::NotFound {
                resource: "project",
                id: project_id.to_string(),
            },
            _ => DbError::Sqlx(e),
        })?;

        tx.commit().await?;
        row.try_into()
    }

    /// Revoke a role. The last admin of a project cannot be removed.
    pub async fn remove(&self, project_id: Uuid, principal: &str, kind: PrincipalKind) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let Some(current) = current_role(&mut tx, project_id, principal, kind).await? else {
            return Err(DbError::NotFound {
                resource: "role",
                id: format!("{project_id}/{principal}"),
            });
        };

        if current == Role::Admin.as_str() {
            ensure_other_admin(&mut tx, project_id).await?;
        }

        sqlx::query(
            "DELETE FROM cardano_project_roles WHERE project_id = $1 AND principal = $2 AND principal_kind = $3",
        )
        .bind(project_id)
        .bind(principal)
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Roles on `project_id` that `caller` holds through its wallet or NFTs.
    pub async fn principal_roles(&self, project_id: Uuid, caller: &Principal) -> DbResult<Vec<ProjectRole>> {
        if caller.is_anonymous() {
            return Ok(Vec::new());
        }
        let rows: Vec<RoleRow> = sqlx::query_as(
            r#"
            SELECT project_id, principal, principal_kind, role, created_at
            FROM cardano_project_roles
            WHERE project_id = $1
              AND ((principal_kind = 'wallet' AND principal = $2)
                OR (principal_kind = 'nft' AND principal = ANY($3)))
            "#,
        )
        .bind(project_id)
        .bind(caller.stake_address.as_deref())
        .bind(&caller.asset_units)
        .fetch_all(self.pool)
        .await?;
        into_roles(rows)
    }

    /// Highest role `caller` holds on the project, if any.
    pub async fn role_of(&self, project_id: Uuid, caller: &Principal) -> DbResult<Option<Role>> {
        let roles = self.principal_roles(project_id, caller).await?;
        Ok(caller.best_role(&roles))
    }
}

/// The principal's role on the project, row-locked for the transaction.
async fn current_role(
    tx: &mut Transaction<'_, Postgres>,
    project_id: Uuid,
    principal: &str,
    kind: PrincipalKind,
) -> DbResult<Option<String>> {
    let role: Option<String> = sqlx::query_scalar(
        r#"
        SELECT role FROM cardano_project_roles
        WHERE project_id = $1 AND principal = $2 AND principal_kind = $3
        FOR UPDATE
        "#,
    )
    .bind(project_id)
    .bind(principal)
    .bind(kind.as_str())
    .fetch_optional(&mut **tx)
    .await?;
    Ok(role)
}

/// Fails unless the project has an admin besides the one being demoted or
/// removed. Every admin row is locked, so two concurrent demotions cannot
/// both pass.
async fn ensure_other_admin(tx: &mut Transaction<'_, Postgres>, project_id: Uuid) -> DbResult<()> {
    let admins: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT principal FROM cardano_project_roles
        WHERE project_id = $1 AND role = 'admin'
        FOR UPDATE
        "#,
    )
    .bind(project_id)
    .fetch_all(&mut **tx)
    .await?;

    if admins.len() <= 1 {
        return Err(DbError::Conflict("a project must keep at least one admin".to_string()));
    }
    Ok(())
}
