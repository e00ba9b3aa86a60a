//! Ecosystem project listings
//!
//! - create: project row and the creator's admin role in one transaction
//! - update/delete: single statement, NotFound when no row matched

use chrono::{DateTime, Utc};
use govboard_core::model::{PrincipalKind, Project, ProjectInput, Role};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone, FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    url: Option<String>,
    logo_url: Option<String>,
    category: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            name: row.name,
            description: row.description,
            url: row.url,
            logo_url: row.logo_url,
            category: row.category,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str =
    "id, name, description, url, logo_url, category, created_by, created_at, updated_at";

pub struct ProjectRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ProjectRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Project>> {
        let rows: Vec<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM cardano_projects ORDER BY lower(name), created_at"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> DbResult<Project> {
        let row: ProjectRow = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM cardano_projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| not_found(id))?;
        Ok(row.into())
    }

    /// Insert a project and make `created_by` (a stake address) its admin.
    pub async fn create(&self, input: &ProjectInput, created_by: &str) -> DbResult<Project> {
        let mut tx = self.pool.begin().await?;

        let row: ProjectRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO cardano_projects (id, name, description, url, logo_url, category, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.url)
        .bind(&input.logo_url)
        .bind(&input.category)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::from_insert(e, "project"))?;

        sqlx::query(
            r#"
            INSERT INTO cardano_project_roles (project_id, principal, principal_kind, role)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(row.id)
        .bind(created_by)
        .bind(PrincipalKind::Wallet.as_str())
        .bind(Role::Admin.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    pub async fn update(&self, id: Uuid, input: &ProjectInput) -> DbResult<Project> {
        let row: ProjectRow = sqlx::query_as(&format!(
            r#"
            UPDATE cardano_projects
            SET name = $2, description = $3, url = $4, logo_url = $5, category = $6, updated_at = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.url)
        .bind(&input.logo_url)
        .bind(&input.category)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| not_found(id))?;
        Ok(row.into())
    }

    /// Delete a project; its roles go with it (`ON DELETE CASCADE`).
    pub async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM cardano_projects WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

fn not_found(id: Uuid) -> DbError {
    DbError::NotFound {
        resource: "project",
        id: id.to_string(),
    }
}
