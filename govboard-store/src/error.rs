use govboard_core::SyncError;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("row in {table} does not match its record type: {source}")]
    Decode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Map unique-violation failures to [`DbError::Conflict`].
    pub fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(format!("{what} already exists"))
            }
            _ => Self::Sqlx(err),
        }
    }

    pub(crate) fn into_sync(self, table: &str) -> SyncError {
        SyncError::store(table, self.to_string())
    }
}

impl From<DbError> for SyncError {
    fn from(err: DbError) -> Self {
        let table = match &err {
            DbError::Decode { table, .. } => *table,
            DbError::NotFound { resource, .. } => *resource,
            _ => "database",
        };
        SyncError::store(table, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = DbError::NotFound {
            resource: "project",
            id: "42".into(),
        };
        assert_eq!(err.to_string(), "not found: project '42'");
        assert!(err.is_not_found());

        let sync: SyncError = err.into();
        assert!(sync.to_string().contains("store error on project"));
    }
}
