//! Database-specific error types and conversions.

use fixmyarea_core::error::FixMyAreaError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("{message}")]
    Duplicate { entity: String, message: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Corrupt record: {0}")]
    InvalidData(String),
}

impl DbError {
    /// Classify a failed statement: unique index violations become
    /// [`DbError::Duplicate`], everything else [`DbError::Query`].
    pub(crate) fn from_check(err: impl std::fmt::Display, entity: &str, duplicate: &str) -> Self {
        let text = err.to_string();
        if text.contains("already contains") {
            DbError::Duplicate {
                entity: entity.to_string(),
                message: duplicate.to_string(),
            }
        } else {
            DbError::Query(text)
        }
    }
}

impl From<DbError> for FixMyAreaError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => FixMyAreaError::NotFound { entity, id },
            DbError::Duplicate { entity, message } => {
                FixMyAreaError::AlreadyExists { entity, message }
            }
            DbError::Conflict(message) => FixMyAreaError::Conflict { message },
            other => FixMyAreaError::Database(other.to_string()),
        }
    }
}

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(raw).map_err(|e| DbError::InvalidData(format!("invalid {what} UUID: {e}")))
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<T, DbError> {
    serde_json::from_value(value).map_err(|e| DbError::InvalidData(format!("invalid {what}: {e}")))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(value).map_err(|e| DbError::InvalidData(e.to_string()))
}

pub(crate) fn parse_enum<T>(raw: &str) -> Result<T, DbError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| DbError::InvalidData(e.to_string()))
}
