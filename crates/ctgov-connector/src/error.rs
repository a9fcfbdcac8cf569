//! Maps `sqlx::Error` to semantic variants the orchestrator can branch on
//! (retry a transient failure, treat a unique violation as already-loaded,
//! surface everything else as a fatal run error).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection pool error (retryable): {0}")]
    TransientIo(String),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl ConnectorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectorError::SerializationConflict | ConnectorError::TransientIo(_))
    }
}

impl From<sqlx::Error> for ConnectorError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => Self::UniqueViolation(db_err.message().to_string()),
                Some("23503") => Self::ForeignKeyViolation(db_err.message().to_string()),
                Some("40001") | Some("40P01") => Self::SerializationConflict,
                Some(code) => Self::Unknown(format!("db error {code}: {}", db_err.message())),
                None => Self::Unknown(db_err.message().to_string()),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => Self::TransientIo(err.to_string()),
            other => Self::Unknown(other.to_string()),
        }
    }
}
