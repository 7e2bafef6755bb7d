use schema::SchemaViolation;
use thiserror::Error;

/// Errors that can occur when talking to a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row the statement needed does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A write broke a uniqueness, check, foreign-key or column rule.
    #[error("constraint {constraint} violated on {table}: {detail}")]
    ConstraintViolation {
        constraint: String,
        table: String,
        detail: String,
    },

    /// The backend is unreachable or the connection was lost.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The backend aborted the transaction to resolve a deadlock or a
    /// serialization conflict. Nothing was written; the call may be retried.
    #[error("Transaction aborted: {0}")]
    Aborted(String),

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn violation(
        constraint: impl Into<String>,
        table: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        StoreError::ConstraintViolation {
            constraint: constraint.into(),
            table: table.into(),
            detail: detail.into(),
        }
    }

    /// Returns the violated constraint name, if this is a constraint error.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            StoreError::ConstraintViolation { constraint, .. } => Some(constraint),
            _ => None,
        }
    }
}

impl From<SchemaViolation> for StoreError {
    fn from(v: SchemaViolation) -> Self {
        StoreError::violation(v.constraint, v.table, v.detail)
    }
}

/// SQLSTATE `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";

/// Returns true for SQLSTATEs after which the whole transaction can be
/// retried as is.
pub(crate) fn is_retryable_sqlstate(code: &str) -> bool {
    matches!(code, SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err
                .code()
                .is_some_and(|code| is_retryable_sqlstate(&code))
            {
                return StoreError::Aborted(db_err.message().to_string());
            }
            if let Some(constraint) = db_err.constraint() {
                return StoreError::violation(
                    constraint,
                    db_err.table().unwrap_or_default(),
                    db_err.message(),
                );
            }
        }

        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connection(err.to_string()),
            other => StoreError::Database(other),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
