//! Fulfillment error types.

use store::StoreError;
use thiserror::Error;

/// Errors that can occur during fulfillment operations.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The order, cookie or user the request refers to does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A backend rule rejected a write. Everything written by the call was
    /// rolled back.
    #[error("constraint {constraint} violated on {table}: {detail}")]
    ConstraintViolation {
        constraint: String,
        table: String,
        detail: String,
    },

    /// The request itself is malformed; nothing was sent to the backend.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The backend could not be reached or the connection was lost.
    /// The whole call may be retried.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The backend aborted the transaction (deadlock or serialization
    /// conflict). Nothing was written and the call may be retried.
    #[error("Transaction aborted: {0}")]
    Aborted(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(#[source] StoreError),
}

impl FulfillmentError {
    /// Returns true for failures of the backend itself rather than of the
    /// request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FulfillmentError::Connection(_)
                | FulfillmentError::Aborted(_)
                | FulfillmentError::Backend(_)
        )
    }

    /// Returns true if repeating the whole call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FulfillmentError::Connection(_) | FulfillmentError::Aborted(_)
        )
    }

    /// Returns the violated constraint name, if any.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            FulfillmentError::ConstraintViolation { constraint, .. } => Some(constraint),
            _ => None,
        }
    }
}

impl From<StoreError> for FulfillmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => FulfillmentError::NotFound { entity, id },
            StoreError::ConstraintViolation {
                constraint,
                table,
                detail,
            } => FulfillmentError::ConstraintViolation {
                constraint,
                table,
                detail,
            },
            StoreError::Connection(msg) => FulfillmentError::Connection(msg),
            StoreError::Aborted(msg) => FulfillmentError::Aborted(msg),
            other => FulfillmentError::Backend(other),
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
