//! HTTP handlers, one module per resource.

pub mod cookies;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod users;

use std::str::FromStr;

use fulfillment::FulfillmentService;
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub service: FulfillmentService<S>,
}

/// Parses a numeric row id from a path segment.
fn parse_id<T: FromStr>(entity: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {entity} id: {raw}")))
}
