//! Customer signup and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use schema::{ContactUpdate, NewUser, User, UserId};
use serde::Deserialize;
use store::Store;

use super::orders::OrderDetailsResponse;
use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    /// Keep only shipped (`true`) or unshipped (`false`) orders.
    pub shipped: Option<bool>,
    /// Return the joined customer and cookie view of each order.
    #[serde(default)]
    pub details: bool,
}

/// POST /users: sign up a customer.
#[tracing::instrument(skip(state, req), fields(username = %req.username))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.service.register_user(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /users/:id/contact: replace email and phone.
#[tracing::instrument(skip(state, req))]
pub async fn update_contact<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ContactUpdate>,
) -> Result<Json<User>, ApiError> {
    let user_id: UserId = parse_id("user", &id)?;
    let user = state.service.update_user_contact(user_id, req).await?;
    Ok(Json(user))
}

/// GET /users/:id/orders?shipped=false&details=true
#[tracing::instrument(skip(state))]
pub async fn orders<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(query): Query<OrdersQuery>,
) -> Result<Response, ApiError> {
    let user_id: UserId = parse_id("user", &id)?;

    if query.details {
        let details: Vec<OrderDetailsResponse> = state
            .service
            .order_details_for_user(user_id, query.shipped)
            .await?
            .into_iter()
            .map(OrderDetailsResponse::from)
            .collect();
        return Ok(Json(details).into_response());
    }

    let orders = state
        .service
        .orders_for_user(user_id, query.shipped)
        .await?;
    Ok(Json(orders).into_response())
}
