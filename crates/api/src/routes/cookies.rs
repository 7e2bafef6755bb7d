//! Inventory endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use fulfillment::InventoryValue;
use schema::{Cookie, CookieId, NewCookie};
use serde::Deserialize;
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RestockRequest {
    pub quantity: i32,
}

/// POST /cookies: load a batch of SKUs. `unit_cost` is in cents.
#[tracing::instrument(skip(state, req), fields(count = req.len()))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<Vec<NewCookie>>,
) -> Result<(StatusCode, Json<Vec<Cookie>>), ApiError> {
    let cookies = state.service.load_inventory(req).await?;
    Ok((StatusCode::CREATED, Json(cookies)))
}

/// GET /cookies: current inventory, lowest stock first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Cookie>>, ApiError> {
    let cookies = state.service.list_inventory().await?;
    Ok(Json(cookies))
}

/// GET /cookies/value: stock value per cookie and in total, in cents.
#[tracing::instrument(skip(state))]
pub async fn value<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<InventoryValue>, ApiError> {
    let value = state.service.inventory_value().await?;
    Ok(Json(value))
}

/// POST /cookies/:id/restock
#[tracing::instrument(skip(state, req), fields(quantity = req.quantity))]
pub async fn restock<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<Cookie>, ApiError> {
    let cookie_id: CookieId = parse_id("cookie", &id)?;
    let cookie = state.service.restock(cookie_id, req.quantity).await?;
    Ok(Json(cookie))
}
