//! Order placement, lookup and shipping endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use fulfillment::{OrderLine, ShippedOrder};
use schema::{CookieId, LineItem, Money, Order, OrderId, UserId};
use serde::{Deserialize, Serialize};
use store::{OrderDetails, Store};

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order: Order,
    pub line_items: Vec<LineItem>,
    pub total_cost: Money,
}

#[derive(Serialize)]
pub struct OrderDetailsResponse {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub username: String,
    pub phone: String,
    pub shipped: bool,
    pub lines: Vec<OrderDetailLineResponse>,
    pub total_cost: Money,
}

#[derive(Serialize)]
pub struct OrderDetailLineResponse {
    pub cookie_id: CookieId,
    pub cookie_name: String,
    pub quantity: i32,
    pub extended_cost: Money,
}

impl From<OrderDetails> for OrderDetailsResponse {
    fn from(details: OrderDetails) -> Self {
        let total_cost = details.total_cost();
        Self {
            order_id: details.order_id,
            user_id: details.user_id,
            username: details.username,
            phone: details.phone,
            shipped: details.shipped,
            lines: details
                .lines
                .into_iter()
                .map(|line| OrderDetailLineResponse {
                    cookie_id: line.cookie_id,
                    cookie_name: line.cookie_name,
                    quantity: line.quantity,
                    extended_cost: line.extended_cost,
                })
                .collect(),
            total_cost,
        }
    }
}

// -- Handlers --

/// POST /orders: place an unshipped order for a customer.
#[tracing::instrument(skip(state, req), fields(user_id = %req.user_id, lines = req.lines.len()))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let placed = state.service.place_order(req.user_id, req.lines).await?;
    let total_cost = placed.total_cost();

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order: placed.order,
            line_items: placed.line_items,
            total_cost,
        }),
    ))
}

/// GET /orders/:id: customer and cookie details of an order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailsResponse>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let details = state.service.order_details(order_id).await?;
    Ok(Json(details.into()))
}

/// POST /orders/:id/ship: deduct inventory and flag the order shipped.
///
/// A repeat request for a shipped order succeeds with status
/// `already_shipped` and no deductions.
#[tracing::instrument(skip(state))]
pub async fn ship<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ShippedOrder>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let shipped = state.service.ship_order(order_id).await?;
    Ok(Json(shipped))
}
