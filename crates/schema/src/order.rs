//! Orders and their line items.

use common::{CookieId, LineItemId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::constraints::{self, SchemaViolation};

/// Shipment lifecycle of an order.
///
/// ```text
/// Unshipped ──ship_order──► Shipped
/// ```
///
/// There is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ShipmentState {
    #[default]
    Unshipped,
    Shipped,
}

impl ShipmentState {
    pub fn from_shipped(shipped: bool) -> Self {
        if shipped {
            ShipmentState::Shipped
        } else {
            ShipmentState::Unshipped
        }
    }

    /// Returns true if inventory may still be deducted for the order.
    pub fn can_ship(&self) -> bool {
        matches!(self, ShipmentState::Unshipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentState::Unshipped => "Unshipped",
            ShipmentState::Shipped => "Shipped",
        }
    }
}

impl std::fmt::Display for ShipmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An `orders` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipped: bool,
}

impl Order {
    pub const TABLE: &'static str = "orders";

    pub fn state(&self) -> ShipmentState {
        ShipmentState::from_shipped(self.shipped)
    }
}

/// Column values for a new order. Orders always start unshipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
}

impl NewOrder {
    pub fn for_user(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// A `line_items` row: a quantity of one SKU on one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub cookie_id: CookieId,
    pub quantity: i32,
    pub extended_cost: Money,
}

impl LineItem {
    pub const TABLE: &'static str = "line_items";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewLineItem {
    pub order_id: OrderId,
    pub cookie_id: CookieId,
    pub quantity: i32,
    pub extended_cost: Money,
}

impl NewLineItem {
    pub fn new(
        order_id: OrderId,
        cookie_id: CookieId,
        quantity: i32,
        extended_cost: Money,
    ) -> Self {
        Self {
            order_id,
            cookie_id,
            quantity,
            extended_cost,
        }
    }

    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if self.quantity <= 0 {
            return Err(SchemaViolation::new(
                constraints::LINE_ITEM_QUANTITY_POSITIVE,
                LineItem::TABLE,
                format!(
                    "quantity {} for cookie {} must be positive",
                    self.quantity, self.cookie_id
                ),
            ));
        }
        if !self.extended_cost.fits_numeric_12_2() {
            return Err(SchemaViolation::new(
                constraints::LINE_ITEM_EXTENDED_COST_PRECISION,
                LineItem::TABLE,
                format!("extended_cost {} exceeds NUMERIC(12, 2)", self.extended_cost),
            ));
        }
        Ok(())
    }
}
