//! Order fulfillment for the cookie shop.
//!
//! [`FulfillmentService`] wraps a [`store::Store`] and runs every shop
//! operation as one transaction. The central one is
//! [`FulfillmentService::ship_order`], which deducts an order's line items
//! from inventory and flags it shipped, or changes nothing at all.

pub mod error;
pub mod service;
pub mod shipping;

pub use error::{FulfillmentError, Result};
pub use service::{CookieValue, FulfillmentService, InventoryValue, OrderLine, PlacedOrder};
pub use shipping::{Deduction, ShipStatus, ShippedOrder};
