//! Schema model for the cookie shop.
//!
//! This crate defines the four entities and their integrity rules:
//! - `User`: customers, unique by username
//! - `Cookie`: one SKU with a never-negative stock level
//! - `Order`: belongs to a user, shipped at most once
//! - `LineItem`: a positive quantity of one cookie on one order
//!
//! Rules that can be checked on a single row live here as `validate()`
//! methods. Rules that need other rows (uniqueness, foreign keys) are
//! enforced by the persistence backend under the names in [`constraints`].

pub mod constraints;
pub mod cookie;
pub mod money;
pub mod order;
pub mod user;

pub use common::{CookieId, LineItemId, OrderId, UserId};
pub use constraints::SchemaViolation;
pub use cookie::{Cookie, NewCookie, check_quantity};
pub use money::Money;
pub use order::{LineItem, NewLineItem, NewOrder, Order, ShipmentState};
pub use user::{ContactUpdate, NewUser, User};
