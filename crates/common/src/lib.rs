//! Identifier types shared by every crate in the cookie shop workspace.

mod types;

pub use types::{CookieId, LineItemId, OrderId, UserId};
