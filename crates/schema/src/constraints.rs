//! Named integrity constraints.
//!
//! Both persistence backends report violations under these names, so callers
//! can match on a constraint without caring which backend raised it. The
//! PostgreSQL migration declares the same names.

use thiserror::Error;

pub const USERNAME_UNIQUE: &str = "users_username_key";
pub const USERNAME_REQUIRED: &str = "users_username_required";
pub const USERNAME_LENGTH: &str = "users_username_length";
pub const EMAIL_REQUIRED: &str = "users_email_address_required";
pub const EMAIL_LENGTH: &str = "users_email_address_length";
pub const PHONE_REQUIRED: &str = "users_phone_required";
pub const PHONE_LENGTH: &str = "users_phone_length";
pub const PASSWORD_REQUIRED: &str = "users_password_required";
pub const PASSWORD_LENGTH: &str = "users_password_length";

pub const COOKIE_NAME_LENGTH: &str = "cookies_cookie_name_length";
pub const COOKIE_RECIPE_URL_LENGTH: &str = "cookies_cookie_recipe_url_length";
pub const COOKIE_SKU_LENGTH: &str = "cookies_cookie_sku_length";
/// `cookies.quantity >= 0`.
pub const COOKIE_QUANTITY_NON_NEGATIVE: &str = "quantity_positive";
/// `cookies.quantity` must fit an `INTEGER`.
pub const COOKIE_QUANTITY_RANGE: &str = "cookies_quantity_range";
pub const COOKIE_UNIT_COST_PRECISION: &str = "cookies_unit_cost_precision";

pub const ORDER_USER_FK: &str = "orders_user_id_fkey";

/// `line_items.quantity > 0`.
pub const LINE_ITEM_QUANTITY_POSITIVE: &str = "line_items_quantity_positive";
pub const LINE_ITEM_EXTENDED_COST_PRECISION: &str = "line_items_extended_cost_precision";
pub const LINE_ITEM_ORDER_FK: &str = "line_items_order_id_fkey";
pub const LINE_ITEM_COOKIE_FK: &str = "line_items_cookie_id_fkey";

/// A structural rule broken by a row about to be written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("constraint {constraint} violated on {table}: {detail}")]
pub struct SchemaViolation {
    pub constraint: &'static str,
    pub table: &'static str,
    pub detail: String,
}

impl SchemaViolation {
    pub fn new(constraint: &'static str, table: &'static str, detail: impl Into<String>) -> Self {
        Self {
            constraint,
            table,
            detail: detail.into(),
        }
    }
}

pub(crate) fn require(
    constraint: &'static str,
    table: &'static str,
    column: &str,
    value: &str,
) -> Result<(), SchemaViolation> {
    if value.trim().is_empty() {
        return Err(SchemaViolation::new(
            constraint,
            table,
            format!("{column} is required"),
        ));
    }
    Ok(())
}

/// Mirrors `VARCHAR(n)`, which counts characters rather than bytes.
pub(crate) fn max_length(
    constraint: &'static str,
    table: &'static str,
    column: &str,
    value: &str,
    max: usize,
) -> Result<(), SchemaViolation> {
    let len = value.chars().count();
    if len > max {
        return Err(SchemaViolation::new(
            constraint,
            table,
            format!("{column} is {len} characters, limit is {max}"),
        ));
    }
    Ok(())
}
