//! Inventory-tracked products.

use common::CookieId;
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::constraints::{self, SchemaViolation, max_length};

/// A `cookies` row: one SKU and its stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub id: CookieId,
    pub name: String,
    pub recipe_url: String,
    pub sku: String,
    /// Units on hand. Never negative.
    pub quantity: i32,
    pub unit_cost: Money,
}

impl Cookie {
    pub const TABLE: &'static str = "cookies";

    /// Value of the stock on hand (`quantity * unit_cost`).
    pub fn inventory_value(&self) -> Money {
        self.unit_cost.multiply(self.quantity)
    }
}

/// Column values for loading a SKU into inventory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCookie {
    pub name: String,
    pub recipe_url: String,
    pub sku: String,
    pub quantity: i32,
    pub unit_cost: Money,
}

impl NewCookie {
    pub fn new(
        name: impl Into<String>,
        recipe_url: impl Into<String>,
        sku: impl Into<String>,
        quantity: i32,
        unit_cost: Money,
    ) -> Self {
        Self {
            name: name.into(),
            recipe_url: recipe_url.into(),
            sku: sku.into(),
            quantity,
            unit_cost,
        }
    }

    pub fn validate(&self) -> Result<(), SchemaViolation> {
        let t = Cookie::TABLE;
        max_length(constraints::COOKIE_NAME_LENGTH, t, "cookie_name", &self.name, 50)?;
        max_length(
            constraints::COOKIE_RECIPE_URL_LENGTH,
            t,
            "cookie_recipe_url",
            &self.recipe_url,
            255,
        )?;
        max_length(constraints::COOKIE_SKU_LENGTH, t, "cookie_sku", &self.sku, 55)?;
        check_quantity(self.quantity)?;
        if !self.unit_cost.fits_numeric_12_2() {
            return Err(SchemaViolation::new(
                constraints::COOKIE_UNIT_COST_PRECISION,
                t,
                format!("unit_cost {} exceeds NUMERIC(12, 2)", self.unit_cost),
            ));
        }
        Ok(())
    }
}

/// The stock-level check applied on insert and on every quantity update.
pub fn check_quantity(quantity: i32) -> Result<(), SchemaViolation> {
    if quantity < 0 {
        return Err(SchemaViolation::new(
            constraints::COOKIE_QUANTITY_NON_NEGATIVE,
            Cookie::TABLE,
            format!("quantity would be {quantity}"),
        ));
    }
    Ok(())
}
