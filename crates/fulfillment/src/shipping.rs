//! Shipping an order: deduct every line item from inventory and flag the
//! order as shipped, all in one transaction.

use std::fmt;

use schema::{CookieId, OrderId};
use serde::Serialize;
use store::{Store, StoreTransaction};

use crate::error::{FulfillmentError, Result};
use crate::service::{FulfillmentService, finish};

/// How a ship request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipStatus {
    /// Inventory was deducted and the order flagged by this call.
    Shipped,
    /// The order had already shipped; nothing was changed.
    AlreadyShipped,
}

impl fmt::Display for ShipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShipStatus::Shipped => f.write_str("shipped"),
            ShipStatus::AlreadyShipped => f.write_str("already_shipped"),
        }
    }
}

/// Stock removed for one line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deduction {
    pub cookie_id: CookieId,
    pub quantity: i32,
    /// Stock left after this deduction.
    pub remaining: i32,
}

/// Outcome of [`FulfillmentService::ship_order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippedOrder {
    pub order_id: OrderId,
    pub shipped: bool,
    pub status: ShipStatus,
    pub deductions: Vec<Deduction>,
}

impl ShippedOrder {
    fn already_shipped(order_id: OrderId) -> Self {
        Self {
            order_id,
            shipped: true,
            status: ShipStatus::AlreadyShipped,
            deductions: Vec::new(),
        }
    }

    /// Total units removed from inventory.
    pub fn units_deducted(&self) -> u64 {
        self.deductions
            .iter()
            .map(|d| u64::from(d.quantity.unsigned_abs()))
            .sum()
    }
}

impl<S: Store> FulfillmentService<S> {
    /// Ships an order.
    ///
    /// Every line item's quantity is subtracted from its cookie's stock and
    /// the order is flagged shipped. Either all of that is committed or none
    /// of it is: if any cookie would go negative the call fails with the
    /// `quantity_positive` violation and inventory is left exactly as it was.
    ///
    /// Shipping an order that already shipped deducts nothing and returns
    /// [`ShipStatus::AlreadyShipped`]. An order with no line items is
    /// flagged shipped with no inventory change.
    #[tracing::instrument(skip(self))]
    pub async fn ship_order(&self, order_id: OrderId) -> Result<ShippedOrder> {
        let start = std::time::Instant::now();
        let result = self.ship(order_id).await;
        metrics::histogram!("ship_order_duration_seconds").record(start.elapsed().as_secs_f64());

        match &result {
            Ok(shipped) if shipped.status == ShipStatus::Shipped => {
                metrics::counter!("orders_shipped_total").increment(1);
                metrics::counter!("inventory_units_deducted_total")
                    .increment(shipped.units_deducted());
                tracing::info!(
                    line_items = shipped.deductions.len(),
                    units = shipped.units_deducted(),
                    "order shipped"
                );
            }
            Ok(_) => {
                metrics::counter!("orders_already_shipped_total").increment(1);
                tracing::info!("order already shipped, nothing deducted");
            }
            Err(err) => {
                metrics::counter!("orders_ship_failed_total").increment(1);
                tracing::warn!(error = %err, fatal = err.is_fatal(), "order not shipped");
            }
        }

        result
    }

    async fn ship(&self, order_id: OrderId) -> Result<ShippedOrder> {
        let mut tx = self.store.begin().await?;
        let result = deduct_and_flag(&mut tx, order_id).await;
        match result {
            Ok(shipped) if shipped.status == ShipStatus::AlreadyShipped => {
                // Nothing was written; release the row lock.
                if let Err(err) = tx.rollback().await {
                    tracing::warn!(error = %err, "rollback failed");
                }
                Ok(shipped)
            }
            result => finish(tx, result).await,
        }
    }
}

async fn deduct_and_flag<T: StoreTransaction>(
    tx: &mut T,
    order_id: OrderId,
) -> Result<ShippedOrder> {
    let order = tx
        .lock_order(order_id)
        .await?
        .ok_or(FulfillmentError::NotFound {
            entity: "order",
            id: order_id.as_i64(),
        })?;

    if !order.state().can_ship() {
        return Ok(ShippedOrder::already_shipped(order_id));
    }

    // Cookie order, so concurrent shipments lock cookie rows in one sequence.
    let items = tx.line_items_for_order(order_id).await?;
    let mut deductions = Vec::with_capacity(items.len());
    for item in items {
        // Line item quantities are positive, so the negation cannot overflow.
        let cookie = tx.adjust_cookie_quantity(item.cookie_id, -item.quantity).await?;
        tracing::debug!(
            cookie_id = %item.cookie_id,
            quantity = item.quantity,
            remaining = cookie.quantity,
            "inventory deducted"
        );
        deductions.push(Deduction {
            cookie_id: item.cookie_id,
            quantity: item.quantity,
            remaining: cookie.quantity,
        });
    }

    let order = tx.mark_order_shipped(order_id).await?;

    Ok(ShippedOrder {
        order_id,
        shipped: order.shipped,
        status: ShipStatus::Shipped,
        deductions,
    })
}

#[cfg(test)]
mod tests {
    use schema::{Money, NewCookie, NewUser, constraints};
    use store::InMemoryStore;

    use super::*;
    use crate::OrderLine;

    async fn seeded() -> (FulfillmentService<InMemoryStore>, Vec<CookieId>, schema::UserId) {
        let service = FulfillmentService::new(InMemoryStore::new());
        let user = service
            .register_user(NewUser::new("cookiemon", "mon@cookie.com", "111-111-1111", "pw"))
            .await
            .unwrap();
        let cookies = service
            .load_inventory(vec![
                NewCookie::new("chocolate chip", "", "CC01", 12, Money::from_cents(50)),
                NewCookie::new("dark chocolate chip", "", "CC02", 1, Money::from_cents(75)),
            ])
            .await
            .unwrap();
        let ids = cookies.iter().map(|c| c.id).collect();
        (service, ids, user.id)
    }

    #[tokio::test]
    async fn ship_deducts_each_line_item() {
        let (service, cookies, user) = seeded().await;
        let placed = service
            .place_order(user, vec![OrderLine::new(cookies[0], 9)])
            .await
            .unwrap();

        let shipped = service.ship_order(placed.order.id).await.unwrap();

        assert_eq!(shipped.status, ShipStatus::Shipped);
        assert!(shipped.shipped);
        assert_eq!(
            shipped.deductions,
            vec![Deduction {
                cookie_id: cookies[0],
                quantity: 9,
                remaining: 3
            }]
        );
        assert_eq!(service.store().cookie_quantity(cookies[0]).await, Some(3));
    }

    #[tokio::test]
    async fn insufficient_stock_changes_nothing() {
        let (service, cookies, user) = seeded().await;
        let placed = service
            .place_order(
                user,
                vec![
                    OrderLine::new(cookies[0], 2),
                    OrderLine::new(cookies[1], 4),
                ],
            )
            .await
            .unwrap();

        let err = service.ship_order(placed.order.id).await.unwrap_err();

        assert_eq!(err.constraint(), Some(constraints::COOKIE_QUANTITY_NON_NEGATIVE));
        assert_eq!(service.store().cookie_quantity(cookies[0]).await, Some(12));
        assert_eq!(service.store().cookie_quantity(cookies[1]).await, Some(1));
        let order = service.store().order(placed.order.id).await.unwrap();
        assert!(!order.shipped);
    }

    #[tokio::test]
    async fn shipping_twice_deducts_once() {
        let (service, cookies, user) = seeded().await;
        let placed = service
            .place_order(user, vec![OrderLine::new(cookies[0], 5)])
            .await
            .unwrap();

        service.ship_order(placed.order.id).await.unwrap();
        let again = service.ship_order(placed.order.id).await.unwrap();

        assert_eq!(again.status, ShipStatus::AlreadyShipped);
        assert!(again.deductions.is_empty());
        assert_eq!(service.store().cookie_quantity(cookies[0]).await, Some(7));
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let (service, _, _) = seeded().await;
        let err = service.ship_order(OrderId::new(42)).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::NotFound { entity: "order", id: 42 }));
    }

    #[test]
    fn units_deducted_sums_quantities() {
        let shipped = ShippedOrder {
            order_id: OrderId::new(1),
            shipped: true,
            status: ShipStatus::Shipped,
            deductions: vec![
                Deduction {
                    cookie_id: CookieId::new(1),
                    quantity: 2,
                    remaining: 0,
                },
                Deduction {
                    cookie_id: CookieId::new(2),
                    quantity: 5,
                    remaining: 1,
                },
            ],
        };
        assert_eq!(shipped.units_deducted(), 7);
        assert_eq!(ShipStatus::AlreadyShipped.to_string(), "already_shipped");
    }
}
