//! Transactional shop operations.

use schema::{
    ContactUpdate, Cookie, CookieId, LineItem, Money, NewCookie, NewLineItem, NewOrder, NewUser,
    Order, OrderId, User, UserId,
};
use serde::{Deserialize, Serialize};
use store::{OrderDetails, Store, StoreTransaction};

use crate::error::{FulfillmentError, Result};

/// A requested line on a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OrderLine {
    pub cookie_id: CookieId,
    pub quantity: i32,
}

impl OrderLine {
    pub fn new(cookie_id: CookieId, quantity: i32) -> Self {
        Self {
            cookie_id,
            quantity,
        }
    }
}

/// An order as created by [`FulfillmentService::place_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    pub line_items: Vec<LineItem>,
}

impl PlacedOrder {
    pub fn total_cost(&self) -> Money {
        self.line_items.iter().map(|li| li.extended_cost).sum()
    }
}

/// Stock value of one cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieValue {
    pub cookie_id: CookieId,
    pub name: String,
    pub quantity: i32,
    /// `quantity * unit_cost`
    pub value: Money,
}

/// What the stock on hand is worth, per cookie and in total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryValue {
    pub cookies: Vec<CookieValue>,
    pub total: Money,
}

impl From<Vec<Cookie>> for InventoryValue {
    fn from(cookies: Vec<Cookie>) -> Self {
        let cookies: Vec<CookieValue> = cookies
            .into_iter()
            .map(|cookie| CookieValue {
                value: cookie.inventory_value(),
                cookie_id: cookie.id,
                name: cookie.name,
                quantity: cookie.quantity,
            })
            .collect();
        let total = cookies.iter().map(|c| c.value).sum();
        Self { cookies, total }
    }
}

/// Entry point for every shop operation.
///
/// Each public method runs in exactly one backend transaction, which is
/// committed on success and rolled back on any error before the method
/// returns.
pub struct FulfillmentService<S: Store> {
    pub(crate) store: S,
}

impl<S: Store> FulfillmentService<S> {
    /// Creates a new service over the given backend.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying backend.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Signs up a user. Usernames are unique.
    #[tracing::instrument(skip(self, user), fields(username = %user.username))]
    pub async fn register_user(&self, user: NewUser) -> Result<User> {
        let mut tx = self.store.begin().await?;
        let result = tx.insert_user(&user).await.map_err(FulfillmentError::from);
        finish(tx, result).await
    }

    /// Replaces a user's email and phone.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_user_contact(
        &self,
        user_id: UserId,
        update: ContactUpdate,
    ) -> Result<User> {
        let mut tx = self.store.begin().await?;
        let result = tx
            .update_user_contact(user_id, &update)
            .await
            .map_err(FulfillmentError::from);
        finish(tx, result).await
    }

    /// Loads a batch of SKUs into inventory. Either every cookie is inserted
    /// or none is.
    #[tracing::instrument(skip(self, cookies), fields(count = cookies.len()))]
    pub async fn load_inventory(&self, cookies: Vec<NewCookie>) -> Result<Vec<Cookie>> {
        let mut tx = self.store.begin().await?;
        let result = insert_cookies(&mut tx, &cookies).await;
        finish(tx, result).await
    }

    /// Adds stock to an existing cookie.
    #[tracing::instrument(skip(self))]
    pub async fn restock(&self, cookie_id: CookieId, quantity: i32) -> Result<Cookie> {
        if quantity <= 0 {
            return Err(FulfillmentError::InvalidRequest(format!(
                "restock quantity must be positive, got {quantity}"
            )));
        }

        let mut tx = self.store.begin().await?;
        let result = tx
            .adjust_cookie_quantity(cookie_id, quantity)
            .await
            .map_err(FulfillmentError::from);
        finish(tx, result).await
    }

    /// Creates an unshipped order with one line item per requested line.
    ///
    /// Each line's extended cost is the cookie's current unit cost times the
    /// quantity. An empty `lines` creates an order with nothing to ship.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        lines: Vec<OrderLine>,
    ) -> Result<PlacedOrder> {
        let mut tx = self.store.begin().await?;
        let result = create_order(&mut tx, user_id, &lines).await;
        let result = finish(tx, result).await;
        if let Ok(placed) = &result {
            tracing::info!(
                order_id = %placed.order.id,
                total = %placed.total_cost(),
                "order placed"
            );
        }
        result
    }

    /// All cookies, lowest stock first.
    #[tracing::instrument(skip(self))]
    pub async fn list_inventory(&self) -> Result<Vec<Cookie>> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_cookies().await.map_err(FulfillmentError::from);
        finish(tx, result).await
    }

    /// Value of the stock on hand, lowest stock first.
    #[tracing::instrument(skip(self))]
    pub async fn inventory_value(&self) -> Result<InventoryValue> {
        self.list_inventory().await.map(InventoryValue::from)
    }

    /// The customer and cookie details of one order.
    #[tracing::instrument(skip(self))]
    pub async fn order_details(&self, order_id: OrderId) -> Result<OrderDetails> {
        let mut tx = self.store.begin().await?;
        let result = match tx.order_details(order_id).await {
            Ok(Some(details)) => Ok(details),
            Ok(None) => Err(FulfillmentError::NotFound {
                entity: "order",
                id: order_id.as_i64(),
            }),
            Err(err) => Err(err.into()),
        };
        finish(tx, result).await
    }

    /// A user's orders, oldest first. `shipped` keeps only shipped
    /// (`Some(true)`) or unshipped (`Some(false)`) orders.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_user(
        &self,
        user_id: UserId,
        shipped: Option<bool>,
    ) -> Result<Vec<Order>> {
        let mut tx = self.store.begin().await?;
        let result = user_orders(&mut tx, user_id, shipped).await;
        finish(tx, result).await
    }

    /// Like [`orders_for_user`](Self::orders_for_user), with the cookie
    /// name, quantity and extended cost of every line.
    #[tracing::instrument(skip(self))]
    pub async fn order_details_for_user(
        &self,
        user_id: UserId,
        shipped: Option<bool>,
    ) -> Result<Vec<OrderDetails>> {
        let mut tx = self.store.begin().await?;
        let result = user_order_details(&mut tx, user_id, shipped).await;
        finish(tx, result).await
    }
}

async fn insert_cookies<T: StoreTransaction>(
    tx: &mut T,
    cookies: &[NewCookie],
) -> Result<Vec<Cookie>> {
    let mut inserted = Vec::with_capacity(cookies.len());
    for cookie in cookies {
        inserted.push(tx.insert_cookie(cookie).await?);
    }
    Ok(inserted)
}

async fn create_order<T: StoreTransaction>(
    tx: &mut T,
    user_id: UserId,
    lines: &[OrderLine],
) -> Result<PlacedOrder> {
    if tx.get_user(user_id).await?.is_none() {
        return Err(FulfillmentError::NotFound {
            entity: "user",
            id: user_id.as_i64(),
        });
    }

    let order = tx.insert_order(&NewOrder::for_user(user_id)).await?;

    let mut line_items = Vec::with_capacity(lines.len());
    for line in lines {
        let cookie = tx
            .get_cookie(line.cookie_id)
            .await?
            .ok_or(FulfillmentError::NotFound {
                entity: "cookie",
                id: line.cookie_id.as_i64(),
            })?;
        let item = NewLineItem::new(
            order.id,
            cookie.id,
            line.quantity,
            cookie.unit_cost.multiply(line.quantity),
        );
        line_items.push(tx.insert_line_item(&item).await?);
    }

    Ok(PlacedOrder { order, line_items })
}

async fn user_orders<T: StoreTransaction>(
    tx: &mut T,
    user_id: UserId,
    shipped: Option<bool>,
) -> Result<Vec<Order>> {
    if tx.get_user(user_id).await?.is_none() {
        return Err(FulfillmentError::NotFound {
            entity: "user",
            id: user_id.as_i64(),
        });
    }
    Ok(tx.orders_for_user(user_id, shipped).await?)
}

async fn user_order_details<T: StoreTransaction>(
    tx: &mut T,
    user_id: UserId,
    shipped: Option<bool>,
) -> Result<Vec<OrderDetails>> {
    let orders = user_orders(tx, user_id, shipped).await?;
    let mut details = Vec::with_capacity(orders.len());
    for order in orders {
        if let Some(detail) = tx.order_details(order.id).await? {
            details.push(detail);
        }
    }
    Ok(details)
}

/// Commits on success and rolls back on failure.
///
/// A failed rollback is logged rather than returned so the caller sees the
/// error that caused it.
pub(crate) async fn finish<T, Tx: StoreTransaction>(tx: Tx, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
