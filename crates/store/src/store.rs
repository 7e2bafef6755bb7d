use std::time::Duration;

use async_trait::async_trait;
use schema::{
    ContactUpdate, Cookie, CookieId, LineItem, Money, NewCookie, NewLineItem, NewOrder, NewUser,
    Order, OrderId, User, UserId,
};

use crate::Result;

/// The `(cookie_id, quantity)` projection of a line item, as read by the
/// shipping workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItemRow {
    pub cookie_id: CookieId,
    pub quantity: i32,
}

/// One row of the `line_items JOIN cookies` part of an order detail query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetailLine {
    pub cookie_id: CookieId,
    pub cookie_name: String,
    pub quantity: i32,
    pub extended_cost: Money,
}

/// The `users JOIN orders JOIN line_items JOIN cookies` view of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub username: String,
    pub phone: String,
    pub shipped: bool,
    pub lines: Vec<OrderDetailLine>,
}

impl OrderDetails {
    /// Sum of the extended cost of every line.
    pub fn total_cost(&self) -> Money {
        self.lines.iter().map(|line| line.extended_cost).sum()
    }
}

/// Connection settings for a SQL backend.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// A persistence backend able to open transactions.
///
/// Implementations are cheap handles constructed by the application and
/// passed to whoever needs them; there is no process-wide connection.
#[async_trait]
pub trait Store: Send + Sync {
    type Transaction: StoreTransaction + 'static;

    /// Opens a transaction. Fails with `Connection` if the backend is
    /// unreachable.
    async fn begin(&self) -> Result<Self::Transaction>;
}

/// One open unit of work.
///
/// Every statement runs inside the transaction; nothing is visible to
/// other transactions until [`commit`](StoreTransaction::commit).
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn insert_user(&mut self, user: &NewUser) -> Result<User>;

    async fn get_user(&mut self, user_id: UserId) -> Result<Option<User>>;

    /// Overwrites email and phone, refreshing `updated_at`.
    async fn update_user_contact(&mut self, user_id: UserId, update: &ContactUpdate)
    -> Result<User>;

    async fn insert_cookie(&mut self, cookie: &NewCookie) -> Result<Cookie>;

    async fn get_cookie(&mut self, cookie_id: CookieId) -> Result<Option<Cookie>>;

    /// All cookies, ordered by quantity then name.
    async fn list_cookies(&mut self) -> Result<Vec<Cookie>>;

    /// Applies `quantity = quantity + delta` as a single statement.
    ///
    /// Fails with `NotFound` if the cookie does not exist and with a
    /// `quantity_positive` violation if the result would be negative.
    async fn adjust_cookie_quantity(&mut self, cookie_id: CookieId, delta: i32) -> Result<Cookie>;

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order>;

    /// Reads an order and holds a write lock on it until the transaction
    /// ends.
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>>;

    /// A user's orders, oldest first. `shipped` restricts the result to
    /// shipped or unshipped orders.
    async fn orders_for_user(&mut self, user_id: UserId, shipped: Option<bool>)
    -> Result<Vec<Order>>;

    async fn mark_order_shipped(&mut self, order_id: OrderId) -> Result<Order>;

    async fn insert_line_item(&mut self, item: &NewLineItem) -> Result<LineItem>;

    /// Line items of an order, ordered by cookie then insertion.
    ///
    /// Shipping deducts in this order, so concurrent shipments lock cookie
    /// rows in the same sequence.
    async fn line_items_for_order(&mut self, order_id: OrderId) -> Result<Vec<LineItemRow>>;

    async fn order_details(&mut self, order_id: OrderId) -> Result<Option<OrderDetails>>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}
