use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use schema::{
    ContactUpdate, Cookie, CookieId, LineItem, LineItemId, NewCookie, NewLineItem, NewOrder,
    NewUser, Order, OrderId, User, UserId, check_quantity, constraints,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    LineItemRow, OrderDetailLine, OrderDetails, Result, StoreError,
    store::{Store, StoreTransaction},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    cookies: BTreeMap<CookieId, Cookie>,
    orders: BTreeMap<OrderId, Order>,
    line_items: BTreeMap<LineItemId, LineItem>,
    last_user_id: i64,
    last_cookie_id: i64,
    last_order_id: i64,
    last_line_item_id: i64,
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: AtomicBool,
    fail_next_commit: AtomicBool,
}

/// In-memory backend for tests and the demo server.
///
/// Enforces the same named constraints as the PostgreSQL schema. A
/// transaction takes the store's single writer lock and works on a private
/// copy of the tables, which replaces the shared copy on commit. Transactions
/// are therefore fully serialized.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `begin` fail with a connection error while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes the next commit fail with a connection error, discarding the
    /// transaction's writes.
    pub fn fail_next_commit(&self) {
        self.faults.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Committed stock level of a cookie.
    pub async fn cookie_quantity(&self, cookie_id: CookieId) -> Option<i32> {
        self.tables
            .lock()
            .await
            .cookies
            .get(&cookie_id)
            .map(|c| c.quantity)
    }

    /// Committed state of an order.
    pub async fn order(&self, order_id: OrderId) -> Option<Order> {
        self.tables.lock().await.orders.get(&order_id).cloned()
    }

    /// Committed state of a user.
    pub async fn user(&self, user_id: UserId) -> Option<User> {
        self.tables.lock().await.users.get(&user_id).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection(
                "in-memory store is unavailable".to_string(),
            ));
        }

        let committed = self.tables.clone().lock_owned().await;
        Ok(InMemoryTransaction {
            committed,
            working: None,
            faults: self.faults.clone(),
        })
    }
}

/// A transaction against [`InMemoryStore`].
///
/// Reads go to the committed tables until the first write, which copies
/// them into a private working set.
pub struct InMemoryTransaction {
    committed: OwnedMutexGuard<Tables>,
    working: Option<Tables>,
    faults: Arc<Faults>,
}

impl InMemoryTransaction {
    fn tables(&self) -> &Tables {
        self.working.as_ref().unwrap_or(&*self.committed)
    }

    fn tables_mut(&mut self) -> &mut Tables {
        let committed = &self.committed;
        self.working.get_or_insert_with(|| Tables::clone(committed))
    }

    fn user_exists(&self, user_id: UserId) -> bool {
        self.tables().users.contains_key(&user_id)
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn insert_user(&mut self, user: &NewUser) -> Result<User> {
        user.validate()?;

        if self
            .tables()
            .users
            .values()
            .any(|u| u.username == user.username)
        {
            return Err(StoreError::violation(
                constraints::USERNAME_UNIQUE,
                User::TABLE,
                format!("Key (username)=({}) already exists.", user.username),
            ));
        }

        let tables = self.tables_mut();
        tables.last_user_id += 1;
        let now = Utc::now();
        let row = User {
            id: UserId::new(tables.last_user_id),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            password: user.password.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.tables().users.get(&user_id).cloned())
    }

    async fn update_user_contact(
        &mut self,
        user_id: UserId,
        update: &ContactUpdate,
    ) -> Result<User> {
        update.validate()?;

        let user = self
            .tables_mut()
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        user.email = update.email.clone();
        user.phone = update.phone.clone();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn insert_cookie(&mut self, cookie: &NewCookie) -> Result<Cookie> {
        cookie.validate()?;

        let tables = self.tables_mut();
        tables.last_cookie_id += 1;
        let row = Cookie {
            id: CookieId::new(tables.last_cookie_id),
            name: cookie.name.clone(),
            recipe_url: cookie.recipe_url.clone(),
            sku: cookie.sku.clone(),
            quantity: cookie.quantity,
            unit_cost: cookie.unit_cost,
        };
        tables.cookies.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_cookie(&mut self, cookie_id: CookieId) -> Result<Option<Cookie>> {
        Ok(self.tables().cookies.get(&cookie_id).cloned())
    }

    async fn list_cookies(&mut self) -> Result<Vec<Cookie>> {
        let mut cookies: Vec<_> = self.tables().cookies.values().cloned().collect();
        cookies.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name)));
        Ok(cookies)
    }

    async fn adjust_cookie_quantity(&mut self, cookie_id: CookieId, delta: i32) -> Result<Cookie> {
        let current = self
            .tables()
            .cookies
            .get(&cookie_id)
            .map(|c| c.quantity)
            .ok_or_else(|| StoreError::not_found("cookie", cookie_id))?;

        let Some(new_quantity) = current.checked_add(delta) else {
            return Err(StoreError::violation(
                constraints::COOKIE_QUANTITY_RANGE,
                Cookie::TABLE,
                format!("cookie {cookie_id}: quantity {current} {delta:+} is out of range"),
            ));
        };
        check_quantity(new_quantity).map_err(|v| {
            StoreError::violation(
                v.constraint,
                v.table,
                format!("cookie {cookie_id}: quantity {current} {delta:+} would be {new_quantity}"),
            )
        })?;

        let cookie = self
            .tables_mut()
            .cookies
            .get_mut(&cookie_id)
            .ok_or_else(|| StoreError::not_found("cookie", cookie_id))?;
        cookie.quantity = new_quantity;
        Ok(cookie.clone())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order> {
        if !self.user_exists(order.user_id) {
            return Err(StoreError::violation(
                constraints::ORDER_USER_FK,
                Order::TABLE,
                format!("Key (user_id)=({}) is not present in table \"users\".", order.user_id),
            ));
        }

        let tables = self.tables_mut();
        tables.last_order_id += 1;
        let row = Order {
            id: OrderId::new(tables.last_order_id),
            user_id: order.user_id,
            shipped: false,
        };
        tables.orders.insert(row.id, row.clone());
        Ok(row)
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        // The whole store is already locked for this transaction.
        Ok(self.tables().orders.get(&order_id).cloned())
    }

    async fn orders_for_user(
        &mut self,
        user_id: UserId,
        shipped: Option<bool>,
    ) -> Result<Vec<Order>> {
        Ok(self
            .tables()
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .filter(|o| shipped.is_none_or(|s| o.shipped == s))
            .cloned()
            .collect())
    }

    async fn mark_order_shipped(&mut self, order_id: OrderId) -> Result<Order> {
        let order = self
            .tables_mut()
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;
        order.shipped = true;
        Ok(order.clone())
    }

    async fn insert_line_item(&mut self, item: &NewLineItem) -> Result<LineItem> {
        item.validate()?;

        if !self.tables().orders.contains_key(&item.order_id) {
            return Err(StoreError::violation(
                constraints::LINE_ITEM_ORDER_FK,
                LineItem::TABLE,
                format!("Key (order_id)=({}) is not present in table \"orders\".", item.order_id),
            ));
        }
        if !self.tables().cookies.contains_key(&item.cookie_id) {
            return Err(StoreError::violation(
                constraints::LINE_ITEM_COOKIE_FK,
                LineItem::TABLE,
                format!(
                    "Key (cookie_id)=({}) is not present in table \"cookies\".",
                    item.cookie_id
                ),
            ));
        }

        let tables = self.tables_mut();
        tables.last_line_item_id += 1;
        let row = LineItem {
            id: LineItemId::new(tables.last_line_item_id),
            order_id: item.order_id,
            cookie_id: item.cookie_id,
            quantity: item.quantity,
            extended_cost: item.extended_cost,
        };
        tables.line_items.insert(row.id, row.clone());
        Ok(row)
    }

    async fn line_items_for_order(&mut self, order_id: OrderId) -> Result<Vec<LineItemRow>> {
        let mut items: Vec<_> = self
            .tables()
            .line_items
            .values()
            .filter(|li| li.order_id == order_id)
            .map(|li| (li.cookie_id, li.id, li.quantity))
            .collect();
        items.sort();
        Ok(items
            .into_iter()
            .map(|(cookie_id, _, quantity)| LineItemRow {
                cookie_id,
                quantity,
            })
            .collect())
    }

    async fn order_details(&mut self, order_id: OrderId) -> Result<Option<OrderDetails>> {
        let tables = self.tables();
        let Some(order) = tables.orders.get(&order_id) else {
            return Ok(None);
        };
        let Some(user) = tables.users.get(&order.user_id) else {
            return Ok(None);
        };

        let lines = tables
            .line_items
            .values()
            .filter(|li| li.order_id == order_id)
            .filter_map(|li| {
                tables
                    .cookies
                    .get(&li.cookie_id)
                    .map(|cookie| OrderDetailLine {
                        cookie_id: cookie.id,
                        cookie_name: cookie.name.clone(),
                        quantity: li.quantity,
                        extended_cost: li.extended_cost,
                    })
            })
            .collect();

        Ok(Some(OrderDetails {
            order_id,
            user_id: user.id,
            username: user.username.clone(),
            phone: user.phone.clone(),
            shipped: order.shipped,
            lines,
        }))
    }

    async fn commit(self) -> Result<()> {
        let Self {
            mut committed,
            working,
            faults,
        } = self;

        if faults.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Connection(
                "connection lost during commit".to_string(),
            ));
        }

        if let Some(working) = working {
            *committed = working;
        }
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
