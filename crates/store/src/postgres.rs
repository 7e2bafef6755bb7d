use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schema::{
    ContactUpdate, Cookie, CookieId, LineItem, LineItemId, Money, NewCookie, NewLineItem, NewOrder,
    NewUser, Order, OrderId, User, UserId, constraints,
};
use sqlx::{PgPool, Postgres, Row, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    DatabaseConfig, LineItemRow, OrderDetailLine, OrderDetails, Result, StoreError,
    store::{Store, StoreTransaction},
};

/// SQLSTATE for `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool with the given settings.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::debug!(max_connections = config.max_connections, "connecting to postgres");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }
}

/// A transaction on a pooled PostgreSQL connection.
///
/// sqlx rolls the transaction back if it is dropped uncommitted.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn row_to_user(row: PgRow) -> Result<User> {
    Ok(User {
        id: UserId::new(row.try_get("user_id")?),
        username: row.try_get("username")?,
        email: row.try_get("email_address")?,
        phone: row.try_get("phone")?,
        password: row.try_get("password")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_on")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_on")?,
    })
}

fn row_to_cookie(row: PgRow) -> Result<Cookie> {
    Ok(Cookie {
        id: CookieId::new(row.try_get("cookie_id")?),
        name: row.try_get("cookie_name")?,
        recipe_url: row.try_get("cookie_recipe_url")?,
        sku: row.try_get("cookie_sku")?,
        quantity: row.try_get("quantity")?,
        unit_cost: Money::from_cents(row.try_get("unit_cost_cents")?),
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::new(row.try_get("order_id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        shipped: row.try_get("shipped")?,
    })
}

fn row_to_line_item(row: PgRow) -> Result<LineItem> {
    Ok(LineItem {
        id: LineItemId::new(row.try_get("line_items_id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        cookie_id: CookieId::new(row.try_get("cookie_id")?),
        quantity: row.try_get("quantity")?,
        extended_cost: Money::from_cents(row.try_get("extended_cost_cents")?),
    })
}

/// Adds the statement's inputs to a constraint error so the caller can tell
/// which row was rejected.
fn adjust_error(err: sqlx::Error, cookie_id: CookieId, delta: i32) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE)
    {
        return StoreError::violation(
            constraints::COOKIE_QUANTITY_RANGE,
            Cookie::TABLE,
            format!("cookie {cookie_id}: quantity {delta:+} is out of range"),
        );
    }

    match StoreError::from(err) {
        StoreError::ConstraintViolation {
            constraint,
            table,
            detail,
        } => StoreError::ConstraintViolation {
            constraint,
            table,
            detail: format!("{detail} (cookie_id={cookie_id}, delta={delta:+})"),
        },
        other => other,
    }
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn insert_user(&mut self, user: &NewUser) -> Result<User> {
        user.validate()?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email_address, phone, password)
            VALUES ($1, $2, $3, $4)
            RETURNING user_id, username, email_address, phone, password, created_on, updated_on
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_user(row)
    }

    async fn get_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, username, email_address, phone, password, created_on, updated_on
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_user).transpose()
    }

    async fn update_user_contact(
        &mut self,
        user_id: UserId,
        update: &ContactUpdate,
    ) -> Result<User> {
        update.validate()?;

        let row = sqlx::query(
            r#"
            UPDATE users
            SET email_address = $2, phone = $3, updated_on = clock_timestamp()
            WHERE user_id = $1
            RETURNING user_id, username, email_address, phone, password, created_on, updated_on
            "#,
        )
        .bind(user_id.as_i64())
        .bind(&update.email)
        .bind(&update.phone)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::not_found("user", user_id))?;

        row_to_user(row)
    }

    async fn insert_cookie(&mut self, cookie: &NewCookie) -> Result<Cookie> {
        cookie.validate()?;

        let row = sqlx::query(
            r#"
            INSERT INTO cookies (cookie_name, cookie_recipe_url, cookie_sku, quantity, unit_cost)
            VALUES ($1, $2, $3, $4, $5::BIGINT::NUMERIC / 100)
            RETURNING cookie_id, cookie_name, cookie_recipe_url, cookie_sku, quantity,
                      (unit_cost * 100)::BIGINT AS unit_cost_cents
            "#,
        )
        .bind(&cookie.name)
        .bind(&cookie.recipe_url)
        .bind(&cookie.sku)
        .bind(cookie.quantity)
        .bind(cookie.unit_cost.cents())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_cookie(row)
    }

    async fn get_cookie(&mut self, cookie_id: CookieId) -> Result<Option<Cookie>> {
        let row = sqlx::query(
            r#"
            SELECT cookie_id, cookie_name, cookie_recipe_url, cookie_sku, quantity,
                   (unit_cost * 100)::BIGINT AS unit_cost_cents
            FROM cookies
            WHERE cookie_id = $1
            "#,
        )
        .bind(cookie_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_cookie).transpose()
    }

    async fn list_cookies(&mut self) -> Result<Vec<Cookie>> {
        let rows = sqlx::query(
            r#"
            SELECT cookie_id, cookie_name, cookie_recipe_url, cookie_sku, quantity,
                   (unit_cost * 100)::BIGINT AS unit_cost_cents
            FROM cookies
            ORDER BY quantity ASC, cookie_name ASC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_cookie).collect()
    }

    async fn adjust_cookie_quantity(&mut self, cookie_id: CookieId, delta: i32) -> Result<Cookie> {
        let row = sqlx::query(
            r#"
            UPDATE cookies
            SET quantity = quantity + $2
            WHERE cookie_id = $1
            RETURNING cookie_id, cookie_name, cookie_recipe_url, cookie_sku, quantity,
                      (unit_cost * 100)::BIGINT AS unit_cost_cents
            "#,
        )
        .bind(cookie_id.as_i64())
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| adjust_error(e, cookie_id, delta))?
        .ok_or_else(|| StoreError::not_found("cookie", cookie_id))?;

        row_to_cookie(row)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (user_id, shipped)
            VALUES ($1, FALSE)
            RETURNING order_id, user_id, shipped
            "#,
        )
        .bind(order.user_id.as_i64())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order(row)
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT order_id, user_id, shipped
            FROM orders
            WHERE order_id = $1
            FOR UPDATE
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn orders_for_user(
        &mut self,
        user_id: UserId,
        shipped: Option<bool>,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, user_id, shipped
            FROM orders
            WHERE user_id = $1 AND ($2::BOOLEAN IS NULL OR shipped = $2)
            ORDER BY order_id ASC
            "#,
        )
        .bind(user_id.as_i64())
        .bind(shipped)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn mark_order_shipped(&mut self, order_id: OrderId) -> Result<Order> {
        let row = sqlx::query(
            r#"
            UPDATE orders
            SET shipped = TRUE
            WHERE order_id = $1
            RETURNING order_id, user_id, shipped
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::not_found("order", order_id))?;

        row_to_order(row)
    }

    async fn insert_line_item(&mut self, item: &NewLineItem) -> Result<LineItem> {
        item.validate()?;

        let row = sqlx::query(
            r#"
            INSERT INTO line_items (order_id, cookie_id, quantity, extended_cost)
            VALUES ($1, $2, $3, $4::BIGINT::NUMERIC / 100)
            RETURNING line_items_id, order_id, cookie_id, quantity,
                      (extended_cost * 100)::BIGINT AS extended_cost_cents
            "#,
        )
        .bind(item.order_id.as_i64())
        .bind(item.cookie_id.as_i64())
        .bind(item.quantity)
        .bind(item.extended_cost.cents())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_line_item(row)
    }

    async fn line_items_for_order(&mut self, order_id: OrderId) -> Result<Vec<LineItemRow>> {
        let rows = sqlx::query(
            r#"
            SELECT cookie_id, quantity
            FROM line_items
            WHERE order_id = $1
            ORDER BY cookie_id ASC, line_items_id ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(LineItemRow {
                    cookie_id: CookieId::new(row.try_get("cookie_id")?),
                    quantity: row.try_get("quantity")?,
                })
            })
            .collect()
    }

    async fn order_details(&mut self, order_id: OrderId) -> Result<Option<OrderDetails>> {
        let header = sqlx::query(
            r#"
            SELECT o.order_id, o.user_id, o.shipped, u.username, u.phone
            FROM orders o
            JOIN users u ON u.user_id = o.user_id
            WHERE o.order_id = $1
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"
            SELECT c.cookie_id, c.cookie_name, li.quantity,
                   (li.extended_cost * 100)::BIGINT AS extended_cost_cents
            FROM line_items li
            JOIN cookies c ON c.cookie_id = li.cookie_id
            WHERE li.order_id = $1
            ORDER BY li.line_items_id ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;

        let lines = rows
            .into_iter()
            .map(|row| {
                Ok(OrderDetailLine {
                    cookie_id: CookieId::new(row.try_get("cookie_id")?),
                    cookie_name: row.try_get("cookie_name")?,
                    quantity: row.try_get("quantity")?,
                    extended_cost: Money::from_cents(row.try_get("extended_cost_cents")?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(OrderDetails {
            order_id: OrderId::new(header.try_get("order_id")?),
            user_id: UserId::new(header.try_get("user_id")?),
            username: header.try_get("username")?,
            phone: header.try_get("phone")?,
            shipped: header.try_get("shipped")?,
            lines,
        }))
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
