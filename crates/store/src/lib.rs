//! Transactional persistence for the cookie shop schema.
//!
//! [`Store`] opens transactions; [`StoreTransaction`] exposes one typed
//! method per statement shape. Two backends are provided:
//! - [`InMemoryStore`]: serialized transactions over in-process tables
//! - [`PostgresStore`]: sqlx over a PostgreSQL pool
//!
//! Both report integrity failures as [`StoreError::ConstraintViolation`]
//! using the names in [`schema::constraints`].

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use store::{
    DatabaseConfig, LineItemRow, OrderDetailLine, OrderDetails, Store, StoreTransaction,
};
