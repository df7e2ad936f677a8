//! Database operations for the storefront.
//!
//! # Database
//!
//! The storefront and admin binaries share one Postgres database. The
//! storefront reads the catalogue and writes customer-originated rows:
//!
//! - `product`, `product_size` - catalogue and stock (read; stock decremented by orders)
//! - `stock_movement` - `sale` rows appended when an order is placed
//! - `customer_order`, `order_item`
//! - `refund_request`
//! - `preorder`
//! - `newsletter_subscriber`
//!
//! # Migrations
//!
//! Migrations live in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p qyve-cli -- migrate
//! ```

pub mod newsletter;
pub mod orders;
pub mod preorders;
pub mod products;
pub mod refunds;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use newsletter::{NewsletterRepository, SubscribeOutcome};
pub use orders::{OrderRepository, PlaceOrderError};
pub use preorders::PreorderRepository;
pub use products::ProductRepository;
pub use refunds::RefundRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., a second refund request for one order).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_insert(err: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict_message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
