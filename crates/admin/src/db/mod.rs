//! Database operations for the back-office.
//!
//! # Database
//!
//! Admin shares the storefront's Postgres database and owns the writes a
//! customer cannot make:
//!
//! - `product_size` / `stock_movement` - manual adjustments, stocktakes, restocks
//! - `customer_order` - status transitions and shipment details
//! - `refund_request` - reviews
//! - `preorder` - status changes
//! - `newsletter_subscriber` - read only
//!
//! # Migrations
//!
//! Migrations live in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p qyve-cli -- migrate
//! ```

pub mod inventory;
pub mod orders;
pub mod preorders;
pub mod refunds;
pub mod subscribers;

use std::time::Duration;

use qyve_core::CurrencyCode;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use inventory::{InventoryRepository, StockUpdateError};
pub use orders::OrderRepository;
pub use preorders::PreorderRepository;
pub use refunds::RefundRepository;
pub use subscribers::SubscriberRepository;

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

    /// The change conflicts with the row's current state (e.g. an illegal
    /// status transition).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Parse a stored currency code.
pub(crate) fn parse_currency(code: &str) -> Result<CurrencyCode, RepositoryError> {
    code.parse().map_err(RepositoryError::DataCorruption)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
