//! Pre-order writes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use qyve_core::{Money, PreorderId, PreorderStatus};

use super::RepositoryError;
use crate::models::preorder::{NewPreorder, Preorder};

#[derive(Debug, sqlx::FromRow)]
struct PreorderRow {
    id: PreorderId,
    status: PreorderStatus,
    unit_price: Decimal,
    deposit_amount: Decimal,
    created_at: DateTime<Utc>,
}

/// Repository for pre-orders.
pub struct PreorderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PreorderRepository<'a> {
    /// Create a new pre-order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a pending pre-order. Stock is not touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, preorder: &NewPreorder) -> Result<Preorder, RepositoryError> {
        let row = sqlx::query_as::<_, PreorderRow>(
            r"
            INSERT INTO preorder (
                product_id, size, customer_name, customer_email, customer_phone,
                quantity, unit_price, deposit_amount, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, status, unit_price, deposit_amount, created_at
            ",
        )
        .bind(preorder.product_id)
        .bind(&preorder.size)
        .bind(&preorder.customer_name)
        .bind(&preorder.customer_email)
        .bind(&preorder.customer_phone)
        .bind(preorder.quantity)
        .bind(preorder.unit_price.amount)
        .bind(preorder.deposit_amount.amount)
        .bind(&preorder.notes)
        .fetch_one(self.pool)
        .await?;

        Ok(into_preorder(row, preorder))
    }
}

fn into_preorder(row: PreorderRow, input: &NewPreorder) -> Preorder {
    let currency = input.unit_price.currency;
    Preorder {
        id: row.id,
        product_id: input.product_id,
        size: input.size.clone(),
        customer_name: input.customer_name.clone(),
        customer_email: input.customer_email.clone(),
        customer_phone: input.customer_phone.clone(),
        quantity: input.quantity,
        unit_price: Money::new(row.unit_price, currency),
        deposit_amount: Money::new(row.deposit_amount, currency),
        status: row.status,
        created_at: row.created_at,
    }
}
