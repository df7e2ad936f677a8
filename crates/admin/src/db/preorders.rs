//! Pre-order management.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use qyve_core::{Email, Money, PreorderId, PreorderStatus, ProductId};

use super::{RepositoryError, parse_currency};
use crate::models::preorder::Preorder;

#[derive(Debug, sqlx::FromRow)]
struct PreorderRow {
    id: PreorderId,
    product_id: ProductId,
    product_name: String,
    currency: String,
    size: String,
    customer_name: String,
    customer_email: Email,
    customer_phone: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    deposit_amount: Decimal,
    status: PreorderStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PreorderRow> for Preorder {
    type Error = RepositoryError;

    fn try_from(row: PreorderRow) -> Result<Self, Self::Error> {
        let currency = parse_currency(&row.currency)?;
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            size: row.size,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            quantity: row.quantity,
            unit_price: Money::new(row.unit_price, currency),
            deposit_amount: Money::new(row.deposit_amount, currency),
            status: row.status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PREORDER_SELECT: &str = r"
    SELECT
        po.id, po.product_id, p.name AS product_name, p.currency, po.size,
        po.customer_name, po.customer_email, po.customer_phone, po.quantity,
        po.unit_price, po.deposit_amount, po.status, po.notes,
        po.created_at, po.updated_at
    FROM preorder po
    JOIN product p ON p.id = po.product_id
";

/// Repository for pre-orders.
pub struct PreorderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PreorderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is malformed.
    pub async fn list(
        &self,
        status: Option<PreorderStatus>,
    ) -> Result<Vec<Preorder>, RepositoryError> {
        let rows = sqlx::query_as::<_, PreorderRow>(&format!(
            "{PREORDER_SELECT} WHERE $1::preorder_status IS NULL OR po.status = $1 ORDER BY po.created_at DESC, po.id DESC"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Preorder::try_from).collect()
    }

    /// Move a pre-order to `next`, optionally replacing its notes.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` if the pre-order does not exist
    /// - `RepositoryError::Conflict` if the transition is not allowed
    pub async fn update_status(
        &self,
        id: PreorderId,
        next: PreorderStatus,
        notes: Option<&str>,
    ) -> Result<Preorder, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (current,): (PreorderStatus,) =
            sqlx::query_as("SELECT status FROM preorder WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "cannot move pre-order from {current} to {next}"
            )));
        }

        sqlx::query(
            r"
            UPDATE preorder
            SET status = $2, notes = COALESCE($3, notes), updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(next)
        .bind(notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let row = sqlx::query_as::<_, PreorderRow>(&format!("{PREORDER_SELECT} WHERE po.id = $1"))
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Preorder::try_from(row)
    }
}
