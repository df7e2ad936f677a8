//! Refund request review.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use qyve_core::{Email, Money, OrderId, OrderStatus, RefundRequestId, RefundStatus};

use super::{RepositoryError, parse_currency};
use crate::models::refund::{RefundRequest, RefundReview};

#[derive(Debug, sqlx::FromRow)]
struct RefundRow {
    id: RefundRequestId,
    order_id: OrderId,
    order_number: String,
    customer_name: String,
    customer_email: Email,
    order_total: Decimal,
    currency: String,
    reason: String,
    description: Option<String>,
    status: RefundStatus,
    admin_notes: Option<String>,
    refund_amount: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RefundRow> for RefundRequest {
    type Error = RepositoryError;

    fn try_from(row: RefundRow) -> Result<Self, Self::Error> {
        let currency = parse_currency(&row.currency)?;
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            order_number: row.order_number,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            order_total: Money::new(row.order_total, currency),
            reason: row.reason,
            description: row.description,
            status: row.status,
            admin_notes: row.admin_notes,
            refund_amount: row.refund_amount.map(|amount| Money::new(amount, currency)),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const REFUND_SELECT: &str = r"
    SELECT
        r.id, r.order_id, o.order_number, o.customer_name, r.customer_email,
        o.total AS order_total, o.currency, r.reason, r.description, r.status,
        r.admin_notes, r.refund_amount, r.created_at, r.updated_at
    FROM refund_request r
    JOIN customer_order o ON o.id = r.order_id
";

/// Repository for refund review.
pub struct RefundRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RefundRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Requests oldest first so the review queue reads top-down.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is malformed.
    pub async fn list(
        &self,
        status: Option<RefundStatus>,
    ) -> Result<Vec<RefundRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, RefundRow>(&format!(
            "{REFUND_SELECT} WHERE $1::refund_status IS NULL OR r.status = $1 ORDER BY r.created_at, r.id"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(RefundRequest::try_from).collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or the row is malformed.
    pub async fn get(&self, id: RefundRequestId) -> Result<Option<RefundRequest>, RepositoryError> {
        let row = sqlx::query_as::<_, RefundRow>(&format!("{REFUND_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(RefundRequest::try_from).transpose()
    }

    /// Record a reviewer's decision.
    ///
    /// Processing a refund also marks the order's payment refunded and, when
    /// the order status allows it, moves the order to `refunded`.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` if the request does not exist
    /// - `RepositoryError::Conflict` if the status change is not allowed
    pub async fn review(
        &self,
        id: RefundRequestId,
        review: &RefundReview,
    ) -> Result<RefundRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (current, order_id): (RefundStatus, OrderId) =
            sqlx::query_as("SELECT status, order_id FROM refund_request WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(review.status) {
            return Err(RepositoryError::Conflict(format!(
                "cannot move refund request from {current} to {}",
                review.status
            )));
        }

        sqlx::query(
            r"
            UPDATE refund_request
            SET status = $2,
                admin_notes = COALESCE($3, admin_notes),
                refund_amount = COALESCE($4, refund_amount),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(review.status)
        .bind(review.admin_notes.as_deref())
        .bind(review.refund_amount.map(|m| m.amount))
        .execute(&mut *tx)
        .await?;

        if review.status == RefundStatus::Processed {
            let (order_status,): (OrderStatus,) =
                sqlx::query_as("SELECT status FROM customer_order WHERE id = $1 FOR UPDATE")
                    .bind(order_id)
                    .fetch_one(&mut *tx)
                    .await?;

            let next_status = if order_status.can_transition_to(OrderStatus::Refunded) {
                OrderStatus::Refunded
            } else {
                tracing::warn!(
                    order_id = %order_id,
                    status = %order_status,
                    "Refund processed for an order that cannot move to refunded"
                );
                order_status
            };

            sqlx::query(
                r"
                UPDATE customer_order
                SET status = $2, payment_status = 'refunded', updated_at = NOW()
                WHERE id = $1
                ",
            )
            .bind(order_id)
            .bind(next_status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            refund_id = %id,
            from = %current,
            to = %review.status,
            "Refund request reviewed"
        );

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }
}
