//! Refund request writes and customer lookups.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use qyve_core::{Email, OrderId, RefundRequestId, RefundStatus};

use super::RepositoryError;
use crate::models::refund::{NewRefundRequest, RefundRequest};

#[derive(Debug, sqlx::FromRow)]
struct RefundRow {
    id: RefundRequestId,
    order_id: OrderId,
    order_number: String,
    customer_email: Email,
    reason: String,
    description: Option<String>,
    status: RefundStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RefundRow> for RefundRequest {
    fn from(row: RefundRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            order_number: row.order_number,
            customer_email: row.customer_email,
            reason: row.reason,
            description: row.description,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for refund requests.
pub struct RefundRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RefundRepository<'a> {
    /// Create a new refund repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether this customer already has a request for the order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, order_id: OrderId, email: &Email) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS (
                SELECT 1 FROM refund_request
                WHERE order_id = $1 AND customer_email = $2
            )
            ",
        )
        .bind(order_id)
        .bind(email)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Record a new pending refund request.
    ///
    /// The `(order_id, customer_email)` unique constraint backs up the
    /// eligibility check when two requests race.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::Conflict` if a request already exists
    /// - `RepositoryError::Database` for other failures
    pub async fn create(&self, request: &NewRefundRequest) -> Result<RefundRequest, RepositoryError> {
        let row = sqlx::query_as::<_, RefundRow>(
            r"
            WITH inserted AS (
                INSERT INTO refund_request (order_id, customer_email, reason, description)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, customer_email, reason, description,
                          status, created_at, updated_at
            )
            SELECT i.id, i.order_id, o.order_number, i.customer_email, i.reason,
                   i.description, i.status, i.created_at, i.updated_at
            FROM inserted i
            JOIN customer_order o ON o.id = i.order_id
            ",
        )
        .bind(request.order_id)
        .bind(&request.customer_email)
        .bind(&request.reason)
        .bind(&request.description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_insert(e, "a refund request already exists for this order")
        })?;

        Ok(row.into())
    }

    /// All requests made by one customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_email(&self, email: &Email) -> Result<Vec<RefundRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, RefundRow>(
            r"
            SELECT r.id, r.order_id, o.order_number, r.customer_email, r.reason,
                   r.description, r.status, r.created_at, r.updated_at
            FROM refund_request r
            JOIN customer_order o ON o.id = r.order_id
            WHERE r.customer_email = $1
            ORDER BY r.created_at DESC
            ",
        )
        .bind(email)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
