//! Refund request models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qyve_core::{Email, Money, OrderId, RefundRequestId, RefundStatus};

/// A refund request as seen by a reviewer.
#[derive(Debug, Clone, Serialize)]
pub struct RefundRequest {
    pub id: RefundRequestId,
    pub order_id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub order_total: Money,
    pub reason: String,
    pub description: Option<String>,
    pub status: RefundStatus,
    pub admin_notes: Option<String>,
    pub refund_amount: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reviewer's decision.
#[derive(Debug, Clone)]
pub struct RefundReview {
    pub status: RefundStatus,
    pub admin_notes: Option<String>,
    pub refund_amount: Option<Money>,
}
