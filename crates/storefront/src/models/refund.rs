//! Refund request models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qyve_core::refund::RefundEligibility;
use qyve_core::{Email, OrderId, RefundRequestId, RefundStatus};

/// A customer's refund request as shown back to them.
#[derive(Debug, Clone, Serialize)]
pub struct RefundRequest {
    pub id: RefundRequestId,
    pub order_id: OrderId,
    pub order_number: String,
    pub customer_email: Email,
    pub reason: String,
    pub description: Option<String>,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new refund request.
#[derive(Debug, Clone)]
pub struct NewRefundRequest {
    pub order_id: OrderId,
    pub customer_email: Email,
    pub reason: String,
    pub description: Option<String>,
}

/// Response body for the eligibility endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EligibilityReport {
    pub order_number: String,
    pub window_days: i64,
    #[serde(flatten)]
    pub eligibility: RefundEligibility,
}
