//! Refund review route handlers.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use qyve_core::{Money, RefundRequestId, RefundStatus};

use super::optional_text;
use crate::db::{RefundRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::refund::{RefundRequest, RefundReview};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RefundListQuery {
    #[serde(default)]
    pub status: Option<RefundStatus>,
}

#[derive(Debug, Deserialize)]
pub struct RefundReviewRequest {
    pub status: RefundStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub refund_amount: Option<Decimal>,
}

/// Work out the amount to record for a review.
///
/// A processed refund without an amount refunds the full order total.
fn review_amount(
    current: &RefundRequest,
    status: RefundStatus,
    requested: Option<Decimal>,
) -> Result<Option<Money>> {
    let total = current.order_total;
    let amount = match requested {
        Some(amount) => Some(amount),
        None if status == RefundStatus::Processed && current.refund_amount.is_none() => {
            Some(total.amount)
        }
        None => None,
    };

    if let Some(amount) = amount
        && (amount <= Decimal::ZERO || amount > total.amount)
    {
        return Err(AppError::BadRequest(format!(
            "refund amount must be greater than zero and at most {total}"
        )));
    }

    Ok(amount.map(|amount| Money::new(amount, total.currency)))
}

/// Review queue, oldest first.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RefundListQuery>,
) -> Result<Json<Vec<RefundRequest>>> {
    let requests = RefundRepository::new(state.pool())
        .list(query.status)
        .await?;
    Ok(Json(requests))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RefundRequestId>,
) -> Result<Json<RefundRequest>> {
    RefundRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("refund request {id}")))
}

/// Approve, reject or process a request, then tell the customer.
#[instrument(skip(state, request), fields(status = %request.status))]
pub async fn review(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RefundRequestId>,
    ApiJson(request): ApiJson<RefundReviewRequest>,
) -> Result<Json<RefundRequest>> {
    let refunds = RefundRepository::new(state.pool());
    let current = refunds
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("refund request {id}")))?;

    let review = RefundReview {
        status: request.status,
        admin_notes: optional_text(request.admin_notes),
        refund_amount: review_amount(&current, request.status, request.refund_amount)?,
    };

    let updated = refunds.review(id, &review).await.map_err(|e| match e {
        RepositoryError::NotFound => AppError::NotFound(format!("refund request {id}")),
        other => other.into(),
    })?;

    if let Some(mailer) = state.email()
        && let Err(e) = mailer.send_refund_status(&updated).await
    {
        tracing::warn!(
            refund_id = %id,
            order_number = %updated.order_number,
            error = %e,
            "Failed to send refund status email"
        );
    }

    Ok(Json(updated))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use qyve_core::{CurrencyCode, Email, OrderId};

    use super::*;

    fn request(refund_amount: Option<Decimal>) -> RefundRequest {
        RefundRequest {
            id: RefundRequestId::new(1),
            order_id: OrderId::new(9),
            order_number: "QY-000009".to_string(),
            customer_name: "Sari".to_string(),
            customer_email: Email::parse("sari@example.com").unwrap(),
            order_total: Money::new(Decimal::from(450_000), CurrencyCode::IDR),
            reason: "wrong size".to_string(),
            description: None,
            status: RefundStatus::Approved,
            admin_notes: None,
            refund_amount: refund_amount.map(|a| Money::new(a, CurrencyCode::IDR)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_processing_defaults_to_order_total() {
        let amount = review_amount(&request(None), RefundStatus::Processed, None).unwrap();
        assert_eq!(amount.unwrap().amount, Decimal::from(450_000));
    }

    #[test]
    fn test_processing_keeps_amount_set_on_approval() {
        let current = request(Some(Decimal::from(200_000)));
        let amount = review_amount(&current, RefundStatus::Processed, None).unwrap();
        assert_eq!(amount, None);
    }

    #[test]
    fn test_amount_bounds() {
        let current = request(None);
        assert!(review_amount(&current, RefundStatus::Approved, Some(Decimal::ZERO)).is_err());
        assert!(
            review_amount(&current, RefundStatus::Approved, Some(Decimal::from(450_001))).is_err()
        );
        let partial =
            review_amount(&current, RefundStatus::Approved, Some(Decimal::from(100_000))).unwrap();
        assert_eq!(partial.unwrap().currency, CurrencyCode::IDR);
    }

    #[test]
    fn test_rejection_records_no_amount() {
        assert_eq!(
            review_amount(&request(None), RefundStatus::Rejected, None).unwrap(),
            None
        );
    }
}
