//! Customer refund requests.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use qyve_core::Email;

use super::{parse_email, required_text};
use crate::db::{OrderRepository, RefundRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiQuery};
use crate::models::order::Order;
use crate::models::refund::{EligibilityReport, NewRefundRequest, RefundRequest};
use crate::state::AppState;

const MAX_REASON_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2_000;

#[derive(Debug, Deserialize)]
pub struct CreateRefundRequest {
    pub order_number: String,
    pub customer_email: String,
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EligibilityQuery {
    pub order_number: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub email: String,
}

/// Load an order the given customer owns.
///
/// A mismatched email is reported as not found.
async fn owned_order(state: &AppState, order_number: &str, email: &Email) -> Result<Order> {
    OrderRepository::new(state.pool())
        .find_by_number(order_number.trim())
        .await?
        .filter(|order| &order.customer_email == email)
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

fn limit_len(value: String, max: usize, field: &str) -> Result<String> {
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value)
}

/// Open a refund request for a delivered order.
///
/// Refused with `400` outside the refund window or before delivery, and
/// with `409` when this customer already asked for this order.
#[instrument(skip(state, request), fields(order_number = %request.order_number))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateRefundRequest>,
) -> Result<(StatusCode, Json<RefundRequest>)> {
    let email = parse_email(&request.customer_email)?;
    let reason = limit_len(required_text(&request.reason, "reason")?, MAX_REASON_LEN, "reason")?;
    let description = request
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .map(|d| limit_len(d, MAX_DESCRIPTION_LEN, "description"))
        .transpose()?;

    let order = owned_order(&state, &request.order_number, &email).await?;

    let refunds = RefundRepository::new(state.pool());
    let existing = refunds.exists(order.id, &email).await?;
    state
        .refund_policy()
        .check(order.delivered_at, Utc::now(), existing)?;

    let refund = refunds
        .create(&NewRefundRequest {
            order_id: order.id,
            customer_email: email,
            reason,
            description,
        })
        .await?;

    tracing::info!(
        refund_id = %refund.id,
        order_number = %refund.order_number,
        "Refund request created"
    );
    add_breadcrumb("refund", "Refund requested", &[("order_number", refund.order_number.as_str())]);

    if let Some(mailer) = state.email()
        && let Err(e) = mailer.send_refund_received(&refund).await
    {
        tracing::warn!(refund_id = %refund.id, error = %e, "Failed to send refund acknowledgement");
    }

    Ok((StatusCode::CREATED, Json(refund)))
}

/// Whether the customer could open a refund request right now, and why not.
#[instrument(skip(state, query), fields(order_number = %query.order_number))]
pub async fn eligibility(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EligibilityQuery>,
) -> Result<Json<EligibilityReport>> {
    let email = parse_email(&query.email)?;
    let order = owned_order(&state, &query.order_number, &email).await?;
    let existing = RefundRepository::new(state.pool())
        .exists(order.id, &email)
        .await?;

    let policy = state.refund_policy();
    Ok(Json(EligibilityReport {
        order_number: order.order_number,
        window_days: policy.window_days,
        eligibility: policy.evaluate(order.delivered_at, Utc::now(), existing),
    }))
}

/// A customer's refund requests, newest first.
#[instrument(skip(state, query))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<RefundRequest>>> {
    let email = parse_email(&query.email)?;
    let requests = RefundRepository::new(state.pool())
        .list_by_email(&email)
        .await?;
    Ok(Json(requests))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_len() {
        assert!(limit_len("a".repeat(MAX_REASON_LEN), MAX_REASON_LEN, "reason").is_ok());
        assert!(limit_len("a".repeat(MAX_REASON_LEN + 1), MAX_REASON_LEN, "reason").is_err());
    }

    #[test]
    fn test_request_shape() {
        let body: CreateRefundRequest = serde_json::from_str(
            r#"{"order_number":"QY-20261018-AB12CD","customer_email":"rani@example.com","reason":"Too small"}"#,
        )
        .unwrap();
        assert!(body.description.is_none());
        assert_eq!(body.reason, "Too small");
    }
}
