//! Integration checks for operators.

use std::time::Instant;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use qyve_core::Email;
use qyve_core::shipping::{Parcel, RatePreference, ShippingRate, select_rate};

use super::shipping::provider;
use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TestEmailRequest {
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct TestEmailResponse {
    pub sent_to: String,
}

#[derive(Debug, Serialize)]
pub struct ShippingProbe {
    pub rate_count: usize,
    pub cheapest: Option<ShippingRate>,
    pub elapsed_ms: u64,
}

/// Send a test message through the configured SMTP relay.
#[instrument(skip(state, request))]
pub async fn test_email(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TestEmailRequest>,
) -> Result<Json<TestEmailResponse>> {
    let mailer = state.email().ok_or_else(|| {
        AppError::ServiceUnavailable("email is not configured".to_string())
    })?;
    let to = Email::parse(request.to.trim())
        .map_err(|e| AppError::BadRequest(format!("invalid recipient: {e}")))?;

    mailer.send_test(&to).await?;
    tracing::info!(to = %to.masked(), "Test email sent");

    Ok(Json(TestEmailResponse {
        sent_to: to.masked(),
    }))
}

/// Quote a default box from the warehouse to itself.
#[instrument(skip(state))]
pub async fn shipping_probe(State(state): State<AppState>) -> Result<Json<ShippingProbe>> {
    let (client, config) = provider(&state)?;

    let started = Instant::now();
    let rates = client
        .quote(&config.origin, &config.origin, &Parcel::DEFAULT_BOX)
        .await?;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let cheapest = select_rate(&rates, &RatePreference::Cheapest).cloned();
    tracing::info!(rate_count = rates.len(), elapsed_ms, "Shipping provider probe succeeded");

    Ok(Json(ShippingProbe {
        rate_count: rates.len(),
        cheapest,
        elapsed_ms,
    }))
}
