//! Newsletter subscribe and unsubscribe.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::parse_email;
use crate::db::NewsletterRepository;
use crate::error::Result;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    /// Where the signup happened, e.g. `footer` or `drop-page`.
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub email: String,
    pub subscribed: bool,
    pub message: &'static str,
}

/// Subscribe an address. Subscribing twice succeeds without side effects.
#[instrument(skip(state, request))]
pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubscribeRequest>,
) -> Result<Json<SubscriptionResponse>> {
    let email = parse_email(&request.email)?;
    let source = request
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let (subscriber, outcome) = NewsletterRepository::new(state.pool())
        .subscribe(&email, source)
        .await?;
    tracing::info!(email = %email.masked(), ?outcome, "Newsletter subscribe");

    if outcome.is_new()
        && let Some(mailer) = state.email()
        && let Err(e) = mailer.send_newsletter_welcome(&subscriber.email).await
    {
        tracing::warn!(email = %email.masked(), error = %e, "Failed to send newsletter welcome");
    }

    let message = if outcome.is_new() {
        "Thanks for subscribing!"
    } else {
        "You're already subscribed."
    };
    Ok(Json(SubscriptionResponse {
        email: subscriber.email.into_inner(),
        subscribed: true,
        message,
    }))
}

/// Unsubscribe an address. Unknown addresses get the same response.
#[instrument(skip(state, request))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UnsubscribeRequest>,
) -> Result<Json<SubscriptionResponse>> {
    let email = parse_email(&request.email)?;
    let found = NewsletterRepository::new(state.pool())
        .unsubscribe(&email)
        .await?;
    tracing::info!(email = %email.masked(), found, "Newsletter unsubscribe");

    Ok(Json(SubscriptionResponse {
        email: email.into_inner(),
        subscribed: false,
        message: "You have been unsubscribed.",
    }))
}
