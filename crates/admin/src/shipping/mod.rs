//! Carrier aggregator client for rates, labels and tracking.
//!
//! Speaks the Shippo-style REST API: one shipment request returns every
//! carrier's rates, a transaction buys the label for one rate, and tracks
//! report where a parcel is.
//!
//! # API Reference
//!
//! - Base URL: `https://api.goshippo.com` (override with `SHIPPING_API_URL`)
//! - Authentication: `Authorization: ShippoToken <token>`
//! - `POST /shipments/` - rates for an origin/destination/parcel
//! - `POST /transactions/` - purchase a label for a rate
//! - `GET /tracks/{carrier}/{tracking_number}` - tracking status
//!
//! Calls are made once with a 30 second timeout. There is no retry, circuit
//! breaker or cache; a failure is returned to the caller as-is.

mod types;

pub use types::{Label, TrackingEvent, TrackingStatus};

use std::sync::Arc;
use std::time::Duration;

use qyve_core::shipping::{Address, Parcel, ShippingRate};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use crate::config::ShippingConfig;
use types::{
    ShipmentRequest, ShipmentResponse, TrackResponse, TransactionRequest, TransactionResponse,
    describe,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when talking to the carrier aggregator.
#[derive(Debug, Error)]
pub enum ShippingError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The API token was refused.
    #[error("Unauthorized: invalid shipping API token")]
    Unauthorized,

    /// Unknown shipment, rate or tracking number.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the provider.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// No carrier quoted the shipment.
    #[error("No rates available: {0}")]
    NoRates(String),

    /// The provider accepted the purchase but did not produce a label.
    #[error("Label purchase failed: {0}")]
    LabelFailed(String),

    /// Failed to build a URL or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Carrier aggregator API client.
#[derive(Clone)]
pub struct ShippingClient {
    inner: Arc<ShippingClientInner>,
}

struct ShippingClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ShippingClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL or token is malformed, or the HTTP
    /// client fails to build.
    pub fn new(config: &ShippingConfig) -> Result<Self, ShippingError> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| ShippingError::Parse(format!("Invalid SHIPPING_API_URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ShippingError::Parse(
                "Invalid SHIPPING_API_URL: not a base URL".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let mut auth_value =
            HeaderValue::from_str(&format!("ShippoToken {}", config.api_token.expose_secret()))
                .map_err(|e| ShippingError::Parse(format!("Invalid API token format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ShippingClientInner { client, base_url }),
        })
    }

    /// Every rate carriers quote for one parcel.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::NoRates` when the provider answers but no
    /// carrier quotes, or any transport/API error.
    #[tracing::instrument(skip(self, from, to), fields(to_city = %to.city))]
    pub async fn quote(
        &self,
        from: &Address,
        to: &Address,
        parcel: &Parcel,
    ) -> Result<Vec<ShippingRate>, ShippingError> {
        let url = self.endpoint(&["shipments", ""])?;
        let body = ShipmentRequest::new(from, to, parcel);
        let response = self.inner.client.post(url).json(&body).send().await?;
        let shipment: ShipmentResponse = handle_response(response).await?;

        if shipment.rates.is_empty() {
            let detail = describe(&shipment.messages);
            return Err(ShippingError::NoRates(if detail.is_empty() {
                "no carrier quoted this shipment".to_string()
            } else {
                detail
            }));
        }

        let rates: Vec<ShippingRate> = shipment.rates.into_iter().map(Into::into).collect();
        tracing::debug!(count = rates.len(), "Received shipping rates");
        Ok(rates)
    }

    /// Buy the label for a quoted rate.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::LabelFailed` when the provider reports a failed
    /// transaction or omits the tracking number.
    #[tracing::instrument(skip(self))]
    pub async fn purchase_label(&self, rate_id: &str) -> Result<Label, ShippingError> {
        let url = self.endpoint(&["transactions", ""])?;
        let body = TransactionRequest {
            rate: rate_id,
            label_file_type: "PDF",
            is_async: false,
        };
        let response = self.inner.client.post(url).json(&body).send().await?;
        let transaction: TransactionResponse = handle_response(response).await?;

        if !transaction.status.eq_ignore_ascii_case("SUCCESS") {
            return Err(ShippingError::LabelFailed(format!(
                "transaction {} is {}: {}",
                transaction.object_id,
                transaction.status,
                describe(&transaction.messages)
            )));
        }

        let tracking_number = transaction
            .tracking_number
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                ShippingError::LabelFailed(format!(
                    "transaction {} has no tracking number",
                    transaction.object_id
                ))
            })?;

        Ok(Label {
            transaction_id: transaction.object_id,
            tracking_number,
            tracking_url: transaction.tracking_url_provider,
            label_url: transaction.label_url,
        })
    }

    /// Current status and scan history of a parcel.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::NotFound` for an unknown tracking number, or
    /// any transport/API error.
    #[tracing::instrument(skip(self))]
    pub async fn track(
        &self,
        carrier: &str,
        tracking_number: &str,
    ) -> Result<TrackingStatus, ShippingError> {
        let url = self.endpoint(&["tracks", carrier, tracking_number])?;
        let response = self.inner.client.get(url).send().await?;
        let track: TrackResponse = handle_response(response).await?;
        Ok(track.into())
    }

    /// Append percent-encoded path segments to the base URL.
    ///
    /// An empty final segment yields the trailing slash the provider expects.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ShippingError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ShippingError::Parse("base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Handle an API response and parse JSON.
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ShippingError> {
    if response.status().is_success() {
        return response
            .json()
            .await
            .map_err(|e| ShippingError::Parse(format!("Failed to parse response: {e}")));
    }

    Err(parse_error(response).await)
}

/// Map an error response onto `ShippingError`.
async fn parse_error(response: reqwest::Response) -> ShippingError {
    let status = response.status().as_u16();

    match status {
        401 | 403 => return ShippingError::Unauthorized,
        404 => return ShippingError::NotFound(response.url().path().to_string()),
        429 => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return ShippingError::RateLimited(retry_after);
        }
        _ => {}
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    ShippingError::Api { status, message }
}

impl std::fmt::Debug for ShippingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShippingClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use qyve_core::shipping::RatePreference;
    use secrecy::SecretString;

    use super::*;

    fn config(base: &str) -> ShippingConfig {
        ShippingConfig {
            api_base_url: base.to_string(),
            api_token: SecretString::from("shippo_test_0123456789abcdef"),
            origin: Address {
                name: "QYVE".to_string(),
                company: None,
                street1: "Jl. Kemang Raya 8".to_string(),
                street2: None,
                city: "Jakarta".to_string(),
                state: None,
                postal_code: "12730".to_string(),
                country: "ID".to_string(),
                phone: None,
                email: None,
            },
            preference: RatePreference::Cheapest,
        }
    }

    #[test]
    fn test_endpoint_adds_trailing_slash() {
        let client = ShippingClient::new(&config("https://api.goshippo.com")).unwrap();
        assert_eq!(
            client.endpoint(&["shipments", ""]).unwrap().as_str(),
            "https://api.goshippo.com/shipments/"
        );
    }

    #[test]
    fn test_endpoint_encodes_tracking_segments() {
        let client = ShippingClient::new(&config("https://ship.example.com/v1")).unwrap();
        assert_eq!(
            client.endpoint(&["tracks", "jne", "AB 12/3"]).unwrap().as_str(),
            "https://ship.example.com/v1/tracks/jne/AB%2012%2F3"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            ShippingClient::new(&config("not a url")),
            Err(ShippingError::Parse(_))
        ));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = ShippingClient::new(&config("https://api.goshippo.com")).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("shippo_test"));
    }
}
