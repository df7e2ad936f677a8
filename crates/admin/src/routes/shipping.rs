//! Shipping route handlers: quotes, labels, tracking and fulfilment.

use axum::{Json, body::Bytes, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use qyve_core::OrderId;
use qyve_core::shipping::{Address, Parcel, RatePreference, ShippingRate, select_rate};

use crate::config::ShippingConfig;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::services::fulfillment::{FulfillmentOutcome, fulfill_order};
use crate::shipping::{Label, ShippingClient, TrackingStatus};
use crate::state::AppState;

/// The configured client, or `503`.
pub(super) fn provider(state: &AppState) -> Result<(&ShippingClient, &ShippingConfig)> {
    match (state.shipping(), state.config().shipping.as_ref()) {
        (Some(client), Some(config)) => Ok((client, config)),
        _ => Err(AppError::ServiceUnavailable(
            "shipping provider is not configured".to_string(),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub to: Address,
    /// Used with the default box when no parcel is given.
    #[serde(default)]
    pub weight_grams: Option<u32>,
    #[serde(default)]
    pub parcel: Option<Parcel>,
    #[serde(default)]
    pub preference: Option<RatePreference>,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub rates: Vec<ShippingRate>,
    pub selected: Option<ShippingRate>,
}

#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    pub rate_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FulfillRequest {
    #[serde(default)]
    pub preference: Option<RatePreference>,
}

fn parcel_from(request: &RateRequest) -> Result<Parcel> {
    let parcel = match (request.parcel, request.weight_grams) {
        (Some(parcel), _) => parcel,
        (None, Some(weight)) => Parcel::for_items(weight),
        (None, None) => {
            return Err(AppError::BadRequest(
                "either parcel or weight_grams is required".to_string(),
            ));
        }
    };

    if parcel.length_cm == 0 || parcel.width_cm == 0 || parcel.height_cm == 0 {
        return Err(AppError::BadRequest(
            "parcel dimensions must be positive".to_string(),
        ));
    }
    if parcel.weight_grams == 0 {
        return Err(AppError::BadRequest(
            "parcel weight must be positive".to_string(),
        ));
    }
    Ok(parcel)
}

/// Quote every carrier for a destination and show which rate would be picked.
#[instrument(skip(state, request), fields(to_city = %request.to.city))]
pub async fn rates(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RateRequest>,
) -> Result<Json<RateResponse>> {
    let (client, config) = provider(&state)?;

    let missing = request.to.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "destination address is missing: {}",
            missing.join(", ")
        )));
    }
    let parcel = parcel_from(&request)?;

    let rates = client.quote(&config.origin, &request.to, &parcel).await?;
    let preference = request
        .preference
        .as_ref()
        .unwrap_or(&config.preference);
    let selected = select_rate(&rates, preference).cloned();

    Ok(Json(RateResponse { rates, selected }))
}

/// Buy a label for a rate returned by [`rates`].
#[instrument(skip(state))]
pub async fn purchase_label(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LabelRequest>,
) -> Result<Json<Label>> {
    let (client, _) = provider(&state)?;
    let rate_id = request.rate_id.trim();
    if rate_id.is_empty() {
        return Err(AppError::BadRequest("rate_id is required".to_string()));
    }

    let label = client.purchase_label(rate_id).await?;
    tracing::info!(tracking_number = %label.tracking_number, "Label purchased");
    Ok(Json(label))
}

#[instrument(skip(state))]
pub async fn track(
    State(state): State<AppState>,
    ApiPath((carrier, tracking_number)): ApiPath<(String, String)>,
) -> Result<Json<TrackingStatus>> {
    let (client, _) = provider(&state)?;
    let status = client
        .track(&carrier.to_ascii_lowercase(), tracking_number.trim())
        .await?;
    Ok(Json(status))
}

/// Body is optional; an empty one uses the configured preference.
fn fulfill_request(body: &[u8]) -> Result<FulfillRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FulfillRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid fulfilment request: {e}")))
}

/// Run automated fulfilment for one order.
#[instrument(skip(state, body))]
pub async fn fulfill(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    body: Bytes,
) -> Result<Json<FulfillmentOutcome>> {
    let preference = fulfill_request(&body)?.preference;
    let outcome = fulfill_order(&state, id, preference).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(parcel: Option<Parcel>, weight_grams: Option<u32>) -> RateRequest {
        RateRequest {
            to: Address {
                name: "Sari".to_string(),
                company: None,
                street1: "Jl. Merdeka 1".to_string(),
                street2: None,
                city: "Bandung".to_string(),
                state: Some("Jawa Barat".to_string()),
                postal_code: "40111".to_string(),
                country: "ID".to_string(),
                phone: None,
                email: None,
            },
            weight_grams,
            parcel,
            preference: None,
        }
    }

    #[test]
    fn test_weight_uses_default_box() {
        let parcel = parcel_from(&request(None, Some(50))).unwrap();
        assert_eq!(parcel.length_cm, Parcel::DEFAULT_BOX.length_cm);
        assert_eq!(parcel.weight_grams, Parcel::MIN_WEIGHT_GRAMS);
    }

    #[test]
    fn test_explicit_parcel_wins() {
        let custom = Parcel {
            length_cm: 40,
            width_cm: 30,
            height_cm: 20,
            weight_grams: 2_000,
        };
        assert_eq!(parcel_from(&request(Some(custom), Some(50))).unwrap(), custom);
    }

    #[test]
    fn test_fulfill_body_is_optional() {
        assert!(fulfill_request(b"").unwrap().preference.is_none());
        let request =
            fulfill_request(br#"{"preference":{"strategy":"carrier","carrier":"jne"}}"#).unwrap();
        assert!(matches!(
            request.preference,
            Some(RatePreference::Carrier { .. })
        ));
        assert!(fulfill_request(b"{").is_err());
    }

    #[test]
    fn test_parcel_validation() {
        assert!(matches!(
            parcel_from(&request(None, None)),
            Err(AppError::BadRequest(_))
        ));
        let flat = Parcel {
            height_cm: 0,
            ..Parcel::DEFAULT_BOX
        };
        assert!(matches!(
            parcel_from(&request(Some(flat), None)),
            Err(AppError::BadRequest(_))
        ));
    }
}
