//! Carrier aggregator wire types.
//!
//! Request bodies borrow from the core [`Address`]/[`Parcel`] types; response
//! bodies are converted into [`ShippingRate`], [`Label`] and
//! [`TrackingStatus`] before leaving this module.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use qyve_core::shipping::{Address, Parcel, ShippingRate};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ShipmentRequest<'a> {
    pub address_from: WireAddress<'a>,
    pub address_to: WireAddress<'a>,
    pub parcels: [WireParcel; 1],
    /// Ask for rates inline rather than via a webhook.
    #[serde(rename = "async")]
    pub is_async: bool,
}

impl<'a> ShipmentRequest<'a> {
    pub(crate) fn new(from: &'a Address, to: &'a Address, parcel: &Parcel) -> Self {
        Self {
            address_from: WireAddress::from(from),
            address_to: WireAddress::from(to),
            parcels: [WireParcel::from(parcel)],
            is_async: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WireAddress<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    company: Option<&'a str>,
    street1: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    street2: Option<&'a str>,
    city: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    zip: &'a str,
    country: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

impl<'a> From<&'a Address> for WireAddress<'a> {
    fn from(address: &'a Address) -> Self {
        Self {
            name: &address.name,
            company: address.company.as_deref(),
            street1: &address.street1,
            street2: address.street2.as_deref(),
            city: &address.city,
            state: address.state.as_deref(),
            zip: &address.postal_code,
            country: &address.country,
            phone: address.phone.as_deref(),
            email: address.email.as_deref(),
        }
    }
}

/// Dimensions are sent as strings, as the provider expects.
#[derive(Debug, Serialize)]
pub(crate) struct WireParcel {
    length: String,
    width: String,
    height: String,
    distance_unit: &'static str,
    weight: String,
    mass_unit: &'static str,
}

impl From<&Parcel> for WireParcel {
    fn from(parcel: &Parcel) -> Self {
        Self {
            length: parcel.length_cm.to_string(),
            width: parcel.width_cm.to_string(),
            height: parcel.height_cm.to_string(),
            distance_unit: "cm",
            weight: parcel.weight_grams.to_string(),
            mass_unit: "g",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TransactionRequest<'a> {
    pub rate: &'a str,
    pub label_file_type: &'static str,
    #[serde(rename = "async")]
    pub is_async: bool,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct ShipmentResponse {
    #[serde(default)]
    pub rates: Vec<WireRate>,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRate {
    object_id: String,
    provider: String,
    servicelevel: WireServiceLevel,
    amount: Decimal,
    currency: String,
    #[serde(default)]
    estimated_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireServiceLevel {
    #[serde(default)]
    name: Option<String>,
    token: String,
}

impl From<WireRate> for ShippingRate {
    fn from(rate: WireRate) -> Self {
        Self {
            rate_id: rate.object_id,
            carrier: rate.provider.to_lowercase(),
            service: rate.servicelevel.token,
            amount: rate.amount,
            currency: rate.currency,
            estimated_days: rate.estimated_days,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Join provider messages into one line for errors and logs.
pub(crate) fn describe(messages: &[WireMessage]) -> String {
    messages
        .iter()
        .map(|m| match &m.source {
            Some(source) => format!("{source}: {}", m.text),
            None => m.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionResponse {
    pub object_id: String,
    pub status: String,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_url_provider: Option<String>,
    #[serde(default)]
    pub label_url: Option<String>,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackResponse {
    carrier: String,
    tracking_number: String,
    #[serde(default)]
    eta: Option<DateTime<Utc>>,
    #[serde(default)]
    tracking_status: Option<WireTrackingEvent>,
    #[serde(default)]
    tracking_history: Vec<WireTrackingEvent>,
}

#[derive(Debug, Deserialize)]
struct WireTrackingEvent {
    status: String,
    #[serde(default)]
    status_details: Option<String>,
    #[serde(default)]
    status_date: Option<DateTime<Utc>>,
    #[serde(default)]
    location: Option<WireLocation>,
}

#[derive(Debug, Deserialize)]
struct WireLocation {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl From<WireTrackingEvent> for TrackingEvent {
    fn from(event: WireTrackingEvent) -> Self {
        let location = event.location.and_then(|l| match (l.city, l.country) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (Some(place), None) | (None, Some(place)) => Some(place),
            (None, None) => None,
        });
        Self {
            status: event.status.to_lowercase(),
            details: event.status_details,
            occurred_at: event.status_date,
            location,
        }
    }
}

impl From<TrackResponse> for TrackingStatus {
    fn from(response: TrackResponse) -> Self {
        let current = response.tracking_status.map(TrackingEvent::from);
        Self {
            carrier: response.carrier,
            tracking_number: response.tracking_number,
            status: current
                .as_ref()
                .map_or_else(|| "unknown".to_string(), |e| e.status.clone()),
            eta: response.eta,
            current,
            history: response
                .tracking_history
                .into_iter()
                .map(TrackingEvent::from)
                .collect(),
        }
    }
}

// =============================================================================
// Public results
// =============================================================================

/// A purchased shipping label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub transaction_id: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub label_url: Option<String>,
}

/// Where a parcel is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingStatus {
    pub carrier: String,
    pub tracking_number: String,
    /// Lower-cased provider status, e.g. `transit`, `delivered`; `unknown`
    /// before the carrier's first scan.
    pub status: String,
    pub eta: Option<DateTime<Utc>>,
    pub current: Option<TrackingEvent>,
    pub history: Vec<TrackingEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingEvent {
    pub status: String,
    pub details: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            name: "Rani".to_string(),
            company: None,
            street1: "Jl. Sudirman 1".to_string(),
            street2: None,
            city: "Jakarta".to_string(),
            state: Some("DKI Jakarta".to_string()),
            postal_code: "10220".to_string(),
            country: "ID".to_string(),
            phone: None,
            email: None,
        }
    }

    #[test]
    fn test_shipment_request_shape() {
        let from = address();
        let to = address();
        let body = serde_json::to_value(ShipmentRequest::new(&from, &to, &Parcel::for_items(900)))
            .unwrap();

        assert_eq!(body["async"], false);
        assert_eq!(body["address_to"]["zip"], "10220");
        assert!(body["address_to"].get("company").is_none());
        assert_eq!(body["parcels"][0]["weight"], "900");
        assert_eq!(body["parcels"][0]["mass_unit"], "g");
        assert_eq!(body["parcels"][0]["distance_unit"], "cm");
    }

    #[test]
    fn test_rates_convert_from_provider_json() {
        let json = r#"{
            "object_id": "shp_1",
            "status": "SUCCESS",
            "rates": [
                {
                    "object_id": "rate_jne_reg",
                    "provider": "JNE",
                    "servicelevel": { "name": "Reguler", "token": "jne_reg" },
                    "amount": "18000.00",
                    "currency": "IDR",
                    "estimated_days": 3
                },
                {
                    "object_id": "rate_sicepat",
                    "provider": "SiCepat",
                    "servicelevel": { "token": "sicepat_best" },
                    "amount": "22000",
                    "currency": "IDR"
                }
            ],
            "messages": []
        }"#;

        let response: ShipmentResponse = serde_json::from_str(json).unwrap();
        let rates: Vec<ShippingRate> = response.rates.into_iter().map(Into::into).collect();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].rate_id, "rate_jne_reg");
        assert_eq!(rates[0].carrier, "jne");
        assert_eq!(rates[0].service, "jne_reg");
        assert_eq!(rates[0].amount, Decimal::new(18_000, 0));
        assert_eq!(rates[0].estimated_days, Some(3));
        assert_eq!(rates[1].estimated_days, None);
    }

    #[test]
    fn test_transaction_error_messages() {
        let json = r#"{
            "object_id": "txn_1",
            "status": "ERROR",
            "messages": [{ "source": "JNE", "text": "Destination not serviced" }]
        }"#;
        let response: TransactionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, "ERROR");
        assert_eq!(describe(&response.messages), "JNE: Destination not serviced");
    }

    #[test]
    fn test_tracking_converts_status_and_history() {
        let json = r#"{
            "carrier": "jne",
            "tracking_number": "JNE123",
            "eta": null,
            "tracking_status": {
                "status": "TRANSIT",
                "status_details": "Arrived at sorting center",
                "status_date": "2026-10-17T08:00:00Z",
                "location": { "city": "Bandung", "country": "ID" }
            },
            "tracking_history": [
                { "status": "PRE_TRANSIT", "status_date": "2026-10-16T10:00:00Z" },
                { "status": "TRANSIT", "location": { "city": "Bandung" } }
            ]
        }"#;
        let status: TrackingStatus = serde_json::from_str::<TrackResponse>(json).unwrap().into();

        assert_eq!(status.status, "transit");
        assert_eq!(
            status.current.as_ref().unwrap().location.as_deref(),
            Some("Bandung, ID")
        );
        assert_eq!(status.history.len(), 2);
        assert_eq!(status.history[0].status, "pre_transit");
        assert_eq!(status.history[1].location.as_deref(), Some("Bandung"));
    }

    #[test]
    fn test_tracking_without_scan_is_unknown() {
        let json = r#"{ "carrier": "jne", "tracking_number": "JNE123" }"#;
        let status: TrackingStatus = serde_json::from_str::<TrackResponse>(json).unwrap().into();
        assert_eq!(status.status, "unknown");
        assert!(status.history.is_empty());
    }
}
