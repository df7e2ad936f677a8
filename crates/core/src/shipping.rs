//! Shipping addresses, parcels and carrier rate selection.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A postal address as sent to the carrier aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    pub street1: String,
    #[serde(default)]
    pub street2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Address {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.as_str()),
            ("street1", self.street1.as_str()),
            ("city", self.city.as_str()),
            ("postal_code", self.postal_code.as_str()),
            ("country", self.country.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

/// Parcel dimensions in centimetres and weight in grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub length_cm: u32,
    pub width_cm: u32,
    pub height_cm: u32,
    pub weight_grams: u32,
}

impl Parcel {
    /// Carriers reject parcels lighter than this.
    pub const MIN_WEIGHT_GRAMS: u32 = 100;

    /// Standard apparel mailer box.
    pub const DEFAULT_BOX: Self = Self {
        length_cm: 35,
        width_cm: 25,
        height_cm: 12,
        weight_grams: Self::MIN_WEIGHT_GRAMS,
    };

    /// The default box carrying `total_weight_grams` of goods.
    #[must_use]
    pub fn for_items(total_weight_grams: u32) -> Self {
        Self {
            weight_grams: total_weight_grams.max(Self::MIN_WEIGHT_GRAMS),
            ..Self::DEFAULT_BOX
        }
    }
}

/// One priced service offered by a carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    /// Provider id used to purchase a label.
    pub rate_id: String,
    /// Carrier name, e.g. `jne`.
    pub carrier: String,
    /// Service level, e.g. `reg`.
    pub service: String,
    pub amount: Decimal,
    pub currency: String,
    /// Estimated transit days, if the carrier publishes one.
    #[serde(default)]
    pub estimated_days: Option<u32>,
}

/// How to choose among the returned rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RatePreference {
    /// Lowest price.
    #[default]
    Cheapest,
    /// A specific carrier, optionally a specific service. Falls back to the
    /// cheapest rate when the carrier does not quote.
    Carrier {
        carrier: String,
        #[serde(default)]
        service: Option<String>,
    },
}

/// Orders rates by price, then transit estimate (unknown last), then carrier.
fn compare_rates(a: &ShippingRate, b: &ShippingRate) -> Ordering {
    a.amount
        .cmp(&b.amount)
        .then_with(|| match (a.estimated_days, b.estimated_days) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.carrier.cmp(&b.carrier))
        .then_with(|| a.service.cmp(&b.service))
}

/// Pick a rate according to `preference`.
///
/// Returns `None` only when `rates` is empty.
#[must_use]
pub fn select_rate<'a>(
    rates: &'a [ShippingRate],
    preference: &RatePreference,
) -> Option<&'a ShippingRate> {
    let cheapest = || rates.iter().min_by(|a, b| compare_rates(a, b));

    match preference {
        RatePreference::Cheapest => cheapest(),
        RatePreference::Carrier { carrier, service } => rates
            .iter()
            .filter(|rate| rate.carrier.eq_ignore_ascii_case(carrier))
            .filter(|rate| {
                service
                    .as_deref()
                    .is_none_or(|wanted| rate.service.eq_ignore_ascii_case(wanted))
            })
            .min_by(|a, b| compare_rates(a, b))
            .or_else(cheapest),
    }
}
