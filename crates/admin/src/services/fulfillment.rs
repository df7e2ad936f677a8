//! Automated fulfilment: order, rates, label, shipped.
//!
//! 1. Load the order and claim it under a row lock (paid/processing only)
//! 2. Size the parcel from the products' weights
//! 3. Quote rates from the warehouse to the customer
//! 4. Pick a rate (request override, else configured preference)
//! 5. Buy the label
//! 6. Persist carrier and tracking, move the order to `shipped`
//! 7. Email the customer (best-effort)
//!
//! Steps 3 and 5 call the provider once each. The claim keeps a second run
//! for the same order from buying another label; it is released if the run
//! fails before step 5 and cleared when the order is marked shipped.

use serde::Serialize;

use qyve_core::OrderId;
use qyve_core::shipping::{Parcel, RatePreference, ShippingRate, select_rate};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::models::order::{Order, Shipment};
use crate::shipping::{Label, ShippingError};
use crate::state::AppState;

/// What the pipeline did.
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentOutcome {
    pub order: Order,
    pub rate: ShippingRate,
    pub label: Label,
    pub notification_sent: bool,
}

/// Grams to parcel weight, saturating for absurd orders.
fn parcel_for(weight_grams: i64) -> Parcel {
    Parcel::for_items(u32::try_from(weight_grams.max(0)).unwrap_or(u32::MAX))
}

/// Run the pipeline for one order.
///
/// # Errors
///
/// - `AppError::ServiceUnavailable` if the shipping provider is not configured
/// - `AppError::NotFound` if the order does not exist
/// - `AppError::Conflict` if the order is not paid/processing or another
///   run is already fulfilling it
/// - `AppError::Shipping` if quoting or the label purchase fails
#[tracing::instrument(skip(state, preference), fields(order_number))]
pub async fn fulfill_order(
    state: &AppState,
    order_id: OrderId,
    preference: Option<RatePreference>,
) -> Result<FulfillmentOutcome> {
    let (Some(client), Some(shipping)) = (state.shipping(), state.config().shipping.as_ref())
    else {
        return Err(AppError::ServiceUnavailable(
            "shipping provider is not configured".to_string(),
        ));
    };

    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    tracing::Span::current().record("order_number", order.order_number.as_str());

    orders.claim_fulfillment(order_id).await?;

    let purchase = async {
        let parcel = parcel_for(orders.weight_grams(order_id).await?);
        let rates = client
            .quote(&shipping.origin, &order.shipping_address, &parcel)
            .await?;

        let preference = preference.unwrap_or_else(|| shipping.preference.clone());
        let rate = select_rate(&rates, &preference).cloned().ok_or_else(|| {
            ShippingError::NoRates("no carrier quoted this shipment".to_string())
        })?;

        let label = client.purchase_label(&rate.rate_id).await?;
        Ok::<_, AppError>((rate, label))
    };
    let (rate, label) = match purchase.await {
        Ok(bought) => bought,
        Err(e) => {
            if let Err(release) = orders.release_fulfillment(order_id).await {
                tracing::warn!(error = %release, "Failed to release fulfilment claim");
            }
            return Err(e);
        }
    };

    let shipment = Shipment {
        carrier: rate.carrier.clone(),
        service_level: rate.service.clone(),
        tracking_number: label.tracking_number.clone(),
        label_url: label.label_url.clone(),
    };
    let order = match orders.mark_shipped(order_id, &shipment).await {
        Ok(order) => order,
        Err(e) => {
            // Label is already paid for; the claim stays so no run buys another
            tracing::error!(
                order_number = %order.order_number,
                tracking_number = %label.tracking_number,
                transaction_id = %label.transaction_id,
                error = %e,
                "Label purchased but order could not be marked shipped"
            );
            return Err(e.into());
        }
    };

    tracing::info!(
        order_number = %order.order_number,
        carrier = %rate.carrier,
        service = %rate.service,
        tracking_number = %label.tracking_number,
        "Order fulfilled"
    );

    let mut notification_sent = false;
    if let Some(mailer) = state.email() {
        match mailer.send_shipping_notification(&order).await {
            Ok(()) => notification_sent = true,
            Err(e) => tracing::warn!(
                order_number = %order.order_number,
                error = %e,
                "Failed to send shipping notification"
            ),
        }
    }

    Ok(FulfillmentOutcome {
        order,
        rate,
        label,
        notification_sent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parcel_weight_is_clamped() {
        assert_eq!(parcel_for(-5).weight_grams, Parcel::MIN_WEIGHT_GRAMS);
        assert_eq!(parcel_for(1_200).weight_grams, 1_200);
        assert_eq!(parcel_for(i64::MAX).weight_grams, u32::MAX);
    }
}
