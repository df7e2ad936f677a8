//! Order placement and customer order lookup.

use std::collections::HashMap;

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use qyve_core::shipping::Address;
use qyve_core::{Money, ProductId};

use super::{parse_email, required_text};
use crate::db::{OrderRepository, PlaceOrderError, ProductRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::order::{Order, OrderDraft, OrderLine};
use crate::models::product::Product;
use crate::state::AppState;

/// Most distinct product/size lines in one order.
pub const MAX_LINES: usize = 20;
/// Most units of one product size in one order.
pub const MAX_QUANTITY_PER_LINE: i32 = 10;

/// Characters used in the random part of an order number (no 0/O, 1/I).
const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ORDER_NUMBER_SUFFIX_LEN: usize = 6;
/// Attempts before giving up on a unique order number.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_email: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub shipping_address: Address,
    pub items: Vec<OrderItemRequest>,
    /// Fee for the carrier rate the customer picked at checkout. The payment
    /// provider quotes and collects it, so it is recorded as charged rather
    /// than re-priced; a non-zero fee needs `payment_reference`.
    #[serde(default)]
    pub shipping_cost: Option<Decimal>,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub size: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub email: String,
}

/// A requested line after validation and de-duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestedLine {
    product_id: ProductId,
    size: String,
    quantity: i32,
}

/// Check quantities and merge repeated product/size pairs.
fn normalize_items(items: &[OrderItemRequest]) -> Result<Vec<RequestedLine>> {
    if items.is_empty() {
        return Err(AppError::BadRequest(
            "order must contain at least one item".to_string(),
        ));
    }

    let mut lines: Vec<RequestedLine> = Vec::new();
    for item in items {
        let size = item.size.trim();
        if size.is_empty() {
            return Err(AppError::BadRequest("item size is required".to_string()));
        }
        if item.quantity < 1 {
            return Err(AppError::BadRequest(
                "item quantity must be at least 1".to_string(),
            ));
        }

        if let Some(existing) = lines
            .iter_mut()
            .find(|l| l.product_id == item.product_id && l.size.eq_ignore_ascii_case(size))
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            lines.push(RequestedLine {
                product_id: item.product_id,
                size: size.to_string(),
                quantity: item.quantity,
            });
        }
    }

    if lines.len() > MAX_LINES {
        return Err(AppError::BadRequest(format!(
            "order may contain at most {MAX_LINES} different items"
        )));
    }
    if let Some(line) = lines.iter().find(|l| l.quantity > MAX_QUANTITY_PER_LINE) {
        return Err(AppError::BadRequest(format!(
            "at most {MAX_QUANTITY_PER_LINE} units of size {} per order",
            line.size
        )));
    }

    Ok(lines)
}

/// Price requested lines from the catalogue.
fn price_lines(
    requested: &[RequestedLine],
    products: &HashMap<ProductId, Product>,
) -> Result<Vec<OrderLine>> {
    requested
        .iter()
        .map(|line| {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| AppError::NotFound(format!("Product {}", line.product_id)))?;
            if product.is_preorder {
                return Err(AppError::BadRequest(format!(
                    "{} is available by pre-order only",
                    product.name
                )));
            }
            let size = product.size(&line.size).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "{} is not available in size {}",
                    product.name, line.size
                ))
            })?;

            Ok(OrderLine {
                product_id: product.id,
                product_name: product.name.clone(),
                size: size.size.clone(),
                quantity: line.quantity,
                unit_price: product.price,
            })
        })
        .collect()
}

/// The charged shipping fee, tied to the payment that collected it.
fn charged_shipping(
    shipping_cost: Option<Decimal>,
    payment_reference: Option<&str>,
) -> Result<Option<Decimal>> {
    let has_reference = payment_reference.is_some_and(|r| !r.trim().is_empty());
    match shipping_cost {
        Some(cost) if !cost.is_zero() && !has_reference => Err(AppError::BadRequest(
            "shipping_cost requires the payment_reference of the charge".to_string(),
        )),
        other => Ok(other),
    }
}

/// Totals for a priced order: `(subtotal, shipping, total)`.
///
/// Item prices always come from the catalogue; only the charged shipping fee
/// is taken from the request.
fn order_totals(
    lines: &[OrderLine],
    shipping_cost: Option<Decimal>,
) -> Result<(Money, Money, Money)> {
    let currency = lines
        .first()
        .map(|l| l.unit_price.currency)
        .unwrap_or_default();
    if lines.iter().any(|l| l.unit_price.currency != currency) {
        return Err(AppError::BadRequest(
            "all items in an order must share one currency".to_string(),
        ));
    }

    let shipping_cost = shipping_cost.unwrap_or(Decimal::ZERO);
    if shipping_cost < Decimal::ZERO {
        return Err(AppError::BadRequest(
            "shipping_cost cannot be negative".to_string(),
        ));
    }

    let out_of_range = |_| AppError::BadRequest("order total is out of range".to_string());
    let line_totals = lines
        .iter()
        .map(|l| l.unit_price.checked_mul_quantity(l.quantity))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(out_of_range)?;
    let subtotal = Money::sum(currency, line_totals).map_err(out_of_range)?;
    let shipping = Money::new(shipping_cost, currency);
    let total = subtotal.checked_add(shipping).map_err(out_of_range)?;

    Ok((subtotal, shipping, total))
}

/// Public order number, e.g. `QY-20261018-K7M2QX`.
fn generate_order_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ORDER_NUMBER_ALPHABET.len());
            char::from(ORDER_NUMBER_ALPHABET.get(idx).copied().unwrap_or(b'X'))
        })
        .collect();
    format!("QY-{}-{suffix}", now.format("%Y%m%d"))
}

/// Place an order.
///
/// Prices come from the catalogue. Stock for every line is decremented in
/// the same transaction that writes the order; if any line is short nothing
/// is written and the response is `409 Conflict`.
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let customer_email = parse_email(&request.customer_email)?;
    let customer_name = required_text(&request.customer_name, "customer_name")?;
    let missing = request.shipping_address.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "shipping_address is missing: {}",
            missing.join(", ")
        )));
    }

    let requested = normalize_items(&request.items)?;
    let ids: Vec<ProductId> = requested.iter().map(|l| l.product_id).collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;
    let lines = price_lines(&requested, &products)?;
    let shipping = charged_shipping(request.shipping_cost, request.payment_reference.as_deref())?;
    let (subtotal, shipping_cost, total) = order_totals(&lines, shipping)?;

    let mut draft = OrderDraft {
        order_number: String::new(),
        customer_email,
        customer_name,
        customer_phone: request.customer_phone.filter(|p| !p.trim().is_empty()),
        shipping_address: request.shipping_address,
        payment_reference: request.payment_reference,
        lines,
        subtotal,
        shipping_cost,
        total,
    };

    let orders = OrderRepository::new(state.pool());
    let mut attempt = 0;
    let order = loop {
        attempt += 1;
        draft.order_number = generate_order_number(Utc::now());
        match orders.place(&draft).await {
            Err(PlaceOrderError::Repository(RepositoryError::Conflict(_)))
                if attempt < ORDER_NUMBER_ATTEMPTS =>
            {
                tracing::warn!(attempt, "Order number collision, retrying");
            }
            result => break result?,
        }
    };

    tracing::info!(
        order_number = %order.order_number,
        customer = %order.customer_email.masked(),
        total = %order.total,
        "Order placed"
    );
    add_breadcrumb("order", "Order placed", &[("order_number", order.order_number.as_str())]);

    if let Some(email) = state.email()
        && let Err(e) = email.send_order_confirmation(&order).await
    {
        tracing::warn!(order_number = %order.order_number, error = %e, "Failed to send order confirmation");
    }

    Ok((StatusCode::CREATED, Json(order)))
}

/// Order status and tracking for the customer who placed it.
///
/// An email that does not match the order gets the same 404 as an unknown
/// order number.
#[instrument(skip(state, query))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(order_number): ApiPath<String>,
    ApiQuery(query): ApiQuery<LookupQuery>,
) -> Result<Json<Order>> {
    let email = parse_email(&query.email)?;
    OrderRepository::new(state.pool())
        .find_by_number(order_number.trim())
        .await?
        .filter(|order| order.customer_email == email)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
}
