//! Order models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qyve_core::shipping::Address;
use qyve_core::{Email, Money, OrderId, OrderStatus, PaymentStatus, ProductId};

/// A placed order with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_email: Email,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Address,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLine>,
}

/// One purchased product size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: String,
    pub quantity: i32,
    pub unit_price: Money,
}

/// A fully priced order ready to be written.
///
/// Prices come from the catalogue, never from the request body.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order_number: String,
    pub customer_email: Email,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Address,
    pub payment_reference: Option<String>,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
}
