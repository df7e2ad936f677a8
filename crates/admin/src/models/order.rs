//! Order models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qyve_core::shipping::Address;
use qyve_core::{Email, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId};

/// An order with every back-office field and its line items.
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
    pub payment_reference: Option<String>,
    pub carrier: Option<String>,
    pub service_level: Option<String>,
    pub tracking_number: Option<String>,
    pub label_url: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub size: String,
    pub quantity: i32,
    pub unit_price: Money,
}

/// A row of the order listing.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub item_count: i64,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Carrier details written when a label is bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shipment {
    pub carrier: String,
    pub service_level: String,
    pub tracking_number: String,
    pub label_url: Option<String>,
}
