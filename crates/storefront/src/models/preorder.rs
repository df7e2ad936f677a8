//! Pre-order models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qyve_core::{Email, Money, PreorderId, PreorderStatus, ProductId};

/// A pre-order for a not-yet-available product.
#[derive(Debug, Clone, Serialize)]
pub struct Preorder {
    pub id: PreorderId,
    pub product_id: ProductId,
    pub size: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: Option<String>,
    pub quantity: i32,
    pub unit_price: Money,
    pub deposit_amount: Money,
    pub status: PreorderStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for a new pre-order, priced from the catalogue.
#[derive(Debug, Clone)]
pub struct NewPreorder {
    pub product_id: ProductId,
    pub size: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: Option<String>,
    pub quantity: i32,
    pub unit_price: Money,
    pub deposit_amount: Money,
    pub notes: Option<String>,
}
