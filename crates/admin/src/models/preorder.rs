//! Pre-order models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qyve_core::{Email, Money, PreorderId, PreorderStatus, ProductId};

#[derive(Debug, Clone, Serialize)]
pub struct Preorder {
    pub id: PreorderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub size: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: Option<String>,
    pub quantity: i32,
    pub unit_price: Money,
    pub deposit_amount: Money,
    pub status: PreorderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
