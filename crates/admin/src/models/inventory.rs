//! Stock models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qyve_core::{MovementType, ProductId, StockMovementId};

/// Stock on hand for one product size.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    pub size: String,
    pub stock_quantity: i32,
    /// Set by the repository from the low-stock threshold.
    #[sqlx(skip)]
    pub low_stock: bool,
    pub updated_at: DateTime<Utc>,
}

/// One row of the append-only stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StockMovement {
    pub id: StockMovementId,
    pub product_id: ProductId,
    pub size: String,
    pub movement_type: MovementType,
    pub quantity_change: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Who changed a size's stock and why.
#[derive(Debug, Clone)]
pub struct StockUpdate {
    pub product_id: ProductId,
    pub size: String,
    pub reason: Option<String>,
    pub reference: Option<String>,
    /// Recorded as `stock_movement.created_by`.
    pub actor: String,
}

/// Filters for the movement history listing.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub product_id: Option<ProductId>,
    pub size: Option<String>,
    pub limit: i64,
}
