//! Inventory management route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use qyve_core::ProductId;
use qyve_core::inventory::LOW_STOCK_THRESHOLD;

use super::{optional_text, required_text};
use crate::db::InventoryRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::Actor;
use crate::models::inventory::{HistoryFilter, StockItem, StockMovement, StockUpdate};
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;
const MAX_REASON_LEN: usize = 200;

/// Query parameters for the stock list.
#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    #[serde(default)]
    pub low_stock_only: bool,
    #[serde(default)]
    pub threshold: Option<i32>,
}

/// Body for a signed adjustment.
#[derive(Debug, Deserialize)]
pub struct InventoryAdjustRequest {
    pub product_id: ProductId,
    pub size: String,
    pub delta: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Body for an absolute set.
#[derive(Debug, Deserialize)]
pub struct InventorySetRequest {
    pub product_id: ProductId,
    pub size: String,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

fn stock_update(
    product_id: ProductId,
    size: &str,
    reason: Option<String>,
    reference: Option<String>,
    actor: Actor,
) -> Result<StockUpdate> {
    let reason = optional_text(reason);
    if reason
        .as_ref()
        .is_some_and(|r| r.chars().count() > MAX_REASON_LEN)
    {
        return Err(AppError::BadRequest(format!(
            "reason must be at most {MAX_REASON_LEN} characters"
        )));
    }

    Ok(StockUpdate {
        product_id,
        size: required_text(size, "size")?,
        reason,
        reference: optional_text(reference),
        actor: actor.0,
    })
}

/// Stock per product size, lowest first.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<InventoryQuery>,
) -> Result<Json<Vec<StockItem>>> {
    let threshold = query.threshold.unwrap_or(LOW_STOCK_THRESHOLD).max(0);
    let items = InventoryRepository::new(state.pool())
        .list(query.low_stock_only, threshold)
        .await?;
    Ok(Json(items))
}

/// Apply a signed delta; refused with `409` if stock would go negative.
#[instrument(skip(state, request), fields(product_id = %request.product_id, size = %request.size, delta = request.delta))]
pub async fn adjust(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(request): ApiJson<InventoryAdjustRequest>,
) -> Result<Json<StockMovement>> {
    let update = stock_update(
        request.product_id,
        &request.size,
        request.reason,
        request.reference,
        actor,
    )?;
    let movement = InventoryRepository::new(state.pool())
        .adjust(&update, request.delta)
        .await?;
    Ok(Json(movement))
}

/// Replace a size's count after a stocktake.
#[instrument(skip(state, request), fields(product_id = %request.product_id, size = %request.size, quantity = request.quantity))]
pub async fn set(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(request): ApiJson<InventorySetRequest>,
) -> Result<Json<StockMovement>> {
    let update = stock_update(
        request.product_id,
        &request.size,
        request.reason,
        request.reference,
        actor,
    )?;
    let movement = InventoryRepository::new(state.pool())
        .set(&update, request.quantity)
        .await?;
    Ok(Json(movement))
}

/// Movement ledger, newest first.
#[instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<Vec<StockMovement>>> {
    let filter = HistoryFilter {
        product_id: query.product_id,
        size: optional_text(query.size),
        limit: query
            .limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT),
    };
    let movements = InventoryRepository::new(state.pool())
        .history(&filter)
        .await?;
    Ok(Json(movements))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_update_trims_and_records_actor() {
        let update = stock_update(
            ProductId::new(4),
            " M ",
            Some("  recount ".to_string()),
            Some(String::new()),
            Actor("dewi".to_string()),
        )
        .unwrap();
        assert_eq!(update.size, "M");
        assert_eq!(update.reason.as_deref(), Some("recount"));
        assert_eq!(update.reference, None);
        assert_eq!(update.actor, "dewi");
    }

    #[test]
    fn test_stock_update_rejects_blank_size_and_long_reason() {
        let blank = stock_update(ProductId::new(4), "  ", None, None, Actor("a".to_string()));
        assert!(matches!(blank, Err(AppError::BadRequest(_))));

        let long = stock_update(
            ProductId::new(4),
            "M",
            Some("x".repeat(MAX_REASON_LEN + 1)),
            None,
            Actor("a".to_string()),
        );
        assert!(matches!(long, Err(AppError::BadRequest(_))));
    }
}
