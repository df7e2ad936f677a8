//! Order management route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use qyve_core::{OrderId, OrderStatus};

use crate::db::{OrderRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::Actor;
use crate::models::order::{Order, OrderSummary};
use crate::models::{Page, Pagination};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

/// Paginated order list, newest first.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<Json<Page<OrderSummary>>> {
    let page = OrderRepository::new(state.pool())
        .list(
            query.status,
            Pagination {
                page: query.page,
                per_page: query.per_page,
            },
        )
        .await?;
    Ok(Json(page))
}

/// One order with its items, shipment and payment details.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// Move an order along its lifecycle.
///
/// Illegal transitions get `409`. Cancelling returns the items to stock.
#[instrument(skip(state, actor), fields(actor = %actor.as_str()))]
pub async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<StatusUpdateRequest>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, request.status, actor.as_str())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("order {id}")),
            other => other.into(),
        })?;
    Ok(Json(order))
}
