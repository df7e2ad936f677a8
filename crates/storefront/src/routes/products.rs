//! Catalogue and stock route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use qyve_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery};
use crate::models::product::{Product, StockReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub size: Option<String>,
}

/// List active products with their sizes and stock flags.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Product>>> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let products = ProductRepository::new(state.pool())
        .list_active(category)
        .await?;
    Ok(Json(products))
}

/// Show one active product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Stock per size for a product, optionally narrowed to one size.
#[instrument(skip(state))]
pub async fn stock(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiQuery(query): ApiQuery<StockQuery>,
) -> Result<Json<StockReport>> {
    let sizes = ProductRepository::new(state.pool())
        .stock(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let sizes = match query.size.as_deref().map(str::trim) {
        Some(wanted) if !wanted.is_empty() => {
            let matching: Vec<_> = sizes
                .into_iter()
                .filter(|s| s.size.eq_ignore_ascii_case(wanted))
                .collect();
            if matching.is_empty() {
                return Err(AppError::NotFound(format!("Size {wanted}")));
            }
            matching
        }
        _ => sizes,
    };

    Ok(Json(StockReport::new(product_id, sizes)))
}
