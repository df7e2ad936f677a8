//! Pre-order submission.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use qyve_core::ProductId;

use super::{parse_email, required_text};
use crate::db::{PreorderRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::models::preorder::{NewPreorder, Preorder};
use crate::models::product::Product;
use crate::state::AppState;

/// Most units in one pre-order.
pub const MAX_PREORDER_QUANTITY: i32 = 5;

#[derive(Debug, Deserialize)]
pub struct CreatePreorderRequest {
    pub product_id: ProductId,
    pub size: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

const fn default_quantity() -> i32 {
    1
}

/// Validate the request against the product and price it.
///
/// The deposit is `price x quantity x deposit rate`, rounded to two places.
fn build_preorder(product: &Product, request: CreatePreorderRequest) -> Result<NewPreorder> {
    if !product.is_preorder {
        return Err(AppError::BadRequest(format!(
            "{} is not open for pre-order",
            product.name
        )));
    }
    if !(1..=MAX_PREORDER_QUANTITY).contains(&request.quantity) {
        return Err(AppError::BadRequest(format!(
            "quantity must be between 1 and {MAX_PREORDER_QUANTITY}"
        )));
    }

    let requested_size = request.size.trim();
    let size = if product.sizes.is_empty() {
        // Sizes for an upcoming drop may not be stocked yet
        required_text(requested_size, "size")?
    } else {
        product
            .size(requested_size)
            .map(|s| s.size.clone())
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "{} is not available in size {requested_size}",
                    product.name
                ))
            })?
    };

    let out_of_range = |_| AppError::BadRequest("deposit is out of range".to_string());
    let deposit_amount = product
        .price
        .checked_mul_quantity(request.quantity)
        .and_then(|total| total.checked_mul_rate(product.preorder_deposit_rate))
        .map_err(out_of_range)?;

    Ok(NewPreorder {
        product_id: product.id,
        size,
        customer_name: required_text(&request.customer_name, "customer_name")?,
        customer_email: parse_email(&request.customer_email)?,
        customer_phone: request.customer_phone.filter(|p| !p.trim().is_empty()),
        quantity: request.quantity,
        unit_price: product.price,
        deposit_amount,
        notes: request.notes.filter(|n| !n.trim().is_empty()),
    })
}

/// Submit a pre-order for a product that is not yet available.
///
/// Stock is untouched; the team confirms pre-orders once the deposit is paid.
#[instrument(skip(state, request), fields(product_id = %request.product_id))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreatePreorderRequest>,
) -> Result<(StatusCode, Json<Preorder>)> {
    let product = ProductRepository::new(state.pool())
        .get(request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let new_preorder = build_preorder(&product, request)?;
    let preorder = PreorderRepository::new(state.pool())
        .create(&new_preorder)
        .await?;

    tracing::info!(
        preorder_id = %preorder.id,
        product = %product.slug,
        deposit = %preorder.deposit_amount,
        "Pre-order created"
    );

    if let Some(mailer) = state.email()
        && let Err(e) = mailer
            .send_preorder_confirmation(&preorder, &product.name)
            .await
    {
        tracing::warn!(preorder_id = %preorder.id, error = %e, "Failed to send pre-order confirmation");
    }

    Ok((StatusCode::CREATED, Json(preorder)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use qyve_core::{CurrencyCode, Money};

    use super::*;
    use crate::models::product::SizeStock;

    fn jacket(is_preorder: bool) -> Product {
        Product {
            id: ProductId::new(9),
            slug: "stride-jacket".to_string(),
            name: "Stride Jacket".to_string(),
            description: None,
            category: "outerwear".to_string(),
            price: Money::new(Decimal::from(600_000), CurrencyCode::IDR),
            is_preorder,
            preorder_deposit_rate: Decimal::new(3, 1),
            weight_grams: 700,
            sizes: vec![SizeStock::new("L".to_string(), 0)],
            created_at: Utc::now(),
        }
    }

    fn request(size: &str, quantity: i32) -> CreatePreorderRequest {
        CreatePreorderRequest {
            product_id: ProductId::new(9),
            size: size.to_string(),
            customer_name: "Dimas".to_string(),
            customer_email: "Dimas@Example.com".to_string(),
            customer_phone: None,
            quantity,
            notes: None,
        }
    }

    #[test]
    fn test_deposit_uses_product_rate() {
        let preorder = build_preorder(&jacket(true), request("l", 2)).unwrap();
        assert_eq!(preorder.deposit_amount.amount, Decimal::from(360_000));
        assert_eq!(preorder.size, "L");
        assert_eq!(preorder.customer_email.as_str(), "dimas@example.com");
    }

    #[test]
    fn test_rejects_regular_products() {
        assert!(matches!(
            build_preorder(&jacket(false), request("L", 1)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(build_preorder(&jacket(true), request("L", 0)).is_err());
        assert!(build_preorder(&jacket(true), request("L", MAX_PREORDER_QUANTITY + 1)).is_err());
        assert!(build_preorder(&jacket(true), request("L", MAX_PREORDER_QUANTITY)).is_ok());
    }

    #[test]
    fn test_unknown_size() {
        assert!(build_preorder(&jacket(true), request("XS", 1)).is_err());
    }
}
