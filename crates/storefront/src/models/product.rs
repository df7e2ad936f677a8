//! Catalogue models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use qyve_core::{Money, ProductId};

/// A product as listed on the storefront.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: Money,
    pub is_preorder: bool,
    /// Fraction of the price collected up front for pre-orders (0..1).
    pub preorder_deposit_rate: Decimal,
    pub weight_grams: i32,
    pub sizes: Vec<SizeStock>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Stock for one size, if the product comes in that size.
    #[must_use]
    pub fn size(&self, size: &str) -> Option<&SizeStock> {
        self.sizes.iter().find(|s| s.size.eq_ignore_ascii_case(size))
    }

    /// Whether any size can be bought right now.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.sizes.iter().any(|s| s.in_stock)
    }
}

/// Units on hand for one size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeStock {
    pub size: String,
    pub stock_quantity: i32,
    pub in_stock: bool,
}

impl SizeStock {
    #[must_use]
    pub fn new(size: String, stock_quantity: i32) -> Self {
        Self {
            size,
            stock_quantity,
            in_stock: stock_quantity > 0,
        }
    }
}

/// Response body for the stock query endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StockReport {
    pub product_id: ProductId,
    pub sizes: Vec<SizeStock>,
    pub total_quantity: i64,
}

impl StockReport {
    #[must_use]
    pub fn new(product_id: ProductId, sizes: Vec<SizeStock>) -> Self {
        let total_quantity = sizes.iter().map(|s| i64::from(s.stock_quantity)).sum();
        Self {
            product_id,
            sizes,
            total_quantity,
        }
    }
}
