//! Catalogue and stock queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use qyve_core::{CurrencyCode, Money, ProductId};

use super::RepositoryError;
use crate::models::product::{Product, SizeStock};

const PRODUCT_COLUMNS: &str = r"
    id, slug, name, description, category, price, currency,
    is_preorder, preorder_deposit_rate, weight_grams, created_at
";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    slug: String,
    name: String,
    description: Option<String>,
    category: String,
    price: Decimal,
    currency: String,
    is_preorder: bool,
    preorder_deposit_rate: Decimal,
    weight_grams: i32,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, sizes: Vec<SizeStock>) -> Result<Product, RepositoryError> {
        let currency = parse_currency(&self.currency)?;
        Ok(Product {
            id: self.id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            category: self.category,
            price: Money::new(self.price, currency),
            is_preorder: self.is_preorder,
            preorder_deposit_rate: self.preorder_deposit_rate,
            weight_grams: self.weight_grams,
            sizes,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SizeRow {
    product_id: ProductId,
    size: String,
    stock_quantity: i32,
}

/// Parse a stored currency code.
pub(crate) fn parse_currency(code: &str) -> Result<CurrencyCode, RepositoryError> {
    code.parse().map_err(RepositoryError::DataCorruption)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalogue reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active products, optionally within one category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product
             WHERE is_active AND ($1::TEXT IS NULL OR category = $1)
             ORDER BY created_at DESC"
        ))
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        self.attach_sizes(rows).await
    }

    /// Get an active product by its URL slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE slug = $1 AND is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(self.attach_sizes(row.into_iter().collect()).await?.pop())
    }

    /// Get an active product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.get_many(&[id]).await?.remove(&id))
    }

    /// Get several active products by ID; missing or inactive IDs are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, RepositoryError> {
        let raw_ids: Vec<i64> = ids.iter().map(ProductId::as_i64).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ANY($1) AND is_active"
        ))
        .bind(&raw_ids)
        .fetch_all(self.pool)
        .await?;

        Ok(self
            .attach_sizes(rows)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect())
    }

    /// Stock per size for a product (active or not), in the order sizes were added.
    ///
    /// Returns `None` when the product does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock(&self, id: ProductId) -> Result<Option<Vec<SizeStock>>, RepositoryError> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM product WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let sizes = self.sizes_for(&[id.as_i64()]).await?;
        Ok(Some(
            sizes
                .into_iter()
                .map(|row| SizeStock::new(row.size, row.stock_quantity))
                .collect(),
        ))
    }

    async fn sizes_for(&self, product_ids: &[i64]) -> Result<Vec<SizeRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, SizeRow>(
            r"
            SELECT product_id, size, stock_quantity
            FROM product_size
            WHERE product_id = ANY($1)
            ORDER BY product_id, id
            ",
        )
        .bind(product_ids)
        .fetch_all(self.pool)
        .await?)
    }

    async fn attach_sizes(&self, rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id.as_i64()).collect();
        let mut sizes: HashMap<ProductId, Vec<SizeStock>> = HashMap::new();
        for row in self.sizes_for(&ids).await? {
            sizes
                .entry(row.product_id)
                .or_default()
                .push(SizeStock::new(row.size, row.stock_quantity));
        }

        rows.into_iter()
            .map(|row| {
                let product_sizes = sizes.remove(&row.id).unwrap_or_default();
                row.into_product(product_sizes)
            })
            .collect()
    }
}
