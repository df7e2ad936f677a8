//! Order placement and lookup.
//!
//! Placing an order is the one storefront write that touches stock. The whole
//! placement runs in a single transaction: each size row is locked with
//! `FOR UPDATE` before its count is checked, so two concurrent checkouts for
//! the last unit cannot both succeed. Rows are locked in
//! [`lock_order`](qyve_core::inventory::lock_order), never in basket order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use qyve_core::inventory::{InventoryError, StockLevel, lock_order};
use qyve_core::shipping::Address;
use qyve_core::{Email, Money, MovementType, OrderId, OrderStatus, PaymentStatus, ProductId};

use super::RepositoryError;
use super::products::parse_currency;
use crate::models::order::{Order, OrderDraft, OrderLine};

/// Value written to `stock_movement.created_by` for checkout sales.
const SALE_ACTOR: &str = "storefront";

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A line asks for more units than are on hand.
    #[error("{product} size {size}: {source}")]
    Stock {
        product: String,
        size: String,
        #[source]
        source: InventoryError,
    },

    /// The product does not come in the requested size.
    #[error("{product} is not available in size {size}")]
    UnknownSize { product: String, size: String },
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    customer_email: Email,
    customer_name: String,
    customer_phone: Option<String>,
    shipping_address: Json<Address>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    currency: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    carrier: Option<String>,
    tracking_number: Option<String>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        let currency = parse_currency(&self.currency)?;
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            customer_email: self.customer_email,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            shipping_address: self.shipping_address.0,
            subtotal: Money::new(self.subtotal, currency),
            shipping_cost: Money::new(self.shipping_cost, currency),
            total: Money::new(self.total, currency),
            status: self.status,
            payment_status: self.payment_status,
            carrier: self.carrier,
            tracking_number: self.tracking_number,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            items,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    product_id: ProductId,
    product_name: String,
    size: String,
    quantity: i32,
    unit_price: Decimal,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for customer orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write an order, its items and the matching stock decrements atomically.
    ///
    /// Nothing is written unless every line can be fulfilled.
    ///
    /// # Errors
    ///
    /// - `PlaceOrderError::UnknownSize` if a line names a size the product lacks
    /// - `PlaceOrderError::Stock` if a line exceeds the stock on hand
    /// - `PlaceOrderError::Repository` for database failures, including a
    ///   `Conflict` when the order number is already taken
    pub async fn place(&self, draft: &OrderDraft) -> Result<Order, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        let order_id: (OrderId,) = sqlx::query_as(
            r"
            INSERT INTO customer_order (
                order_number, customer_email, customer_name, customer_phone,
                shipping_address, subtotal, shipping_cost, total, currency,
                payment_reference
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(&draft.order_number)
        .bind(&draft.customer_email)
        .bind(&draft.customer_name)
        .bind(&draft.customer_phone)
        .bind(Json(&draft.shipping_address))
        .bind(draft.subtotal.amount)
        .bind(draft.shipping_cost.amount)
        .bind(draft.total.amount)
        .bind(draft.total.currency.code())
        .bind(&draft.payment_reference)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "order number already exists"))?;
        let order_id = order_id.0;

        for line in stock_lock_order(&draft.lines) {
            take_stock(&mut tx, line, &draft.order_number).await?;
        }

        for line in &draft.lines {
            sqlx::query(
                r"
                INSERT INTO order_item (order_id, product_id, product_name, size, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(&line.size)
            .bind(line.quantity)
            .bind(line.unit_price.amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let order = self
            .find_by_id(order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(order)
    }

    /// Look up an order by its public number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?;

        self.with_items(row).await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        self.with_items(row).await
    }

    /// Line items of an order, in the order they were placed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let currency: Option<(String,)> =
            sqlx::query_as("SELECT currency FROM customer_order WHERE id = $1")
                .bind(order_id)
                .fetch_optional(self.pool)
                .await?;
        let Some((currency,)) = currency else {
            return Ok(Vec::new());
        };
        let currency = parse_currency(&currency)?;

        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT product_id, product_name, size, quantity, unit_price
            FROM order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OrderLine {
                product_id: row.product_id,
                product_name: row.product_name,
                size: row.size,
                quantity: row.quantity,
                unit_price: Money::new(row.unit_price, currency),
            })
            .collect())
    }

    async fn with_items(&self, row: Option<OrderRow>) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let items = self.items(row.id).await?;
        row.into_order(items).map(Some)
    }
}

const ORDER_COLUMNS: &str = r"
    id, order_number, customer_email, customer_name, customer_phone,
    shipping_address, subtotal, shipping_cost, total, currency,
    status, payment_status, carrier, tracking_number,
    shipped_at, delivered_at, created_at
";

/// Lines in the order their size rows must be locked.
fn stock_lock_order(lines: &[OrderLine]) -> Vec<&OrderLine> {
    let mut ordered: Vec<&OrderLine> = lines.iter().collect();
    lock_order(&mut ordered, |line| (line.product_id, line.size.as_str()));
    ordered
}

/// Decrement one size's stock inside the placement transaction and record the sale.
async fn take_stock(
    tx: &mut Transaction<'_, Postgres>,
    line: &OrderLine,
    order_number: &str,
) -> Result<(), PlaceOrderError> {
    let current: Option<(i64, i32)> = sqlx::query_as(
        r"
        SELECT id, stock_quantity
        FROM product_size
        WHERE product_id = $1 AND lower(size) = lower($2)
        FOR UPDATE
        ",
    )
    .bind(line.product_id)
    .bind(&line.size)
    .fetch_optional(&mut **tx)
    .await?;

    let Some((size_row_id, on_hand)) = current else {
        return Err(PlaceOrderError::UnknownSize {
            product: line.product_name.clone(),
            size: line.size.clone(),
        });
    };

    let change = StockLevel::new(on_hand)
        .and_then(|level| level.take(line.quantity))
        .map_err(|source| PlaceOrderError::Stock {
            product: line.product_name.clone(),
            size: line.size.clone(),
            source,
        })?;

    sqlx::query("UPDATE product_size SET stock_quantity = $1, updated_at = NOW() WHERE id = $2")
        .bind(change.new)
        .bind(size_row_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        r"
        INSERT INTO stock_movement (
            product_id, size, movement_type, quantity_change,
            previous_stock, new_stock, reason, reference, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ",
    )
    .bind(line.product_id)
    .bind(&line.size)
    .bind(MovementType::Sale)
    .bind(change.delta)
    .bind(change.previous)
    .bind(change.new)
    .bind("order placed")
    .bind(order_number)
    .bind(SALE_ACTOR)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use qyve_core::CurrencyCode;

    use super::*;

    fn line(product_id: i64, size: &str) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(product_id),
            product_name: format!("Product {product_id}"),
            size: size.to_string(),
            quantity: 1,
            unit_price: Money::new(Decimal::from(450_000), CurrencyCode::default()),
        }
    }

    fn locked(lines: &[OrderLine]) -> Vec<(i64, String)> {
        stock_lock_order(lines)
            .into_iter()
            .map(|l| (l.product_id.as_i64(), l.size.to_lowercase()))
            .collect()
    }

    #[test]
    fn test_opposite_baskets_lock_in_the_same_order() {
        let basket_a = [line(1, "M"), line(2, "M")];
        let basket_b = [line(2, "m"), line(1, "M")];
        assert_eq!(locked(&basket_a), locked(&basket_b));
        assert_eq!(
            locked(&basket_b),
            vec![(1, "m".to_string()), (2, "m".to_string())]
        );
    }

    #[test]
    fn test_lock_order_leaves_the_basket_untouched() {
        let basket = [line(3, "XL"), line(1, "S"), line(3, "L")];
        assert_eq!(
            locked(&basket),
            vec![(1, "s".to_string()), (3, "l".to_string()), (3, "xl".to_string())]
        );
        assert_eq!(basket.first().unwrap().product_id.as_i64(), 3);
    }
}
