//! Order queries and status changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use qyve_core::inventory::lock_order;
use qyve_core::shipping::Address;
use qyve_core::{
    Email, Money, MovementType, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId,
};

use super::inventory::{NewMovement, lock_size, write_change};
use super::{RepositoryError, parse_currency};
use crate::models::order::{Order, OrderLine, OrderSummary, Shipment};
use crate::models::{Page, Pagination};

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
    payment_reference: Option<String>,
    carrier: Option<String>,
    service_level: Option<String>,
    tracking_number: Option<String>,
    label_url: Option<String>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    product_id: ProductId,
    product_name: String,
    size: String,
    quantity: i32,
    unit_price: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: OrderId,
    order_number: String,
    customer_name: String,
    customer_email: Email,
    total: Decimal,
    currency: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    item_count: i64,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, RepositoryError> {
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
            payment_reference: self.payment_reference,
            carrier: self.carrier,
            service_level: self.service_level,
            tracking_number: self.tracking_number,
            label_url: self.label_url,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items: items
                .into_iter()
                .map(|item| OrderLine {
                    id: item.id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    size: item.size,
                    quantity: item.quantity,
                    unit_price: Money::new(item.unit_price, currency),
                })
                .collect(),
        })
    }
}

const ORDER_COLUMNS: &str = r"
    id, order_number, customer_email, customer_name, customer_phone,
    shipping_address, subtotal, shipping_cost, total, currency,
    status, payment_status, payment_reference,
    carrier, service_level, tracking_number, label_url,
    shipped_at, delivered_at, created_at, updated_at
";

/// Reason recorded on restock rows written by a cancellation.
const RESTOCK_REASON: &str = "order cancelled";

/// How long a fulfilment claim blocks other runs; a crashed run frees the order after this.
const FULFILLMENT_CLAIM_TTL_MINUTES: i64 = 10;

/// Whether a claim taken at `claimed_at` still holds at `now`.
fn claim_is_live(claimed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    claimed_at.is_some_and(|at| now - at < chrono::Duration::minutes(FULFILLMENT_CLAIM_TTL_MINUTES))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for back-office order management.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest orders first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is malformed.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        pagination: Pagination,
    ) -> Result<Page<OrderSummary>, RepositoryError> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM customer_order WHERE $1::order_status IS NULL OR status = $1",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, SummaryRow>(
            r"
            SELECT
                o.id, o.order_number, o.customer_name, o.customer_email,
                o.total, o.currency, o.status, o.payment_status, o.tracking_number,
                o.created_at,
                COALESCE((SELECT SUM(quantity) FROM order_item WHERE order_id = o.id), 0)::BIGINT
                    AS item_count
            FROM customer_order o
            WHERE $1::order_status IS NULL OR o.status = $1
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| {
                Ok(OrderSummary {
                    id: row.id,
                    order_number: row.order_number,
                    customer_name: row.customer_name,
                    customer_email: row.customer_email,
                    total: Money::new(row.total, parse_currency(&row.currency)?),
                    status: row.status,
                    payment_status: row.payment_status,
                    item_count: row.item_count,
                    tracking_number: row.tracking_number,
                    created_at: row.created_at,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Page::new(items, pagination, total))
    }

    /// One order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is malformed.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        row.into_order(items).map(Some)
    }

    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItemRow>, sqlx::Error> {
        sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, product_id, product_name, size, quantity, unit_price
            FROM order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await
    }

    /// Total goods weight of an order, for parcel sizing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn weight_grams(&self, id: OrderId) -> Result<i64, RepositoryError> {
        let (grams,): (i64,) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(p.weight_grams::BIGINT * i.quantity), 0)::BIGINT
            FROM order_item i
            JOIN product p ON p.id = i.product_id
            WHERE i.order_id = $1
            ",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(grams)
    }

    /// Move an order to `next`.
    ///
    /// `delivered` stamps `delivered_at` (which opens the refund window),
    /// `paid` marks the payment paid, and `cancelled` returns every line's
    /// units to stock with `return` movements. All of it commits together.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` if the order does not exist
    /// - `RepositoryError::Conflict` if the transition is not allowed
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
        actor: &str,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (current, order_number) = lock_order_row(&mut tx, id).await?;
        ensure_transition(current, next)?;

        sqlx::query(
            r"
            UPDATE customer_order
            SET status = $2,
                payment_status = CASE
                    WHEN $2 = 'paid'::order_status THEN 'paid'::payment_status
                    WHEN $2 = 'refunded'::order_status THEN 'refunded'::payment_status
                    ELSE payment_status
                END,
                shipped_at = CASE WHEN $2 = 'shipped'::order_status
                    THEN COALESCE(shipped_at, NOW()) ELSE shipped_at END,
                delivered_at = CASE WHEN $2 = 'delivered'::order_status
                    THEN NOW() ELSE delivered_at END,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

        if next == OrderStatus::Cancelled {
            restock_items(&mut tx, id, &order_number, actor).await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_number = %order_number,
            from = %current,
            to = %next,
            actor = %actor,
            "Order status changed"
        );

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Reserve an order for one fulfilment run before a label is bought.
    ///
    /// The order row is locked while its status and any live claim are
    /// checked, so of two concurrent runs only one gets past this point.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` if the order does not exist
    /// - `RepositoryError::Conflict` if the order is not paid/processing or
    ///   another run holds the claim
    pub async fn claim_fulfillment(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (status, order_number, claimed_at) =
            sqlx::query_as::<_, (OrderStatus, String, Option<DateTime<Utc>>)>(
                r"
                SELECT status, order_number, fulfillment_claimed_at
                FROM customer_order
                WHERE id = $1
                FOR UPDATE
                ",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        if !status.is_fulfillable() {
            return Err(RepositoryError::Conflict(format!(
                "order {order_number} is {status}, only paid or processing orders can be fulfilled"
            )));
        }
        if claim_is_live(claimed_at, Utc::now()) {
            return Err(RepositoryError::Conflict(format!(
                "order {order_number} is already being fulfilled"
            )));
        }

        sqlx::query("UPDATE customer_order SET fulfillment_claimed_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Drop a fulfilment claim after a run failed before buying a label.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn release_fulfillment(&self, id: OrderId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE customer_order SET fulfillment_claimed_at = NULL WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Record a purchased label and mark the order shipped.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` if the order does not exist
    /// - `RepositoryError::Conflict` if the order cannot be shipped from its
    ///   current status
    pub async fn mark_shipped(
        &self,
        id: OrderId,
        shipment: &Shipment,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (current, _) = lock_order_row(&mut tx, id).await?;
        ensure_transition(current, OrderStatus::Shipped)?;

        sqlx::query(
            r"
            UPDATE customer_order
            SET status = 'shipped',
                carrier = $2,
                service_level = $3,
                tracking_number = $4,
                label_url = $5,
                fulfillment_claimed_at = NULL,
                shipped_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&shipment.carrier)
        .bind(&shipment.service_level)
        .bind(&shipment.tracking_number)
        .bind(&shipment.label_url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }
}

/// Lock an order row and return its status and number.
async fn lock_order_row(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
) -> Result<(OrderStatus, String), RepositoryError> {
    sqlx::query_as::<_, (OrderStatus, String)>(
        "SELECT status, order_number FROM customer_order WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(RepositoryError::NotFound)
}

fn ensure_transition(current: OrderStatus, next: OrderStatus) -> Result<(), RepositoryError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(RepositoryError::Conflict(format!(
            "cannot move order from {current} to {next}"
        )))
    }
}

/// Put a cancelled order's units back on the shelf, locking sizes in
/// [`lock_order`](qyve_core::inventory::lock_order) like checkout does.
async fn restock_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    order_number: &str,
    actor: &str,
) -> Result<(), RepositoryError> {
    let mut lines: Vec<(ProductId, String, i32)> = sqlx::query_as(
        "SELECT product_id, size, quantity FROM order_item WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;
    lock_order(&mut lines, |(product_id, size, _)| (*product_id, size.as_str()));

    for (product_id, size, quantity) in lines {
        let Some(locked) = lock_size(tx, product_id, &size).await? else {
            tracing::warn!(
                order_number = %order_number,
                product_id = %product_id,
                size = %size,
                "Size no longer exists, skipping restock"
            );
            continue;
        };

        let change = locked
            .level()
            .and_then(|level| level.apply(i64::from(quantity)))
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        write_change(
            tx,
            &locked,
            &NewMovement {
                product_id,
                movement_type: MovementType::Return,
                change,
                reason: Some(RESTOCK_REASON),
                reference: Some(order_number),
                actor,
            },
        )
        .await?;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_restock_locks_in_checkout_order() {
        let mut lines = vec![
            (ProductId::new(2), "M".to_string(), 1),
            (ProductId::new(1), "xl".to_string(), 2),
            (ProductId::new(1), "L".to_string(), 1),
        ];
        lock_order(&mut lines, |(product_id, size, _)| (*product_id, size.as_str()));
        let order: Vec<(i64, &str)> = lines
            .iter()
            .map(|(id, size, _)| (id.as_i64(), size.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "L"), (1, "xl"), (2, "M")]);
    }

    #[test]
    fn test_fulfillment_claim_expires() {
        let now = Utc::now();
        assert!(!claim_is_live(None, now));
        assert!(claim_is_live(Some(now - chrono::Duration::minutes(2)), now));
        assert!(!claim_is_live(
            Some(now - chrono::Duration::minutes(FULFILLMENT_CLAIM_TTL_MINUTES)),
            now
        ));
    }

    #[test]
    fn test_ensure_transition() {
        assert!(ensure_transition(OrderStatus::Paid, OrderStatus::Shipped).is_ok());
        let err = ensure_transition(OrderStatus::Delivered, OrderStatus::Paid).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg.contains("delivered to paid")));
    }
}
