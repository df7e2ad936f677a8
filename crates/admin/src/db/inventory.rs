//! Stock levels and the movement ledger.
//!
//! Every change locks the `product_size` row with `FOR UPDATE`, asks
//! [`StockLevel`] for the new count, then writes the count and its movement
//! row in the same transaction. Concurrent adjustments to one size therefore
//! serialise and the count can never be driven below zero.

use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use qyve_core::inventory::{InventoryError, StockChange, StockLevel};
use qyve_core::{MovementType, ProductId};

use super::RepositoryError;
use crate::models::inventory::{HistoryFilter, StockItem, StockMovement, StockUpdate};

/// Errors from a stock change.
#[derive(Debug, Error)]
pub enum StockUpdateError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The stock rule refused the change.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// No such product size.
    #[error("product {product_id} has no size {size}")]
    UnknownSize { product_id: ProductId, size: String },
}

impl From<sqlx::Error> for StockUpdateError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

const MOVEMENT_COLUMNS: &str = r"
    id, product_id, size, movement_type, quantity_change,
    previous_stock, new_stock, reason, reference, created_by, created_at
";

/// A locked `product_size` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LockedSize {
    id: i64,
    /// Size label as stored, whatever case the caller used.
    pub(crate) size: String,
    stock_quantity: i32,
}

impl LockedSize {
    pub(crate) fn level(&self) -> Result<StockLevel, InventoryError> {
        StockLevel::new(self.stock_quantity)
    }
}

/// Lock one size row for the rest of the transaction.
pub(crate) async fn lock_size(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    size: &str,
) -> Result<Option<LockedSize>, sqlx::Error> {
    sqlx::query_as::<_, LockedSize>(
        r"
        SELECT id, size, stock_quantity
        FROM product_size
        WHERE product_id = $1 AND lower(size) = lower($2)
        FOR UPDATE
        ",
    )
    .bind(product_id)
    .bind(size)
    .fetch_optional(&mut **tx)
    .await
}

/// A ledger row about to be written.
pub(crate) struct NewMovement<'a> {
    pub(crate) product_id: ProductId,
    pub(crate) movement_type: MovementType,
    pub(crate) change: StockChange,
    pub(crate) reason: Option<&'a str>,
    pub(crate) reference: Option<&'a str>,
    pub(crate) actor: &'a str,
}

/// Persist an accepted change and append its ledger row.
pub(crate) async fn write_change(
    tx: &mut Transaction<'_, Postgres>,
    locked: &LockedSize,
    movement: &NewMovement<'_>,
) -> Result<StockMovement, sqlx::Error> {
    sqlx::query("UPDATE product_size SET stock_quantity = $1, updated_at = NOW() WHERE id = $2")
        .bind(movement.change.new)
        .bind(locked.id)
        .execute(&mut **tx)
        .await?;

    sqlx::query_as::<_, StockMovement>(&format!(
        r"
        INSERT INTO stock_movement (
            product_id, size, movement_type, quantity_change,
            previous_stock, new_stock, reason, reference, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {MOVEMENT_COLUMNS}
        "
    ))
    .bind(movement.product_id)
    .bind(&locked.size)
    .bind(movement.movement_type)
    .bind(movement.change.delta)
    .bind(movement.change.previous)
    .bind(movement.change.new)
    .bind(movement.reason)
    .bind(movement.reference)
    .bind(movement.actor)
    .fetch_one(&mut **tx)
    .await
}

/// Repository for stock levels and movements.
pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Stock per product size, flagged against `threshold`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        low_stock_only: bool,
        threshold: i32,
    ) -> Result<Vec<StockItem>, RepositoryError> {
        let mut items = sqlx::query_as::<_, StockItem>(
            r"
            SELECT
                s.product_id, p.name AS product_name, p.slug AS product_slug,
                s.size, s.stock_quantity, s.updated_at
            FROM product_size s
            JOIN product p ON p.id = s.product_id
            WHERE NOT $1 OR s.stock_quantity <= $2
            ORDER BY s.stock_quantity ASC, p.name, s.id
            ",
        )
        .bind(low_stock_only)
        .bind(threshold)
        .fetch_all(self.pool)
        .await?;

        for item in &mut items {
            item.low_stock = qyve_core::inventory::is_low_stock(item.stock_quantity, threshold);
        }
        Ok(items)
    }

    /// Apply a signed delta to one size.
    ///
    /// # Errors
    ///
    /// - `StockUpdateError::Inventory` if the delta is zero or would leave
    ///   negative stock; nothing is written
    /// - `StockUpdateError::UnknownSize` if the size does not exist
    pub async fn adjust(
        &self,
        update: &StockUpdate,
        delta: i64,
    ) -> Result<StockMovement, StockUpdateError> {
        self.change(update, MovementType::Adjustment, |level| level.apply(delta))
            .await
    }

    /// Replace one size's count, e.g. after a stocktake.
    ///
    /// # Errors
    ///
    /// Same as [`InventoryRepository::adjust`]; negative counts are refused.
    pub async fn set(
        &self,
        update: &StockUpdate,
        quantity: i64,
    ) -> Result<StockMovement, StockUpdateError> {
        self.change(update, MovementType::Set, |level| level.set(quantity))
            .await
    }

    async fn change<F>(
        &self,
        update: &StockUpdate,
        movement_type: MovementType,
        rule: F,
    ) -> Result<StockMovement, StockUpdateError>
    where
        F: FnOnce(StockLevel) -> Result<StockChange, InventoryError>,
    {
        let mut tx = self.pool.begin().await?;

        let locked = lock_size(&mut tx, update.product_id, &update.size)
            .await?
            .ok_or_else(|| StockUpdateError::UnknownSize {
                product_id: update.product_id,
                size: update.size.clone(),
            })?;

        let change = locked.level().and_then(rule)?;

        let movement = write_change(
            &mut tx,
            &locked,
            &NewMovement {
                product_id: update.product_id,
                movement_type,
                change,
                reason: update.reason.as_deref(),
                reference: update.reference.as_deref(),
                actor: &update.actor,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %update.product_id,
            size = %locked.size,
            movement = %movement_type,
            previous = change.previous,
            new = change.new,
            actor = %update.actor,
            "Stock changed"
        );

        Ok(movement)
    }

    /// Most recent movements first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn history(
        &self,
        filter: &HistoryFilter,
    ) -> Result<Vec<StockMovement>, RepositoryError> {
        let rows = sqlx::query_as::<_, StockMovement>(&format!(
            r"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movement
            WHERE ($1::BIGINT IS NULL OR product_id = $1)
              AND ($2::TEXT IS NULL OR lower(size) = lower($2))
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "
        ))
        .bind(filter.product_id)
        .bind(filter.size.as_deref())
        .bind(filter.limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
