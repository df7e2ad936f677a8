//! Stock adjustment from the command line.
//!
//! Goes through the admin inventory repository, so the non-negative rule and
//! the movement row are identical to `POST /api/inventory/adjust`.

use thiserror::Error;

use qyve_admin::db::{InventoryRepository, StockUpdateError};
use qyve_admin::models::inventory::StockUpdate;
use qyve_core::ProductId;

use super::{CommandError, connect};

/// Actor recorded on movements made from the CLI.
const CLI_ACTOR: &str = "cli";

#[derive(Debug, Error)]
pub enum StockError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Update(#[from] StockUpdateError),

    #[error("size must not be blank")]
    BlankSize,
}

fn update_for(product: i64, size: &str, reason: Option<String>) -> Result<StockUpdate, StockError> {
    let size = size.trim();
    if size.is_empty() {
        return Err(StockError::BlankSize);
    }

    Ok(StockUpdate {
        product_id: ProductId::new(product),
        size: size.to_string(),
        reason: reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
        reference: None,
        actor: CLI_ACTOR.to_string(),
    })
}

/// Apply `delta` to one product size.
///
/// # Errors
///
/// Returns an error if the size does not exist, the change would take stock
/// below zero, or the database is unreachable.
pub async fn adjust(
    product: i64,
    size: &str,
    delta: i64,
    reason: Option<String>,
) -> Result<(), StockError> {
    let update = update_for(product, size, reason)?;
    let pool = connect().await?;

    let movement = InventoryRepository::new(&pool)
        .adjust(&update, delta)
        .await?;

    tracing::info!(
        product_id = product,
        size = %movement.size,
        previous = movement.previous_stock,
        new = movement.new_stock,
        "Stock adjusted"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_for_trims_and_tags_cli() {
        let update = update_for(7, " L ", Some(" stocktake ".to_string())).unwrap();
        assert_eq!(update.size, "L");
        assert_eq!(update.reason.as_deref(), Some("stocktake"));
        assert_eq!(update.actor, CLI_ACTOR);
    }

    #[test]
    fn test_blank_size_is_rejected() {
        assert!(matches!(update_for(7, "  ", None), Err(StockError::BlankSize)));
    }
}
