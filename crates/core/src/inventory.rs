//! Stock adjustment rules.
//!
//! A size's stock count never goes below zero. Callers read the current
//! count (row-locked), ask [`StockLevel`] for the change, then persist the new
//! count together with a movement row built from the returned
//! [`StockChange`].
//!
//! A transaction that locks several size rows must take the locks in
//! [`lock_order`], otherwise two writers can each hold a row the other wants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ProductId;

/// Why a stock change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Applying the delta would leave negative stock.
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock {
        /// Units currently on hand.
        available: i32,
        /// Units the change tried to remove.
        requested: i64,
    },
    /// A relative adjustment of zero units.
    #[error("adjustment delta must not be zero")]
    ZeroDelta,
    /// An absolute count below zero.
    #[error("stock quantity cannot be negative (got {0})")]
    NegativeQuantity(i64),
    /// The result does not fit the stock column.
    #[error("stock quantity out of range")]
    OutOfRange,
}

/// Units on hand for one product size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockLevel(i32);

impl StockLevel {
    /// Wrap a count read from the database.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::NegativeQuantity` for counts below zero.
    pub fn new(quantity: i32) -> Result<Self, InventoryError> {
        if quantity < 0 {
            return Err(InventoryError::NegativeQuantity(i64::from(quantity)));
        }
        Ok(Self(quantity))
    }

    /// The count as stored.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Whether at least `quantity` units can be taken.
    #[must_use]
    pub fn covers(self, quantity: i32) -> bool {
        quantity <= self.0
    }

    /// Apply a signed delta.
    ///
    /// An adjustment must move stock, so a zero delta is refused.
    ///
    /// # Errors
    ///
    /// - `ZeroDelta` when `delta == 0`
    /// - `InsufficientStock` when `current + delta < 0`
    /// - `OutOfRange` when the result overflows the column
    pub fn apply(self, delta: i64) -> Result<StockChange, InventoryError> {
        if delta == 0 {
            return Err(InventoryError::ZeroDelta);
        }

        let next = i64::from(self.0) + delta;
        if next < 0 {
            return Err(InventoryError::InsufficientStock {
                available: self.0,
                requested: -delta,
            });
        }
        let next = i32::try_from(next).map_err(|_| InventoryError::OutOfRange)?;

        Ok(StockChange {
            previous: self.0,
            new: next,
            delta: next - self.0,
        })
    }

    /// Replace the count outright, e.g. after a stocktake.
    ///
    /// Unlike [`StockLevel::apply`], a zero delta is accepted: setting the
    /// current value again confirms a count, and that confirmation is still
    /// recorded as a `set` movement.
    ///
    /// # Errors
    ///
    /// - `NegativeQuantity` when `quantity < 0`
    /// - `OutOfRange` when it does not fit the column
    pub fn set(self, quantity: i64) -> Result<StockChange, InventoryError> {
        if quantity < 0 {
            return Err(InventoryError::NegativeQuantity(quantity));
        }
        let next = i32::try_from(quantity).map_err(|_| InventoryError::OutOfRange)?;

        Ok(StockChange {
            previous: self.0,
            new: next,
            delta: next - self.0,
        })
    }

    /// Remove `quantity` units for a sale.
    ///
    /// # Errors
    ///
    /// Same as [`StockLevel::apply`] with `-quantity`.
    pub fn take(self, quantity: i32) -> Result<StockChange, InventoryError> {
        self.apply(-i64::from(quantity))
    }
}

/// Before/after balance of an accepted change, recorded on the movement row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    /// Count before the change.
    pub previous: i32,
    /// Count after the change.
    pub new: i32,
    /// `new - previous`.
    pub delta: i32,
}

/// Key that fixes the order in which `product_size` rows are locked.
///
/// Sizes compare case-insensitively, matching the `lower(size)` lookup.
#[must_use]
pub fn lock_key(product_id: ProductId, size: &str) -> (ProductId, String) {
    (product_id, size.to_lowercase())
}

/// Sort items into lock order by [`lock_key`].
pub fn lock_order<T>(items: &mut [T], key: impl Fn(&T) -> (ProductId, &str)) {
    items.sort_by_cached_key(|item| {
        let (product_id, size) = key(item);
        lock_key(product_id, size)
    });
}

/// Default threshold for low-stock highlighting in the back-office.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// Whether a count should be flagged as running low.
#[must_use]
pub const fn is_low_stock(quantity: i32, threshold: i32) -> bool {
    quantity <= threshold
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn level(n: i32) -> StockLevel {
        StockLevel::new(n).unwrap()
    }

    #[test]
    fn test_apply_positive_delta() {
        let change = level(3).apply(7).unwrap();
        assert_eq!(
            change,
            StockChange {
                previous: 3,
                new: 10,
                delta: 7
            }
        );
    }

    #[test]
    fn test_apply_down_to_exactly_zero() {
        let change = level(4).apply(-4).unwrap();
        assert_eq!(change.new, 0);
        assert_eq!(change.delta, -4);
    }

    #[test]
    fn test_apply_rejects_negative_result() {
        assert_eq!(
            level(2).apply(-3),
            Err(InventoryError::InsufficientStock {
                available: 2,
                requested: 3
            })
        );
    }

    #[test]
    fn test_stock_never_negative_over_any_sequence() {
        let deltas = [5, -3, -3, 10, -12, -1, 4, -4, -1, 100, -100];
        let mut current = level(0);
        for delta in deltas {
            if let Ok(change) = current.apply(delta) {
                assert!(change.new >= 0);
                assert_eq!(change.previous + change.delta, change.new);
                current = level(change.new);
            }
            assert!(current.get() >= 0);
        }
        assert_eq!(current.get(), 0);
    }

    #[test]
    fn test_apply_rejects_zero_and_overflow() {
        assert_eq!(level(1).apply(0), Err(InventoryError::ZeroDelta));
        assert_eq!(
            level(i32::MAX).apply(1),
            Err(InventoryError::OutOfRange)
        );
    }

    #[test]
    fn test_set_absolute() {
        let change = level(12).set(3).unwrap();
        assert_eq!(change.delta, -9);
        assert_eq!(
            level(1).set(-1),
            Err(InventoryError::NegativeQuantity(-1))
        );
        assert_eq!(level(4).set(4).unwrap().delta, 0);
    }

    #[test]
    fn test_take_and_covers() {
        let stock = level(2);
        assert!(stock.covers(2));
        assert!(!stock.covers(3));
        assert!(stock.take(3).is_err());
        assert_eq!(stock.take(2).unwrap().new, 0);
    }

    #[test]
    fn test_new_rejects_negative_count() {
        assert!(StockLevel::new(-1).is_err());
    }

    #[test]
    fn test_set_to_current_value_is_a_confirmation() {
        let change = level(4).set(4).unwrap();
        assert_eq!(
            change,
            StockChange {
                previous: 4,
                new: 4,
                delta: 0
            }
        );
        assert_eq!(level(4).apply(0), Err(InventoryError::ZeroDelta));
    }

    #[test]
    fn test_lock_order_ignores_request_order() {
        let p1 = ProductId::new(1);
        let p2 = ProductId::new(2);
        let mut forward = vec![(p1, "M"), (p2, "m"), (p1, "XL")];
        let mut reversed = vec![(p1, "xl"), (p2, "M"), (p1, "m")];
        lock_order(&mut forward, |&(id, size)| (id, size));
        lock_order(&mut reversed, |&(id, size)| (id, size));

        let keys = |items: &[(ProductId, &str)]| {
            items
                .iter()
                .map(|&(id, size)| lock_key(id, size))
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&forward), keys(&reversed));
        assert_eq!(
            keys(&forward),
            vec![
                (p1, "m".to_string()),
                (p1, "xl".to_string()),
                (p2, "m".to_string())
            ]
        );
    }

    #[test]
    fn test_low_stock() {
        assert!(is_low_stock(0, LOW_STOCK_THRESHOLD));
        assert!(is_low_stock(5, LOW_STOCK_THRESHOLD));
        assert!(!is_low_stock(6, LOW_STOCK_THRESHOLD));
    }
}
