//! Domain models for the back-office API.
//!
//! Models whose columns map one-to-one onto a table derive `sqlx::FromRow`
//! directly; the rest are assembled from row types in [`crate::db`].

pub mod inventory;
pub mod order;
pub mod preorder;
pub mod refund;
pub mod subscriber;

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints.
pub const DEFAULT_PER_PAGE: u32 = 25;

/// Largest page size a caller may ask for.
pub const MAX_PER_PAGE: u32 = 100;

/// `?page=&per_page=` query parameters, 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl Pagination {
    /// Page number, at least 1.
    #[must_use]
    pub fn page(self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn per_page(self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Rows to skip for the current page.
    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }

    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.per_page())
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        Self {
            items,
            page: pagination.page(),
            per_page: pagination.per_page(),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), MAX_PER_PAGE);

        let p = Pagination {
            page: Some(3),
            per_page: Some(20),
        };
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }
}
