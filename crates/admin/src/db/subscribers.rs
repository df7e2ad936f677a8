//! Newsletter subscriber listing.

use sqlx::PgPool;

use qyve_core::SubscriptionStatus;

use super::RepositoryError;
use crate::models::subscriber::Subscriber;
use crate::models::{Page, Pagination};

pub struct SubscriberRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriberRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent sign-ups first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<SubscriptionStatus>,
        pagination: Pagination,
    ) -> Result<Page<Subscriber>, RepositoryError> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM newsletter_subscriber WHERE $1::subscription_status IS NULL OR status = $1",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let items = sqlx::query_as::<_, Subscriber>(
            r"
            SELECT id, email, status, source, subscribed_at, unsubscribed_at
            FROM newsletter_subscriber
            WHERE $1::subscription_status IS NULL OR status = $1
            ORDER BY subscribed_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(items, pagination, total))
    }
}
