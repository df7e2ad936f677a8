//! Newsletter subscriptions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use qyve_core::{Email, SubscriberId, SubscriptionStatus};

use super::RepositoryError;
use crate::models::subscriber::Subscriber;

/// What a subscribe call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// First time this address subscribed.
    Created,
    /// A previously unsubscribed address opted back in.
    Resubscribed,
    /// The address was already subscribed; nothing changed.
    AlreadySubscribed,
}

impl SubscribeOutcome {
    /// Whether the welcome email should go out.
    #[must_use]
    pub const fn is_new(self) -> bool {
        matches!(self, Self::Created | Self::Resubscribed)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: SubscriberId,
    email: Email,
    status: SubscriptionStatus,
    source: Option<String>,
    subscribed_at: DateTime<Utc>,
    unsubscribed_at: Option<DateTime<Utc>>,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            status: row.status,
            source: row.source,
            subscribed_at: row.subscribed_at,
            unsubscribed_at: row.unsubscribed_at,
        }
    }
}

/// Repository for newsletter subscribers.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    /// Create a new newsletter repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an address, reactivating it if it had unsubscribed.
    ///
    /// Subscribing twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subscribe(
        &self,
        email: &Email,
        source: Option<&str>,
    ) -> Result<(Subscriber, SubscribeOutcome), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, SubscriberRow>(
            r"
            SELECT id, email, status, source, subscribed_at, unsubscribed_at
            FROM newsletter_subscriber
            WHERE email = $1
            FOR UPDATE
            ",
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let (row, outcome) = match existing {
            Some(row) if row.status == SubscriptionStatus::Subscribed => {
                (row, SubscribeOutcome::AlreadySubscribed)
            }
            Some(row) => {
                let row = sqlx::query_as::<_, SubscriberRow>(
                    r"
                    UPDATE newsletter_subscriber
                    SET status = 'subscribed', subscribed_at = NOW(), unsubscribed_at = NULL,
                        source = COALESCE($2, source)
                    WHERE id = $1
                    RETURNING id, email, status, source, subscribed_at, unsubscribed_at
                    ",
                )
                .bind(row.id)
                .bind(source)
                .fetch_one(&mut *tx)
                .await?;
                (row, SubscribeOutcome::Resubscribed)
            }
            None => {
                // ON CONFLICT covers a concurrent first-time subscribe for the same address
                let row = sqlx::query_as::<_, SubscriberRow>(
                    r"
                    INSERT INTO newsletter_subscriber (email, source)
                    VALUES ($1, $2)
                    ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
                    RETURNING id, email, status, source, subscribed_at, unsubscribed_at
                    ",
                )
                .bind(email)
                .bind(source)
                .fetch_one(&mut *tx)
                .await?;
                (row, SubscribeOutcome::Created)
            }
        };

        tx.commit().await?;
        Ok((row.into(), outcome))
    }

    /// Mark an address unsubscribed.
    ///
    /// Returns `false` when the address was never subscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unsubscribe(&self, email: &Email) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE newsletter_subscriber
            SET status = 'unsubscribed',
                unsubscribed_at = COALESCE(unsubscribed_at, NOW())
            WHERE email = $1
            ",
        )
        .bind(email)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
