//! Newsletter subscriber model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qyve_core::{Email, SubscriberId, SubscriptionStatus};

/// A newsletter subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub status: SubscriptionStatus,
    pub source: Option<String>,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}
