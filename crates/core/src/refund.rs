//! Refund eligibility.
//!
//! A customer may open one refund request per order, and only while the
//! order is within the refund window counted from its delivery timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Window enforced when no override is configured.
pub const DEFAULT_REFUND_WINDOW_DAYS: i64 = 7;

/// Why an order cannot be refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum RefundError {
    /// The order has no delivery timestamp yet.
    #[error("order has not been delivered yet")]
    NotDelivered,
    /// The window has closed.
    #[error("refund window of {window_days} days has expired ({days_since_delivery} days since delivery)")]
    WindowExpired {
        /// Configured window.
        window_days: i64,
        /// Whole days elapsed since delivery.
        days_since_delivery: i64,
    },
    /// A request already exists for this order and customer.
    #[error("a refund request already exists for this order")]
    AlreadyRequested,
}

/// Result of an eligibility check, returned as-is by the eligibility endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundEligibility {
    /// Whether a new request would be accepted.
    pub eligible: bool,
    /// Whole days elapsed since delivery, if delivered.
    pub days_since_delivery: Option<i64>,
    /// Days left in the window (zero once expired), if delivered.
    pub days_remaining: Option<i64>,
    /// The reason a request would be refused.
    pub reason: Option<RefundError>,
}

/// Refund window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundPolicy {
    /// Inclusive number of whole days after delivery during which requests are accepted.
    pub window_days: i64,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_REFUND_WINDOW_DAYS,
        }
    }
}

impl RefundPolicy {
    /// Create a policy with a custom window.
    #[must_use]
    pub const fn new(window_days: i64) -> Self {
        Self { window_days }
    }

    /// Whole days elapsed between delivery and `now`, floored.
    ///
    /// A delivery timestamp in the future (clock skew) counts as day zero.
    #[must_use]
    pub fn days_since(delivered_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        (now - delivered_at).num_days().max(0)
    }

    /// Evaluate eligibility without failing.
    ///
    /// An existing request takes precedence over the other reasons so a
    /// customer who already asked sees that rather than a window message.
    #[must_use]
    pub fn evaluate(
        &self,
        delivered_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        existing_request: bool,
    ) -> RefundEligibility {
        let days_since_delivery = delivered_at.map(|at| Self::days_since(at, now));
        let days_remaining = days_since_delivery.map(|days| (self.window_days - days).max(0));

        let reason = if existing_request {
            Some(RefundError::AlreadyRequested)
        } else {
            match days_since_delivery {
                None => Some(RefundError::NotDelivered),
                Some(days) if days > self.window_days => Some(RefundError::WindowExpired {
                    window_days: self.window_days,
                    days_since_delivery: days,
                }),
                Some(_) => None,
            }
        };

        RefundEligibility {
            eligible: reason.is_none(),
            days_since_delivery,
            days_remaining,
            reason,
        }
    }

    /// Evaluate eligibility, failing with the refusal reason.
    ///
    /// # Errors
    ///
    /// Returns the [`RefundError`] that makes the order ineligible.
    pub fn check(
        &self,
        delivered_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        existing_request: bool,
    ) -> Result<RefundEligibility, RefundError> {
        let eligibility = self.evaluate(delivered_at, now, existing_request);
        match eligibility.reason {
            Some(reason) => Err(reason),
            None => Ok(eligibility),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn delivered() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_eligible_on_delivery_day() {
        let policy = RefundPolicy::default();
        let result = policy.evaluate(Some(delivered()), delivered() + Duration::hours(3), false);
        assert!(result.eligible);
        assert_eq!(result.days_since_delivery, Some(0));
        assert_eq!(result.days_remaining, Some(7));
    }

    #[test]
    fn test_window_is_inclusive_of_last_day() {
        let policy = RefundPolicy::default();
        let now = delivered() + Duration::days(7) + Duration::hours(23);
        let result = policy.evaluate(Some(delivered()), now, false);
        assert!(result.eligible);
        assert_eq!(result.days_remaining, Some(0));
    }

    #[test]
    fn test_window_expired() {
        let policy = RefundPolicy::default();
        let now = delivered() + Duration::days(8);
        assert_eq!(
            policy.check(Some(delivered()), now, false),
            Err(RefundError::WindowExpired {
                window_days: 7,
                days_since_delivery: 8
            })
        );
    }

    #[test]
    fn test_custom_window() {
        let policy = RefundPolicy::new(30);
        let now = delivered() + Duration::days(20);
        assert!(policy.check(Some(delivered()), now, false).is_ok());
    }

    #[test]
    fn test_not_delivered() {
        let result = RefundPolicy::default().evaluate(None, delivered(), false);
        assert!(!result.eligible);
        assert_eq!(result.reason, Some(RefundError::NotDelivered));
        assert_eq!(result.days_remaining, None);
    }

    #[test]
    fn test_duplicate_request_is_never_eligible() {
        let policy = RefundPolicy::default();
        let within_window = delivered() + Duration::days(1);
        assert_eq!(
            policy.check(Some(delivered()), within_window, true),
            Err(RefundError::AlreadyRequested)
        );
        assert_eq!(
            policy.check(None, within_window, true),
            Err(RefundError::AlreadyRequested)
        );
    }

    #[test]
    fn test_future_delivery_counts_as_day_zero() {
        let now = delivered() - Duration::hours(2);
        assert_eq!(RefundPolicy::days_since(delivered(), now), 0);
    }

    #[test]
    fn test_reason_serializes_for_api() {
        let json = serde_json::to_value(RefundError::AlreadyRequested).unwrap();
        assert_eq!(json, serde_json::json!("already_requested"));
    }
}
