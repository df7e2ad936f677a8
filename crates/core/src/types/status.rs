//! Status enums and their allowed transitions.
//!
//! Each enum maps to a Postgres enum type of the same snake_case name (see
//! `migrations/`), and serializes as snake_case in JSON.

use serde::{Deserialize, Serialize};

/// Implements `Display` and `FromStr` using the snake_case wire names.
macro_rules! status_strings {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The snake_case name used in JSON and Postgres.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(format!("invalid {}: {s}", stringify!($ty))),
                }
            }
        }
    };
}

/// Lifecycle of a customer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

status_strings!(OrderStatus {
    Pending => "pending",
    Paid => "paid",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl OrderStatus {
    /// Whether an admin may move an order from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid | Self::Cancelled)
                | (Self::Paid, Self::Processing | Self::Shipped | Self::Cancelled)
                | (Self::Processing, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
                | (Self::Delivered, Self::Refunded)
        )
    }

    /// Whether the order can be handed to a carrier.
    #[must_use]
    pub const fn is_fulfillable(self) -> bool {
        matches!(self, Self::Paid | Self::Processing)
    }
}

/// Payment state recorded against an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
    Failed,
}

status_strings!(PaymentStatus {
    Unpaid => "unpaid",
    Paid => "paid",
    Refunded => "refunded",
    Failed => "failed",
});

/// Review state of a refund request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "refund_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Processed,
}

status_strings!(RefundStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Processed => "processed",
});

impl RefundStatus {
    /// Whether a reviewer may move a request from `self` to `next`.
    ///
    /// `Rejected` and `Processed` are terminal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected) | (Self::Approved, Self::Processed)
        )
    }
}

/// State of a pre-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "preorder_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PreorderStatus {
    #[default]
    Pending,
    DepositPaid,
    Fulfilled,
    Cancelled,
}

status_strings!(PreorderStatus {
    Pending => "pending",
    DepositPaid => "deposit_paid",
    Fulfilled => "fulfilled",
    Cancelled => "cancelled",
});

impl PreorderStatus {
    /// Whether an admin may move a pre-order from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::DepositPaid | Self::Cancelled)
                | (Self::DepositPaid, Self::Fulfilled | Self::Cancelled)
        )
    }
}

/// Why a stock level changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "movement_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Manual signed adjustment from the back-office or CLI.
    Adjustment,
    /// Absolute stock count (stocktake).
    Set,
    /// Units sold through an order.
    Sale,
    /// Units put back after a cancellation or return.
    Return,
    /// New units received.
    Restock,
}

status_strings!(MovementType {
    Adjustment => "adjustment",
    Set => "set",
    Sale => "sale",
    Return => "return",
    Restock => "restock",
});

/// Newsletter subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "subscription_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Subscribed,
    Unsubscribed,
}

status_strings!(SubscriptionStatus {
    Subscribed => "subscribed",
    Unsubscribed => "unsubscribed",
});
