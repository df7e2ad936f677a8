//! Back-office services.
//!
//! - `email` - Customer notifications via SMTP
//! - `fulfillment` - Order to label to shipped pipeline

pub mod email;
pub mod fulfillment;

pub use email::{EmailError, EmailService};
