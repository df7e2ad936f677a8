//! Services the storefront talks to beyond its own database.
//!
//! - `email` - transactional email (order confirmation, refund receipt,
//!   pre-order confirmation, newsletter welcome)

pub mod email;
