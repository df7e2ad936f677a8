//! Domain models for the storefront API.
//!
//! These are the validated shapes handlers work with and return as JSON.
//! Database row types live next to their queries in [`crate::db`].

pub mod order;
pub mod preorder;
pub mod product;
pub mod refund;
pub mod subscriber;
