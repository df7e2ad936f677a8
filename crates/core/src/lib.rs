//! QYVE Core - shared types and business rules.
//!
//! This crate is used by every QYVE component:
//! - `storefront` - Public JSON API (products, orders, refunds, pre-orders, newsletter)
//! - `admin` - Back-office JSON API (inventory, refund review, shipping)
//! - `cli` - Migrations, seeding and shell stock adjustments
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. The binaries load state from Postgres, hand it to
//! these rules, and persist whatever the rules decide.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, money and status enums
//! - [`inventory`] - Stock adjustment with a floor of zero
//! - [`refund`] - Refund eligibility window
//! - [`shipping`] - Parcels, carrier rates and rate selection

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod inventory;
pub mod refund;
pub mod shipping;
pub mod types;

pub use types::*;
