//! QYVE admin library.
//!
//! The back-office JSON API: stock control, order and refund handling,
//! pre-orders, subscribers and carrier shipping. Exposed as a library so the
//! router can be exercised in tests and the CLI can share the inventory rules.
//!
//! # Security
//!
//! Every API route requires the `ADMIN_API_TOKEN` bearer token. Bind to a
//! private interface; the default host is `127.0.0.1`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod shipping;
pub mod state;
