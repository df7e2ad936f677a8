//! QYVE storefront library.
//!
//! The public JSON API behind the web shop: catalogue, stock, orders,
//! refunds, pre-orders and newsletter. Exposed as a library so the router can
//! be exercised in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
