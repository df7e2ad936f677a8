//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per request)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded into the span and Sentry scope)
//! 4. CORS (the web front-end origin)
//! 5. Rate limiting on write routes (governor)

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{api_rate_limiter, write_rate_limiter};
pub use request_id::request_id_middleware;
