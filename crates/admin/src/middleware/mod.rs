//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors)
//! 2. Request ID (`x-request-id`, set before tracing so the span can record it)
//! 3. `TraceLayer` (request tracing)
//! 4. Auth guard on `/api` (bearer token, actor)

pub mod auth;

pub use auth::{ACTOR_HEADER, Actor, require_admin};
