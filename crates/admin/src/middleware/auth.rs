//! Bearer-token authentication for the admin API.
//!
//! Every `/api` route sits behind [`require_admin`], which compares the
//! `Authorization: Bearer <token>` header against `ADMIN_API_TOKEN` and puts
//! the acting [`Actor`] into the request extensions. Handlers that record who
//! did something extract [`Actor`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use crate::error::{AppError, set_sentry_actor};
use crate::state::AppState;

/// Header naming the person behind the shared token.
pub const ACTOR_HEADER: &str = "x-admin-user";

/// Actor used when no `x-admin-user` header is sent.
pub const DEFAULT_ACTOR: &str = "admin";

const MAX_ACTOR_LEN: usize = 64;

/// The authenticated caller, recorded on stock movements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Actor name from the header, trimmed to printable ASCII.
fn actor_from(parts: &Parts) -> String {
    parts
        .headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| {
            !name.is_empty()
                && name.len() <= MAX_ACTOR_LEN
                && name.chars().all(|c| c.is_ascii_graphic() || c == ' ')
        })
        .map_or_else(|| DEFAULT_ACTOR.to_string(), String::from)
}

/// Reject requests without the admin bearer token.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` (401) for a missing or wrong token.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();

    let expected = state.config().api_token.expose_secret().as_bytes();
    let authorized =
        bearer_token(&parts).is_some_and(|token| constant_time_eq(token.as_bytes(), expected));
    if !authorized {
        tracing::warn!(path = %parts.uri.path(), "Rejected admin request with missing or invalid token");
        return Err(AppError::Unauthorized(
            "missing or invalid bearer token".to_string(),
        ));
    }

    let actor = actor_from(&parts);
    set_sentry_actor(&actor);
    parts.extensions.insert(Actor(actor));

    Ok(next.run(Request::from_parts(parts, body)).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request as HttpRequest;

    use super::*;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = HttpRequest::builder().uri("/api/orders");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(
            bearer_token(&parts(&[("authorization", "Bearer tok123")])),
            Some("tok123")
        );
        assert_eq!(bearer_token(&parts(&[("authorization", "Basic abc")])), None);
        assert_eq!(bearer_token(&parts(&[])), None);
    }

    #[test]
    fn test_actor_defaults_and_sanitizes() {
        assert_eq!(actor_from(&parts(&[])), DEFAULT_ACTOR);
        assert_eq!(actor_from(&parts(&[(ACTOR_HEADER, "  dewi ")])), "dewi");
        let long = "x".repeat(MAX_ACTOR_LEN + 1);
        assert_eq!(actor_from(&parts(&[(ACTOR_HEADER, &long)])), DEFAULT_ACTOR);
    }
}
