//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Database readiness
//!
//! # Catalogue
//! GET  /api/products                    - Active products (?category=)
//! GET  /api/products/{slug}             - One product
//! GET  /api/stock/{product_id}          - Stock per size (?size=)
//!
//! # Orders
//! POST /api/orders                      - Place an order
//! GET  /api/orders/{order_number}       - Order status (?email=)
//!
//! # Refunds
//! POST /api/refunds                     - Request a refund
//! GET  /api/refunds/eligibility         - Eligibility (?order_number=&email=)
//! GET  /api/refunds                     - A customer's requests (?email=)
//!
//! # Pre-orders
//! POST /api/preorders                   - Submit a pre-order
//!
//! # Newsletter
//! POST /api/newsletter/subscribe
//! POST /api/newsletter/unsubscribe
//! ```

pub mod newsletter;
pub mod orders;
pub mod preorders;
pub mod products;
pub mod refunds;

use axum::{
    Router,
    routing::{get, post},
};

use qyve_core::Email;

use crate::error::{AppError, Result};
use crate::middleware::{api_rate_limiter, write_rate_limiter};
use crate::state::AppState;

/// Parse a customer-supplied email into the normalized form.
pub(crate) fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw).map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))
}

/// A trimmed, non-empty text field.
pub(crate) fn required_text(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Routes that create rows; strictly rate limited.
fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(orders::create))
        .route("/refunds", post(refunds::create))
        .route("/preorders", post(preorders::create))
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .route("/newsletter/unsubscribe", post(newsletter::unsubscribe))
        .layer(write_rate_limiter())
}

/// Catalogue and lookup routes.
fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list))
        .route("/products/{slug}", get(products::show))
        .route("/stock/{product_id}", get(products::stock))
        .route("/orders/{order_number}", get(orders::show))
        .route("/refunds", get(refunds::list))
        .route("/refunds/eligibility", get(refunds::eligibility))
        .layer(api_rate_limiter())
}

/// Build the `/api` router.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/api", write_routes().merge(read_routes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::SocketAddr;

    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;

    /// State whose pool never connects; only valid for requests rejected before any query.
    fn offline_state() -> AppState {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/qyve_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://qyve.id".to_string(),
            allowed_origin: None,
            refund_policy: qyve_core::refund::RefundPolicy::default(),
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/qyve_test")
            .unwrap();
        AppState::new(config, pool).unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let mut request = request;
        let peer: SocketAddr = "192.0.2.1:40000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        let response = routes()
            .with_state(offline_state())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_parse_email_normalizes() {
        assert_eq!(parse_email(" A@B.co ").unwrap().as_str(), "a@b.co");
        assert!(matches!(parse_email("nope"), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_order_with_no_items_is_rejected() {
        let body = r#"{
            "customer_email": "rani@example.com",
            "customer_name": "Rani",
            "shipping_address": {
                "name": "Rani", "street1": "Jl. Sudirman 1", "city": "Jakarta",
                "postal_code": "10220", "country": "ID"
            },
            "items": []
        }"#;
        let (status, body) = send(post_json("/api/orders", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("at least one item"));
    }

    #[tokio::test]
    async fn test_malformed_json_gets_json_error() {
        let (status, body) = send(post_json("/api/refunds", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_email_query_is_rejected() {
        let request = Request::builder()
            .uri("/api/refunds?email=not-an-email")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid email"));
    }

    #[tokio::test]
    async fn test_newsletter_rejects_bad_email() {
        let (status, _) = send(post_json(
            "/api/newsletter/subscribe",
            r#"{"email":"someone@localhost"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
