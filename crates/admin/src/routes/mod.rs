//! HTTP route handlers for admin.
//!
//! Every route under `/api` requires `Authorization: Bearer <ADMIN_API_TOKEN>`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness
//! GET  /health/ready                            - Database readiness
//!
//! # Inventory
//! GET  /api/inventory                           - Stock per size (?low_stock_only=&threshold=)
//! POST /api/inventory/adjust                    - Signed adjustment
//! POST /api/inventory/set                       - Absolute set
//! GET  /api/inventory/history                   - Movements (?product_id=&size=&limit=)
//!
//! # Orders
//! GET   /api/orders                             - Order list (?status=&page=&per_page=)
//! GET   /api/orders/{id}                        - Order with items
//! PATCH /api/orders/{id}/status                 - Status transition
//!
//! # Refunds
//! GET   /api/refunds                            - Review queue (?status=)
//! GET   /api/refunds/{id}                       - One request
//! PATCH /api/refunds/{id}                       - Approve, reject or process
//!
//! # Pre-orders
//! GET   /api/preorders                          - Pre-orders (?status=)
//! PATCH /api/preorders/{id}                     - Status update
//!
//! # Newsletter
//! GET  /api/newsletter/subscribers              - Subscribers (?status=&page=&per_page=)
//!
//! # Shipping
//! POST /api/shipping/rates                      - Quote rates
//! POST /api/shipping/labels                     - Buy a label
//! GET  /api/shipping/track/{carrier}/{number}   - Tracking status
//! POST /api/shipping/orders/{id}/fulfill        - Automated fulfilment
//!
//! # Diagnostics
//! POST /api/diagnostics/email                   - Send a test email
//! GET  /api/diagnostics/shipping                - Probe the shipping provider
//! ```

pub mod diagnostics;
pub mod inventory;
pub mod newsletter;
pub mod orders;
pub mod preorders;
pub mod refunds;
pub mod shipping;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};

use crate::error::{AppError, Result};
use crate::middleware::require_admin;
use crate::state::AppState;

/// A trimmed, non-empty text field.
pub(crate) fn required_text(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Trim an optional field, treating blank as absent.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Inventory
        .route("/inventory", get(inventory::list))
        .route("/inventory/adjust", post(inventory::adjust))
        .route("/inventory/set", post(inventory::set))
        .route("/inventory/history", get(inventory::history))
        // Orders
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", patch(orders::update_status))
        // Refunds
        .route("/refunds", get(refunds::list))
        .route("/refunds/{id}", get(refunds::show).patch(refunds::review))
        // Pre-orders
        .route("/preorders", get(preorders::list))
        .route("/preorders/{id}", patch(preorders::update))
        // Newsletter
        .route("/newsletter/subscribers", get(newsletter::subscribers))
        // Shipping
        .route("/shipping/rates", post(shipping::rates))
        .route("/shipping/labels", post(shipping::purchase_label))
        .route(
            "/shipping/track/{carrier}/{tracking_number}",
            get(shipping::track),
        )
        .route("/shipping/orders/{id}/fulfill", post(shipping::fulfill))
        // Diagnostics
        .route("/diagnostics/email", post(diagnostics::test_email))
        .route("/diagnostics/shipping", get(diagnostics::shipping_probe))
}

/// Build the `/api` router behind the bearer-token guard.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api",
        api_routes().route_layer(from_fn_with_state(state, require_admin)),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use qyve_core::shipping::RatePreference;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AdminConfig;

    const TOKEN: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";

    /// State whose pool never connects; only valid for requests rejected before any query.
    fn offline_state() -> AppState {
        let config = AdminConfig {
            database_url: SecretString::from("postgres://localhost/qyve_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            api_token: SecretString::from(TOKEN),
            shop_url: "https://qyve.id".to_string(),
            shipping: None,
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
        let state = offline_state();
        let response = routes(state.clone())
            .with_state(state)
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    fn authed(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {TOKEN}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(optional_text(Some("   ".to_string())), None);
        assert_eq!(optional_text(None), None);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let request = Request::builder()
            .uri("/api/inventory")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_wrong_token_is_unauthorized() {
        let request = Request::builder()
            .uri("/api/orders")
            .header("authorization", "Bearer not-the-token")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (status, _) = send(authed("GET", "/api/nope", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blank_size_is_rejected_before_database() {
        let (status, body) = send(authed(
            "POST",
            "/api/inventory/adjust",
            r#"{"product_id": 1, "size": " ", "delta": -1}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "size is required");
    }

    #[tokio::test]
    async fn test_unknown_order_status_is_rejected() {
        let (status, _) = send(authed(
            "PATCH",
            "/api/orders/1/status",
            r#"{"status": "teleported"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_shipping_without_provider_is_unavailable() {
        let body = serde_json::json!({
            "to": {
                "name": "Sari", "street1": "Jl. Merdeka 1", "city": "Bandung",
                "postal_code": "40111", "country": "ID"
            },
            "weight_grams": 800,
            "preference": RatePreference::Cheapest,
        });
        let (status, body) =
            send(authed("POST", "/api/shipping/rates", &body.to_string())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_diagnostics_email_without_smtp_is_unavailable() {
        let (status, _) = send(authed(
            "POST",
            "/api/diagnostics/email",
            r#"{"to": "ops@qyve.id"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
