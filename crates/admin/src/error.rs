//! Unified error handling for admin.
//!
//! Every error body has the shape `{ "error": "<message>" }`. Server-side and
//! upstream failures are captured to Sentry; their details stay in the logs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use qyve_core::inventory::InventoryError;
use serde_json::json;
use thiserror::Error;

use crate::db::{RepositoryError, StockUpdateError};
use crate::services::EmailError;
use crate::shipping::ShippingError;

/// Application-level error type for the back-office API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Shipping provider call failed.
    #[error("Shipping error: {0}")]
    Shipping(ShippingError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The change conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An optional integration is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_string()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Database(other),
        }
    }
}

impl From<StockUpdateError> for AppError {
    fn from(err: StockUpdateError) -> Self {
        match err {
            StockUpdateError::Repository(e) => e.into(),
            StockUpdateError::Inventory(InventoryError::InsufficientStock { .. }) => {
                Self::Conflict(err.to_string())
            }
            StockUpdateError::Inventory(_) => Self::BadRequest(err.to_string()),
            StockUpdateError::UnknownSize { .. } => Self::NotFound(err.to_string()),
        }
    }
}

impl From<ShippingError> for AppError {
    fn from(err: ShippingError) -> Self {
        match err {
            ShippingError::NotFound(_) => Self::NotFound("shipment".to_string()),
            other => Self::Shipping(other),
        }
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shipping(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Shipping(e @ (ShippingError::NoRates(_) | ShippingError::LabelFailed(_))) => {
                e.to_string()
            }
            Self::Shipping(_) => "Shipping provider error".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::ServiceUnavailable(msg) => msg.clone(),
        }
    }

    const fn is_reportable(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Shipping(
                    ShippingError::Http(_)
                        | ShippingError::Api { .. }
                        | ShippingError::Unauthorized
                        | ShippingError::Parse(_)
                        | ShippingError::LabelFailed(_)
                )
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_reportable() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let body = Json(json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Tag the Sentry scope with the acting admin.
pub fn set_sentry_actor(actor: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(actor.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use qyve_core::ProductId;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_of(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 123".to_string());
        assert_eq!(err.to_string(), "Not found: order 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::ServiceUnavailable("test".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(ShippingError::Unauthorized.into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_stock_errors_map_to_status() {
        let shortage = StockUpdateError::Inventory(InventoryError::InsufficientStock {
            available: 2,
            requested: 5,
        });
        assert_eq!(get_status(shortage.into()), StatusCode::CONFLICT);

        let zero = StockUpdateError::Inventory(InventoryError::ZeroDelta);
        assert_eq!(get_status(zero.into()), StatusCode::BAD_REQUEST);

        let unknown = StockUpdateError::UnknownSize {
            product_id: ProductId::new(1),
            size: "XXL".to_string(),
        };
        assert_eq!(get_status(unknown.into()), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_tracking_not_found_is_404() {
        let err: AppError = ShippingError::NotFound("/tracks/jne/X".to_string()).into();
        assert_eq!(get_status(err), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_provider_details_are_hidden() {
        let err: AppError = ShippingError::Api {
            status: 500,
            message: "stack trace with token".to_string(),
        }
        .into();
        assert_eq!(body_of(err).await["error"], "Shipping provider error");
    }

    #[tokio::test]
    async fn test_no_rates_message_is_shown() {
        let err: AppError = ShippingError::NoRates("Destination not serviced".to_string()).into();
        let body = body_of(err).await;
        assert!(body["error"].as_str().unwrap().contains("Destination not serviced"));
    }
}
