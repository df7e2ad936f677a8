//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::config::AdminConfig;
use crate::services::email::EmailService;
use crate::shipping::{ShippingClient, ShippingError};

/// Errors building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("email setup failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("shipping setup failed: {0}")]
    Shipping(#[from] ShippingError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Email and shipping are optional integrations;
/// routes that need one answer 503 when it is absent.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    email: Option<EmailService>,
    shipping: Option<ShippingClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured integration cannot be set up.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, StateError> {
        let email = config
            .email
            .as_ref()
            .map(|email_config| EmailService::new(email_config, &config.shop_url))
            .transpose()?;
        if email.is_none() {
            tracing::warn!("SMTP_HOST not set, customer notifications are disabled");
        }

        let shipping = config
            .shipping
            .as_ref()
            .map(ShippingClient::new)
            .transpose()?;
        if shipping.is_none() {
            tracing::warn!("SHIPPING_API_TOKEN not set, shipping routes are disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                shipping,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// The shipping client, if the provider is configured.
    #[must_use]
    pub fn shipping(&self) -> Option<&ShippingClient> {
        self.inner.shipping.as_ref()
    }
}
