//! Integration tests for QYVE.
//!
//! # Running Tests
//!
//! ```bash
//! # Database with migrations and the sample catalogue
//! cargo run -p qyve-cli -- migrate
//! cargo run -p qyve-cli -- seed
//!
//! # Both servers
//! cargo run -p qyve-storefront &
//! cargo run -p qyve-admin &
//!
//! # Ignored tests only
//! cargo test -p qyve-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - default `http://localhost:3000`
//! - `ADMIN_BASE_URL` - default `http://localhost:3001`
//! - `ADMIN_API_TOKEN` - bearer token the admin server was started with
//!
//! Storefront requests carry a random `x-forwarded-for` address so each one
//! counts as a separate customer for the per-IP write limits.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};

/// Endpoints and credentials for a running pair of servers.
pub struct TestContext {
    pub client: Client,
    pub storefront_url: String,
    pub admin_url: String,
    admin_token: String,
}

impl TestContext {
    /// Read endpoints from the environment.
    ///
    /// # Panics
    ///
    /// Panics if `ADMIN_API_TOKEN` is not set.
    #[must_use]
    pub fn from_env() -> Self {
        let admin_token =
            std::env::var("ADMIN_API_TOKEN").expect("ADMIN_API_TOKEN must be set for admin tests");
        Self {
            client: Client::new(),
            storefront_url: std::env::var("STOREFRONT_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            admin_url: std::env::var("ADMIN_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            admin_token,
        }
    }

    /// Request to the public storefront API from a fresh client address.
    #[must_use]
    pub fn storefront(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.storefront_url))
            .header("x-forwarded-for", customer_ip())
    }

    /// Authenticated request to the admin API.
    #[must_use]
    pub fn admin(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.admin_url))
            .bearer_auth(&self.admin_token)
            .header("x-admin-user", "integration-tests")
    }

    /// Every in-stock-tracked size in the catalogue as `(product_id, size, stock)`.
    ///
    /// Pre-order products are skipped since they cannot be ordered directly.
    ///
    /// # Panics
    ///
    /// Panics if the catalogue cannot be fetched.
    pub async fn catalogue_sizes(&self) -> Vec<(i64, String, i64)> {
        let products: Value = self
            .storefront(Method::GET, "/api/products")
            .send()
            .await
            .and_then(Response::error_for_status)
            .unwrap_or_else(|e| panic!("failed to list products: {e}"))
            .json()
            .await
            .unwrap_or_else(|e| panic!("product list is not JSON: {e}"));

        products
            .as_array()
            .into_iter()
            .flatten()
            .filter(|p| p["is_preorder"] == false)
            .flat_map(|p| {
                let id = p["id"].as_i64();
                p["sizes"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(move |s| {
                        Some((id?, s["size"].as_str()?.to_string(), s["stock_quantity"].as_i64()?))
                    })
            })
            .collect()
    }

    /// First product size with at least `min_stock` units, as `(product_id, size)`.
    ///
    /// # Panics
    ///
    /// Panics if the catalogue cannot be fetched or no size has enough stock.
    pub async fn stocked_size(&self, min_stock: i64) -> (i64, String) {
        self.catalogue_sizes()
            .await
            .into_iter()
            .find(|(_, _, stock)| *stock >= min_stock)
            .map(|(id, size, _)| (id, size))
            .unwrap_or_else(|| panic!("no product size with {min_stock} units; run `qyve seed`"))
    }

    /// Units on hand for one size, read through the storefront.
    ///
    /// # Panics
    ///
    /// Panics if the stock endpoint fails.
    pub async fn stock_of(&self, product_id: i64, size: &str) -> i64 {
        let body: Value = self
            .storefront(Method::GET, &format!("/api/stock/{product_id}?size={size}"))
            .send()
            .await
            .and_then(Response::error_for_status)
            .unwrap_or_else(|e| panic!("failed to query stock: {e}"))
            .json()
            .await
            .unwrap_or_else(|e| panic!("stock response is not JSON: {e}"));
        body["sizes"][0]["stock_quantity"]
            .as_i64()
            .unwrap_or_else(|| panic!("stock response has no quantity: {body}"))
    }

    /// Overwrite a size's count through the admin API.
    ///
    /// # Panics
    ///
    /// Panics unless the admin API accepts the change.
    pub async fn set_stock(&self, product_id: i64, size: &str, quantity: i64) {
        let resp = self
            .admin(Method::POST, "/api/inventory/set")
            .json(&json!({
                "product_id": product_id,
                "size": size,
                "quantity": quantity,
                "reason": "integration test setup",
            }))
            .send()
            .await
            .unwrap_or_else(|e| panic!("failed to set stock: {e}"));
        assert_eq!(resp.status(), StatusCode::OK, "setting {product_id}/{size} to {quantity}");
    }

    /// Checkout request for `items` given as `(product_id, size, quantity)`.
    #[must_use]
    pub fn place_order(&self, email: &str, items: &[(i64, &str, i64)]) -> RequestBuilder {
        let items: Vec<Value> = items
            .iter()
            .map(|(product_id, size, quantity)| {
                json!({ "product_id": product_id, "size": size, "quantity": quantity })
            })
            .collect();
        self.storefront(Method::POST, "/api/orders").json(&json!({
            "customer_email": email,
            "customer_name": "Integration Test",
            "shipping_address": {
                "name": "Integration Test",
                "street1": "Jl. Sudirman 1",
                "city": "Jakarta",
                "postal_code": "10220",
                "country": "ID"
            },
            "items": items,
        }))
    }
}

/// Send every request at once and collect the response statuses.
///
/// # Panics
///
/// Panics if any request fails at the transport level.
pub async fn send_concurrently(requests: Vec<RequestBuilder>) -> Vec<StatusCode> {
    let mut set = tokio::task::JoinSet::new();
    for request in requests {
        set.spawn(request.send());
    }
    set.join_all()
        .await
        .into_iter()
        .map(|result| {
            result
                .unwrap_or_else(|e| panic!("request failed: {e}"))
                .status()
        })
        .collect()
}

/// How many of `statuses` equal `status`.
#[must_use]
pub fn count_status(statuses: &[StatusCode], status: StatusCode) -> usize {
    statuses.iter().filter(|s| **s == status).count()
}

/// Random address from the 198.18.0.0/15 benchmarking range.
fn customer_ip() -> String {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    format!("198.{}.{}.{}", 18 + (bytes[0] & 1), bytes[1], bytes[2].max(1))
}

/// A unique customer address so reruns never collide.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}+{}@example.com", uuid::Uuid::new_v4().simple())
}
