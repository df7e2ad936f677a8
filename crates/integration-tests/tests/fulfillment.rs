//! Integration tests for automated fulfilment.
//!
//! These tests require:
//! - A migrated and seeded `PostgreSQL` database
//! - The storefront and admin servers running
//! - The admin server configured against a shipping provider sandbox
//! - `ADMIN_API_TOKEN` matching the admin server
//!
//! Run with: cargo test -p qyve-integration-tests -- --ignored

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

use qyve_integration_tests::{TestContext, count_status, send_concurrently, unique_email};

#[tokio::test]
#[ignore = "Requires running servers, database and a shipping sandbox"]
async fn test_concurrent_fulfilment_buys_one_label() {
    let ctx = TestContext::from_env();
    let (product_id, size) = ctx.stocked_size(1).await;

    let resp = ctx
        .place_order(&unique_email("fulfil"), &[(product_id, size.as_str(), 1)])
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.expect("Order is not JSON");
    let order_id = order["id"].as_i64().expect("Order has no id");

    let resp = ctx
        .admin(Method::PATCH, &format!("/api/orders/{order_id}/status"))
        .json(&json!({ "status": "paid" }))
        .send()
        .await
        .expect("Failed to mark order paid");
    assert_eq!(resp.status(), StatusCode::OK);

    let path = format!("/api/shipping/orders/{order_id}/fulfill");
    let requests = (0..2).map(|_| ctx.admin(Method::POST, &path)).collect();
    let statuses = send_concurrently(requests).await;

    assert_eq!(count_status(&statuses, StatusCode::OK), 1, "{statuses:?}");
    assert_eq!(count_status(&statuses, StatusCode::CONFLICT), 1, "{statuses:?}");

    let detail: Value = ctx
        .admin(Method::GET, &format!("/api/orders/{order_id}"))
        .send()
        .await
        .expect("Failed to fetch order")
        .json()
        .await
        .expect("Order is not JSON");
    assert_eq!(detail["status"], "shipped");
    assert!(detail["tracking_number"].is_string());
}
