//! Integration tests for the refund flow across both APIs.
//!
//! These tests require:
//! - A migrated and seeded `PostgreSQL` database
//! - The storefront and admin servers running
//! - `ADMIN_API_TOKEN` matching the admin server
//!
//! Run with: cargo test -p qyve-integration-tests -- --ignored

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

use qyve_integration_tests::{TestContext, count_status, send_concurrently, unique_email};

/// Place an order and walk it to `delivered` through the admin API.
async fn delivered_order(ctx: &TestContext, email: &str) -> Value {
    let (product_id, size) = ctx.stocked_size(1).await;

    let resp = ctx
        .place_order(email, &[(product_id, size.as_str(), 1)])
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.expect("Order is not JSON");
    let order_id = order["id"].as_i64().expect("Order has no id");

    for status in ["paid", "shipped", "delivered"] {
        let resp = ctx
            .admin(Method::PATCH, &format!("/api/orders/{order_id}/status"))
            .json(&json!({ "status": status }))
            .send()
            .await
            .expect("Failed to update order status");
        assert_eq!(resp.status(), StatusCode::OK, "moving order to {status}");
    }

    order
}

#[tokio::test]
#[ignore = "Requires running servers and database"]
async fn test_duplicate_refund_request_is_conflict() {
    let ctx = TestContext::from_env();
    let email = unique_email("refund");
    let order = delivered_order(&ctx, &email).await;

    let request = json!({
        "order_number": order["order_number"],
        "customer_email": email,
        "reason": "Too small",
    });

    let first = ctx
        .storefront(Method::POST, "/api/refunds")
        .json(&request)
        .send()
        .await
        .expect("Failed to request refund");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = ctx
        .storefront(Method::POST, "/api/refunds")
        .json(&request)
        .send()
        .await
        .expect("Failed to request refund");
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running servers and database"]
async fn test_simultaneous_refund_requests_yield_one_conflict() {
    let ctx = TestContext::from_env();
    let email = unique_email("race");
    let order = delivered_order(&ctx, &email).await;

    let request = json!({
        "order_number": order["order_number"],
        "customer_email": email,
        "reason": "Wrong colour",
    });
    let requests = (0..2)
        .map(|_| ctx.storefront(Method::POST, "/api/refunds").json(&request))
        .collect();
    let statuses = send_concurrently(requests).await;

    assert_eq!(count_status(&statuses, StatusCode::CREATED), 1, "{statuses:?}");
    assert_eq!(count_status(&statuses, StatusCode::CONFLICT), 1, "{statuses:?}");
}

#[tokio::test]
#[ignore = "Requires running servers and database"]
async fn test_refund_before_delivery_is_rejected() {
    let ctx = TestContext::from_env();
    let email = unique_email("early");
    let (product_id, size) = ctx.stocked_size(1).await;

    let order: Value = ctx
        .place_order(&email, &[(product_id, size.as_str(), 1)])
        .send()
        .await
        .expect("Failed to place order")
        .json()
        .await
        .expect("Order is not JSON");

    let resp = ctx
        .storefront(Method::POST, "/api/refunds")
        .json(&json!({
            "order_number": order["order_number"],
            "customer_email": email,
            "reason": "Changed my mind",
        }))
        .send()
        .await
        .expect("Failed to request refund");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running servers and database"]
async fn test_processing_refund_marks_order_refunded() {
    let ctx = TestContext::from_env();
    let email = unique_email("processed");
    let order = delivered_order(&ctx, &email).await;

    let refund: Value = ctx
        .storefront(Method::POST, "/api/refunds")
        .json(&json!({
            "order_number": order["order_number"],
            "customer_email": email,
            "reason": "Defective seam",
        }))
        .send()
        .await
        .expect("Failed to request refund")
        .json()
        .await
        .expect("Refund is not JSON");
    let refund_id = refund["id"].as_i64().expect("Refund has no id");

    for status in ["approved", "processed"] {
        let resp = ctx
            .admin(Method::PATCH, &format!("/api/refunds/{refund_id}"))
            .json(&json!({ "status": status }))
            .send()
            .await
            .expect("Failed to review refund");
        assert_eq!(resp.status(), StatusCode::OK, "moving refund to {status}");
    }

    let detail: Value = ctx
        .admin(Method::GET, &format!("/api/orders/{}", order["id"]))
        .send()
        .await
        .expect("Failed to fetch order")
        .json()
        .await
        .expect("Order is not JSON");
    assert_eq!(detail["status"], "refunded");
    assert_eq!(detail["payment_status"], "refunded");
}
