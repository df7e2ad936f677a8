//! Integration tests for admin stock control.
//!
//! These tests require:
//! - A migrated and seeded `PostgreSQL` database
//! - The storefront and admin servers running
//! - `ADMIN_API_TOKEN` matching the admin server
//!
//! Run with: cargo test -p qyve-integration-tests -- --ignored

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

use qyve_integration_tests::{TestContext, count_status, send_concurrently};

#[tokio::test]
#[ignore = "Requires running servers and database"]
async fn test_api_requires_bearer_token() {
    let ctx = TestContext::from_env();
    let resp = ctx
        .client
        .get(format!("{}/api/inventory", ctx.admin_url))
        .send()
        .await
        .expect("Failed to call admin API");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running servers and database"]
async fn test_stock_never_goes_negative() {
    let ctx = TestContext::from_env();
    let (product_id, size) = ctx.stocked_size(1).await;
    let before = ctx.stock_of(product_id, &size).await;

    let resp = ctx
        .admin(Method::POST, "/api/inventory/adjust")
        .json(&json!({
            "product_id": product_id,
            "size": size,
            "delta": -(before + 1),
            "reason": "integration test overdraw",
        }))
        .send()
        .await
        .expect("Failed to adjust stock");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    assert_eq!(ctx.stock_of(product_id, &size).await, before);
}

#[tokio::test]
#[ignore = "Requires running servers and database"]
async fn test_adjustment_records_movement() {
    let ctx = TestContext::from_env();
    let (product_id, size) = ctx.stocked_size(1).await;

    let movement: Value = ctx
        .admin(Method::POST, "/api/inventory/adjust")
        .json(&json!({ "product_id": product_id, "size": size, "delta": 3 }))
        .send()
        .await
        .expect("Failed to adjust stock")
        .json()
        .await
        .expect("Movement is not JSON");
    assert_eq!(movement["movement_type"], "adjustment");
    assert_eq!(movement["quantity_change"], 3);
    assert_eq!(movement["created_by"], "integration-tests");

    let history: Value = ctx
        .admin(
            Method::GET,
            &format!("/api/inventory/history?product_id={product_id}&size={size}&limit=1"),
        )
        .send()
        .await
        .expect("Failed to fetch history")
        .json()
        .await
        .expect("History is not JSON");
    assert_eq!(history[0]["id"], movement["id"]);

    // Put the stock back
    let resp = ctx
        .admin(Method::POST, "/api/inventory/adjust")
        .json(&json!({ "product_id": product_id, "size": size, "delta": -3 }))
        .send()
        .await
        .expect("Failed to revert adjustment");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running servers and database"]
async fn test_parallel_overdraws_stop_at_zero() {
    const ON_HAND: i64 = 5;
    const ATTEMPTS: usize = 12;

    let ctx = TestContext::from_env();
    // Last size in the catalogue, away from the one the other tests use
    let (product_id, size, original) = ctx
        .catalogue_sizes()
        .await
        .pop()
        .expect("catalogue has no sizes; run `qyve seed`");
    ctx.set_stock(product_id, &size, ON_HAND).await;

    let requests = (0..ATTEMPTS)
        .map(|_| {
            ctx.admin(Method::POST, "/api/inventory/adjust").json(&json!({
                "product_id": product_id,
                "size": size,
                "delta": -1,
                "reason": "integration test parallel overdraw",
            }))
        })
        .collect();
    let statuses = send_concurrently(requests).await;

    let succeeded = count_status(&statuses, StatusCode::OK);
    let refused = count_status(&statuses, StatusCode::CONFLICT);
    assert_eq!(succeeded + refused, ATTEMPTS, "unexpected statuses: {statuses:?}");
    assert_eq!(succeeded, usize::try_from(ON_HAND).expect("stock fits usize"));
    assert_eq!(ctx.stock_of(product_id, &size).await, 0);

    ctx.set_stock(product_id, &size, original).await;
}
