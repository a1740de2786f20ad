mod common;

use axum::http::StatusCode;
use common::{test_config, TestApp};
use serde_json::json;
use uuid::Uuid;

fn stock_uri(warehouse_id: Uuid, product_id: Uuid, action: &str) -> String {
    format!("/api/warehouses/{warehouse_id}/inventory/{product_id}/{action}")
}

#[tokio::test]
async fn decrease_scenario_keeps_stock_on_conflict() {
    let app = TestApp::new().await;
    let w1 = app.create_warehouse("W1").await;
    let product_id = app.create_product(w1, "P-DEC", 10).await;

    let first = app
        .post(&stock_uri(w1, product_id, "decrease"), json!({ "quantity": 5 }))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["new_stock_quantity"], 5);
    assert!(first.body["message"].as_str().is_some());

    let second = app
        .post(
            &stock_uri(w1, product_id, "decrease"),
            json!({ "quantity": 10, "reason": "damaged" }),
        )
        .await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert!(second.body["message"]
        .as_str()
        .unwrap()
        .contains("requested 10, available 5"));

    assert_eq!(app.stock_in(w1, product_id).await, Some(5));
}

#[tokio::test]
async fn increase_adds_and_records_supplier() {
    let app = TestApp::new().await;
    let w1 = app.create_warehouse("W1").await;
    let supplier_id = app.create_supplier("Acme").await;
    let product_id = app.create_product(w1, "P-INC", 2).await;

    let increased = app
        .post(
            &stock_uri(w1, product_id, "increase"),
            json!({ "quantity": 8, "supplier_id": supplier_id.to_string() }),
        )
        .await;
    assert_eq!(increased.status, StatusCode::OK, "{}", increased.body);
    assert_eq!(increased.body["new_stock_quantity"], 10);

    // A second delivery from the same supplier does not duplicate the link.
    let again = app
        .post(
            &stock_uri(w1, product_id, "increase"),
            json!({ "quantity": 1, "supplier_id": supplier_id.to_string() }),
        )
        .await;
    assert_eq!(again.body["new_stock_quantity"], 11);

    let detail = app
        .get(&format!("/api/warehouses/{w1}/inventory/{product_id}"))
        .await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["stock_quantity"], 11);
    assert_eq!(detail.body["sku"], "P-INC");
    assert_eq!(detail.body["warehouse_id"], w1.to_string());
    assert_eq!(detail.body["supplier_ids"], json!([supplier_id.to_string()]));

    let product = app
        .get(&format!("/api/warehouses/{w1}/products/{product_id}"))
        .await;
    assert_eq!(product.body["stock_quantity"], 11);
}

#[tokio::test]
async fn increase_rejects_bad_input() {
    let app = TestApp::new().await;
    let w1 = app.create_warehouse("W1").await;
    let product_id = app.create_product(w1, "P-BAD", 1).await;
    let uri = stock_uri(w1, product_id, "increase");

    for quantity in [0, -5] {
        let response = app.post(&uri, json!({ "quantity": quantity })).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "quantity {quantity}");
    }

    let bad_supplier = app
        .post(&uri, json!({ "quantity": 1, "supplier_id": "acme" }))
        .await;
    assert_eq!(bad_supplier.status, StatusCode::BAD_REQUEST);

    let unknown_supplier = app
        .post(
            &uri,
            json!({ "quantity": 1, "supplier_id": Uuid::new_v4().to_string() }),
        )
        .await;
    assert_eq!(unknown_supplier.status, StatusCode::NOT_FOUND);

    let unknown_product = app
        .post(
            &stock_uri(w1, Uuid::new_v4(), "increase"),
            json!({ "quantity": 1 }),
        )
        .await;
    assert_eq!(unknown_product.status, StatusCode::NOT_FOUND);

    let malformed_product = app
        .post(
            &format!("/api/warehouses/{w1}/inventory/123/increase"),
            json!({ "quantity": 1 }),
        )
        .await;
    assert_eq!(malformed_product.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.stock_in(w1, product_id).await, Some(1));
}

#[tokio::test]
async fn transfer_creates_destination_record() {
    let app = TestApp::new().await;
    let w1 = app.create_warehouse("W1").await;
    let w2 = app.create_warehouse("W2").await;
    let product_id = app.create_product(w1, "P-MOVE", 5).await;
    assert_eq!(app.stock_in(w2, product_id).await, None);

    let moved = app
        .post(
            &stock_uri(w1, product_id, "transfer"),
            json!({ "quantity": 3, "target_warehouse_id": w2.to_string(), "reason": "rebalance" }),
        )
        .await;
    assert_eq!(moved.status, StatusCode::OK, "{}", moved.body);
    assert_eq!(moved.body["new_stock_quantity"], 2);
    assert_eq!(moved.body["target_stock_quantity"], 3);

    assert_eq!(app.stock_in(w1, product_id).await, Some(2));
    assert_eq!(app.stock_in(w2, product_id).await, Some(3));

    let destination = app
        .get(&format!("/api/warehouses/{w2}/inventory/{product_id}"))
        .await;
    assert_eq!(destination.body["sku"], "P-MOVE");

    // The new record is linked to the target only, and the product is listed there.
    let w2_products = app.get(&format!("/api/warehouses/{w2}/products/")).await;
    assert_eq!(w2_products.body[0]["stock_quantity"], 3);
    let w1_products = app.get(&format!("/api/warehouses/{w1}/products/")).await;
    assert_eq!(w1_products.body[0]["stock_quantity"], 2);

    // Totals are unchanged by a transfer.
    let product = app
        .get(&format!("/api/warehouses/{w2}/products/{product_id}"))
        .await;
    assert_eq!(product.body["stock_quantity"], 5);
    assert_eq!(product.body["warehouse_stock_quantity"], 3);
}

#[tokio::test]
async fn transfer_back_reuses_existing_record() {
    let app = TestApp::new().await;
    let w1 = app.create_warehouse("W1").await;
    let w2 = app.create_warehouse("W2").await;
    let product_id = app.create_product(w1, "P-BACK", 6).await;

    let out = app
        .post(
            &stock_uri(w1, product_id, "transfer"),
            json!({ "quantity": 4, "target_warehouse_id": w2.to_string() }),
        )
        .await;
    assert_eq!(out.status, StatusCode::OK);

    let back = app
        .post(
            &stock_uri(w2, product_id, "transfer"),
            json!({ "quantity": 1, "target_warehouse_id": w1.to_string() }),
        )
        .await;
    assert_eq!(back.status, StatusCode::OK);
    assert_eq!(back.body["new_stock_quantity"], 3);
    assert_eq!(back.body["target_stock_quantity"], 3);

    let w1_lines = app.get(&format!("/api/warehouses/{w1}/inventory")).await;
    assert_eq!(w1_lines.body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn transfer_failures_leave_both_sides_untouched() {
    let app = TestApp::new().await;
    let w1 = app.create_warehouse("W1").await;
    let w2 = app.create_warehouse("W2").await;
    let product_id = app.create_product(w1, "P-FAIL", 4).await;
    let uri = stock_uri(w1, product_id, "transfer");

    let same = app
        .post(&uri, json!({ "quantity": 1, "target_warehouse_id": w1.to_string() }))
        .await;
    assert_eq!(same.status, StatusCode::BAD_REQUEST);

    let too_many = app
        .post(&uri, json!({ "quantity": 9, "target_warehouse_id": w2.to_string() }))
        .await;
    assert_eq!(too_many.status, StatusCode::CONFLICT);

    let unknown_target = app
        .post(
            &uri,
            json!({ "quantity": 1, "target_warehouse_id": Uuid::new_v4().to_string() }),
        )
        .await;
    assert_eq!(unknown_target.status, StatusCode::NOT_FOUND);

    let malformed_target = app
        .post(&uri, json!({ "quantity": 1, "target_warehouse_id": "w2" }))
        .await;
    assert_eq!(malformed_target.status, StatusCode::BAD_REQUEST);

    let zero = app
        .post(&uri, json!({ "quantity": 0, "target_warehouse_id": w2.to_string() }))
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    // Repeating a failed request fails the same way and changes nothing.
    let retried = app
        .post(&uri, json!({ "quantity": 9, "target_warehouse_id": w2.to_string() }))
        .await;
    assert_eq!(retried.status, StatusCode::CONFLICT);

    assert_eq!(app.stock_in(w1, product_id).await, Some(4));
    assert_eq!(app.stock_in(w2, product_id).await, None);
}

#[tokio::test]
async fn inventory_listing_is_scoped_to_the_warehouse() {
    let app = TestApp::new().await;
    let w1 = app.create_warehouse("W1").await;
    let w2 = app.create_warehouse("W2").await;
    let a = app.create_product(w1, "LIST-A", 1).await;
    app.create_product(w1, "LIST-B", 2).await;
    app.create_product(w2, "LIST-C", 3).await;

    let listed = app.get(&format!("/api/warehouses/{w1}/inventory/")).await;
    assert_eq!(listed.status, StatusCode::OK);
    let lines = listed.body.as_array().unwrap();
    assert_eq!(lines.len(), 2);
    let line_a = lines
        .iter()
        .find(|line| line["product_id"] == a.to_string())
        .expect("LIST-A is listed");
    assert_eq!(line_a["sku"], "LIST-A");
    assert_eq!(line_a["stock_quantity"], 1);
    assert!(lines.iter().any(|line| line["sku"] == "LIST-B" && line["stock_quantity"] == 2));

    let missing = app
        .get(&format!("/api/warehouses/{}/inventory/", Uuid::new_v4()))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stock_tier_is_rate_limited_separately() {
    let mut cfg = test_config();
    cfg.rate_limit_enabled = true;
    cfg.rate_limit_stock_requests = 2;
    cfg.rate_limit_read_requests = 100;
    cfg.rate_limit_write_requests = 100;
    let app = TestApp::with_config(cfg).await;

    let w1 = app.create_warehouse("W1").await;
    let product_id = app.create_product(w1, "P-RL", 10).await;
    let uri = stock_uri(w1, product_id, "decrease");

    for expected_remaining in ["1", "0"] {
        let response = app.post(&uri, json!({ "quantity": 1 })).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers["x-ratelimit-limit"], "2");
        assert_eq!(response.headers["x-ratelimit-remaining"], expected_remaining);
    }

    let limited = app.post(&uri, json!({ "quantity": 1 })).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.body["error"], "Too Many Requests");
    assert!(limited.headers.contains_key("x-ratelimit-reset"));

    // Reads are still admitted and the rejected decrease did not apply.
    assert_eq!(app.stock_in(w1, product_id).await, Some(8));
    assert_eq!(app.get("/health").await.status, StatusCode::OK);
}
