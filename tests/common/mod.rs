#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use inventory_api::{build_router, config::AppConfig, db, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up the application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

/// A decoded response: status, headers and JSON body (`Null` when empty or not JSON).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    // A single connection keeps every query on the same in-memory database.
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg.rate_limit_enabled = false;
    cfg
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = build_router(state.clone());
        Self { router, state }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn create_warehouse(&self, name: &str) -> Uuid {
        let response = self
            .post(
                "/api/warehouses/",
                json!({ "name": name, "location": format!("{name} district") }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id_of(&response.body)
    }

    pub async fn create_supplier(&self, name: &str) -> Uuid {
        let response = self
            .post(
                "/api/suppliers/",
                json!({ "name": name, "contact_email": "orders@example.com" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id_of(&response.body)
    }

    pub async fn create_product(&self, warehouse_id: Uuid, sku: &str, stock_quantity: i32) -> Uuid {
        let response = self
            .post(
                &format!("/api/warehouses/{warehouse_id}/products/"),
                json!({
                    "name": format!("Product {sku}"),
                    "sku": sku,
                    "price": "9.99",
                    "stock_quantity": stock_quantity,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id_of(&response.body)
    }

    /// The quantity `warehouse_id` holds for `product_id`, or `None` when it has no stock row.
    pub async fn stock_in(&self, warehouse_id: Uuid, product_id: Uuid) -> Option<i64> {
        let response = self
            .get(&format!("/api/warehouses/{warehouse_id}/inventory/{product_id}"))
            .await;
        match response.status {
            StatusCode::OK => response.body["stock_quantity"].as_i64(),
            StatusCode::NOT_FOUND => None,
            other => panic!("unexpected status {other}: {}", response.body),
        }
    }
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"]
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .unwrap_or_else(|| panic!("response has no id: {body}"))
}
