use super::common::{success_response, StockMovementResponse, TransferResponse};
use super::AppState;
use crate::errors::ServiceError;
use crate::services::resolver::parse_id;
use crate::services::stock_ledger::{InventoryLine, StockLevel};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IncreaseStockRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Supplier delivering the units; recorded against the stock row
    pub supplier_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DecreaseStockRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 255))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferStockRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub target_warehouse_id: String,
    #[validate(length(max = 255))]
    pub reason: Option<String>,
}

/// Stock ledger routes scoped to one warehouse
pub fn inventory_router() -> Router<AppState> {
    Router::new()
        .route("/warehouses/:warehouse_id/inventory", get(list_inventory))
        .route("/warehouses/:warehouse_id/inventory/", get(list_inventory))
        .route(
            "/warehouses/:warehouse_id/inventory/:product_id",
            get(get_inventory),
        )
        .route(
            "/warehouses/:warehouse_id/inventory/:product_id/increase",
            post(increase_stock),
        )
        .route(
            "/warehouses/:warehouse_id/inventory/:product_id/decrease",
            post(decrease_stock),
        )
        .route(
            "/warehouses/:warehouse_id/inventory/:product_id/transfer",
            post(transfer_stock),
        )
}

#[utoipa::path(
    get,
    path = "/api/warehouses/{warehouse_id}/inventory/",
    params(("warehouse_id" = String, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Stock lines held by the warehouse", body = [InventoryLine]),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Path(warehouse_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse_id = parse_id("warehouse", &warehouse_id)?;
    let lines = state.services.ledger.list_inventory(warehouse_id).await?;
    Ok(success_response(lines))
}

#[utoipa::path(
    get,
    path = "/api/warehouses/{warehouse_id}/inventory/{product_id}",
    params(
        ("warehouse_id" = String, Path, description = "Warehouse ID"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Stock record for the pair", body = StockLevel),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path((warehouse_id, product_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse_id = parse_id("warehouse", &warehouse_id)?;
    let product_id = parse_id("product", &product_id)?;
    let level = state.services.ledger.lookup(product_id, warehouse_id).await?;
    Ok(success_response(level))
}

#[utoipa::path(
    post,
    path = "/api/warehouses/{warehouse_id}/inventory/{product_id}/increase",
    params(
        ("warehouse_id" = String, Path, description = "Warehouse ID"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    request_body = IncreaseStockRequest,
    responses(
        (status = 200, description = "Stock increased", body = StockMovementResponse),
        (status = 400, description = "Invalid quantity or identifier", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 503, description = "Stock record busy, retry", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn increase_stock(
    State(state): State<AppState>,
    Path((warehouse_id, product_id)): Path<(String, String)>,
    Json(payload): Json<IncreaseStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse_id = parse_id("warehouse", &warehouse_id)?;
    let product_id = parse_id("product", &product_id)?;
    payload.validate()?;
    let supplier_id = payload
        .supplier_id
        .as_deref()
        .map(|raw| parse_id("supplier", raw))
        .transpose()?;

    let new_stock_quantity = state
        .services
        .ledger
        .increase(product_id, warehouse_id, payload.quantity, supplier_id)
        .await?;

    Ok(success_response(StockMovementResponse {
        message: format!("Stock increased by {}", payload.quantity),
        new_stock_quantity,
    }))
}

#[utoipa::path(
    post,
    path = "/api/warehouses/{warehouse_id}/inventory/{product_id}/decrease",
    params(
        ("warehouse_id" = String, Path, description = "Warehouse ID"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    request_body = DecreaseStockRequest,
    responses(
        (status = 200, description = "Stock decreased", body = StockMovementResponse),
        (status = 400, description = "Invalid quantity or identifier", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 503, description = "Stock record busy, retry", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn decrease_stock(
    State(state): State<AppState>,
    Path((warehouse_id, product_id)): Path<(String, String)>,
    Json(payload): Json<DecreaseStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse_id = parse_id("warehouse", &warehouse_id)?;
    let product_id = parse_id("product", &product_id)?;
    payload.validate()?;

    let new_stock_quantity = state
        .services
        .ledger
        .decrease(product_id, warehouse_id, payload.quantity, payload.reason)
        .await?;

    Ok(success_response(StockMovementResponse {
        message: format!("Stock decreased by {}", payload.quantity),
        new_stock_quantity,
    }))
}

#[utoipa::path(
    post,
    path = "/api/warehouses/{warehouse_id}/inventory/{product_id}/transfer",
    params(
        ("warehouse_id" = String, Path, description = "Source warehouse ID"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    request_body = TransferStockRequest,
    responses(
        (status = 200, description = "Stock transferred", body = TransferResponse),
        (status = 400, description = "Invalid quantity, identifier or same warehouse", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Insufficient stock at the source", body = crate::errors::ErrorResponse),
        (status = 503, description = "Stock record busy, retry", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn transfer_stock(
    State(state): State<AppState>,
    Path((warehouse_id, product_id)): Path<(String, String)>,
    Json(payload): Json<TransferStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let source_warehouse_id = parse_id("warehouse", &warehouse_id)?;
    let product_id = parse_id("product", &product_id)?;
    payload.validate()?;
    let target_warehouse_id = parse_id("target warehouse", &payload.target_warehouse_id)?;

    let outcome = state
        .services
        .ledger
        .transfer(
            product_id,
            source_warehouse_id,
            target_warehouse_id,
            payload.quantity,
            payload.reason,
        )
        .await?;

    Ok(success_response(TransferResponse {
        message: format!(
            "Transferred {} unit(s) to warehouse {}",
            payload.quantity, target_warehouse_id
        ),
        new_stock_quantity: outcome.source_quantity,
        target_stock_quantity: outcome.target_quantity,
    }))
}
