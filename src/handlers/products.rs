use super::common::{created_response, message_response, success_response};
use super::AppState;
use crate::errors::ServiceError;
use crate::services::products::{
    CreateProductRequest, PatchProductRequest, ProductDetail, ReplaceProductRequest,
    WarehouseProduct,
};
use crate::services::resolver::parse_id;
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

/// Product routes scoped to one warehouse
pub fn products_router() -> Router<AppState> {
    Router::new()
        .route(
            "/warehouses/:warehouse_id/products",
            get(list_products).post(create_product),
        )
        .route(
            "/warehouses/:warehouse_id/products/",
            get(list_products).post(create_product),
        )
        .route(
            "/warehouses/:warehouse_id/products/:product_id",
            get(get_product)
                .put(replace_product)
                .patch(patch_product)
                .delete(delete_product),
        )
}

fn parse_pair(warehouse_id: &str, product_id: &str) -> Result<(Uuid, Uuid), ServiceError> {
    Ok((
        parse_id("warehouse", warehouse_id)?,
        parse_id("product", product_id)?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/warehouses/{warehouse_id}/products/",
    params(("warehouse_id" = String, Path, description = "Warehouse ID")),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created with its initial stock", body = super::common::CreatedResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Path(warehouse_id): Path<String>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse_id = parse_id("warehouse", &warehouse_id)?;
    let created = state
        .services
        .products
        .create_in_warehouse(warehouse_id, payload)
        .await?;
    Ok(created_response(created.id, "Product created successfully"))
}

#[utoipa::path(
    get,
    path = "/api/warehouses/{warehouse_id}/products/",
    params(("warehouse_id" = String, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Products stocked in the warehouse", body = [WarehouseProduct]),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Path(warehouse_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse_id = parse_id("warehouse", &warehouse_id)?;
    let products = state
        .services
        .products
        .list_in_warehouse(warehouse_id)
        .await?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/warehouses/{warehouse_id}/products/{product_id}",
    params(
        ("warehouse_id" = String, Path, description = "Warehouse ID"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product detail", body = ProductDetail),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path((warehouse_id, product_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let (warehouse_id, product_id) = parse_pair(&warehouse_id, &product_id)?;
    let detail = state
        .services
        .products
        .get_in_warehouse(warehouse_id, product_id)
        .await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    put,
    path = "/api/warehouses/{warehouse_id}/products/{product_id}",
    params(
        ("warehouse_id" = String, Path, description = "Warehouse ID"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    request_body = ReplaceProductRequest,
    responses(
        (status = 200, description = "Product replaced", body = ProductDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn replace_product(
    State(state): State<AppState>,
    Path((warehouse_id, product_id)): Path<(String, String)>,
    Json(payload): Json<ReplaceProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (warehouse_id, product_id) = parse_pair(&warehouse_id, &product_id)?;
    let detail = state
        .services
        .products
        .replace(warehouse_id, product_id, payload)
        .await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    patch,
    path = "/api/warehouses/{warehouse_id}/products/{product_id}",
    params(
        ("warehouse_id" = String, Path, description = "Warehouse ID"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    request_body = PatchProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn patch_product(
    State(state): State<AppState>,
    Path((warehouse_id, product_id)): Path<(String, String)>,
    Json(payload): Json<PatchProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (warehouse_id, product_id) = parse_pair(&warehouse_id, &product_id)?;
    let detail = state
        .services
        .products
        .patch(warehouse_id, product_id, payload)
        .await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    delete,
    path = "/api/warehouses/{warehouse_id}/products/{product_id}",
    params(
        ("warehouse_id" = String, Path, description = "Warehouse ID"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted", body = super::common::MessageResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product still has stock on hand", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path((warehouse_id, product_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let (warehouse_id, product_id) = parse_pair(&warehouse_id, &product_id)?;
    state
        .services
        .products
        .delete(warehouse_id, product_id)
        .await?;
    Ok(message_response("Product deleted successfully"))
}
