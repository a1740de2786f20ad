use super::common::{created_response, success_response};
use super::AppState;
use crate::entities::warehouse;
use crate::errors::ServiceError;
use crate::services::resolver::parse_id;
use crate::services::warehouses::{
    CreateWarehouseRequest, PatchWarehouseRequest, ReplaceWarehouseRequest,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct WarehouseResponse {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

impl From<warehouse::Model> for WarehouseResponse {
    fn from(model: warehouse::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            location: model.location,
            created_at: model.created_at,
        }
    }
}

/// Creates the router for warehouse endpoints
pub fn warehouses_router() -> Router<AppState> {
    Router::new()
        .route("/warehouses", get(list_warehouses).post(create_warehouse))
        .route("/warehouses/", get(list_warehouses).post(create_warehouse))
        .route(
            "/warehouses/:warehouse_id",
            get(get_warehouse)
                .put(replace_warehouse)
                .patch(patch_warehouse),
        )
}

#[utoipa::path(
    post,
    path = "/api/warehouses/",
    request_body = CreateWarehouseRequest,
    responses(
        (status = 201, description = "Warehouse created", body = super::common::CreatedResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(payload): Json<CreateWarehouseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.warehouses.create(payload).await?;
    Ok(created_response(created.id, "Warehouse created successfully"))
}

#[utoipa::path(
    get,
    path = "/api/warehouses/",
    responses(
        (status = 200, description = "All warehouses", body = [WarehouseResponse]),
        (status = 429, description = "Rate limit exceeded", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouses: Vec<WarehouseResponse> = state
        .services
        .warehouses
        .list()
        .await?
        .into_iter()
        .map(WarehouseResponse::from)
        .collect();
    Ok(success_response(warehouses))
}

#[utoipa::path(
    get,
    path = "/api/warehouses/{warehouse_id}",
    params(("warehouse_id" = String, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Warehouse returned", body = WarehouseResponse),
        (status = 400, description = "Malformed identifier", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id("warehouse", &warehouse_id)?;
    let warehouse = state.services.warehouses.get(id).await?;
    Ok(success_response(WarehouseResponse::from(warehouse)))
}

#[utoipa::path(
    put,
    path = "/api/warehouses/{warehouse_id}",
    params(("warehouse_id" = String, Path, description = "Warehouse ID")),
    request_body = CreateWarehouseRequest,
    responses(
        (status = 200, description = "Warehouse replaced", body = WarehouseResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn replace_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<String>,
    Json(payload): Json<ReplaceWarehouseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id("warehouse", &warehouse_id)?;
    let updated = state.services.warehouses.replace(id, payload).await?;
    Ok(success_response(WarehouseResponse::from(updated)))
}

#[utoipa::path(
    patch,
    path = "/api/warehouses/{warehouse_id}",
    params(("warehouse_id" = String, Path, description = "Warehouse ID")),
    request_body = PatchWarehouseRequest,
    responses(
        (status = 200, description = "Warehouse updated", body = WarehouseResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn patch_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<String>,
    Json(payload): Json<PatchWarehouseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id("warehouse", &warehouse_id)?;
    let updated = state.services.warehouses.patch(id, payload).await?;
    Ok(success_response(WarehouseResponse::from(updated)))
}
