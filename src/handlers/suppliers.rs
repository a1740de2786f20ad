use super::common::{created_response, success_response};
use super::AppState;
use crate::entities::supplier;
use crate::errors::ServiceError;
use crate::services::resolver::parse_id;
use crate::services::suppliers::{
    CreateSupplierRequest, PatchSupplierRequest, ReplaceSupplierRequest,
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
pub struct SupplierResponse {
    pub id: Uuid,
    pub name: String,
    pub contact_email: String,
    pub created_at: DateTime<Utc>,
}

impl From<supplier::Model> for SupplierResponse {
    fn from(model: supplier::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            contact_email: model.contact_email,
            created_at: model.created_at,
        }
    }
}

pub fn suppliers_router() -> Router<AppState> {
    Router::new()
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route("/suppliers/", get(list_suppliers).post(create_supplier))
        .route(
            "/suppliers/:supplier_id",
            get(get_supplier).put(replace_supplier).patch(patch_supplier),
        )
}

#[utoipa::path(
    post,
    path = "/api/suppliers/",
    request_body = CreateSupplierRequest,
    responses(
        (status = 201, description = "Supplier created", body = super::common::CreatedResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.suppliers.create(payload).await?;
    Ok(created_response(created.id, "Supplier created successfully"))
}

#[utoipa::path(
    get,
    path = "/api/suppliers/",
    responses((status = 200, description = "All suppliers", body = [SupplierResponse])),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let suppliers: Vec<SupplierResponse> = state
        .services
        .suppliers
        .list()
        .await?
        .into_iter()
        .map(SupplierResponse::from)
        .collect();
    Ok(success_response(suppliers))
}

#[utoipa::path(
    get,
    path = "/api/suppliers/{supplier_id}",
    params(("supplier_id" = String, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier returned", body = SupplierResponse),
        (status = 400, description = "Malformed identifier", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id("supplier", &supplier_id)?;
    let supplier = state.services.suppliers.get(id).await?;
    Ok(success_response(SupplierResponse::from(supplier)))
}

#[utoipa::path(
    put,
    path = "/api/suppliers/{supplier_id}",
    params(("supplier_id" = String, Path, description = "Supplier ID")),
    request_body = CreateSupplierRequest,
    responses(
        (status = 200, description = "Supplier replaced", body = SupplierResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn replace_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<String>,
    Json(payload): Json<ReplaceSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id("supplier", &supplier_id)?;
    let updated = state.services.suppliers.replace(id, payload).await?;
    Ok(success_response(SupplierResponse::from(updated)))
}

#[utoipa::path(
    patch,
    path = "/api/suppliers/{supplier_id}",
    params(("supplier_id" = String, Path, description = "Supplier ID")),
    request_body = PatchSupplierRequest,
    responses(
        (status = 200, description = "Supplier updated", body = SupplierResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn patch_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<String>,
    Json(payload): Json<PatchSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id("supplier", &supplier_id)?;
    let updated = state.services.suppliers.patch(id, payload).await?;
    Ok(success_response(SupplierResponse::from(updated)))
}
