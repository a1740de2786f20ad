use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Body returned by every create endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Result of an increase or decrease.
#[derive(Debug, Serialize, ToSchema)]
pub struct StockMovementResponse {
    pub message: String,
    pub new_stock_quantity: i32,
}

/// Result of a transfer; `new_stock_quantity` is the source warehouse's level.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResponse {
    pub message: String,
    pub new_stock_quantity: i32,
    pub target_stock_quantity: i32,
}

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response(id: Uuid, message: impl Into<String>) -> Response {
    (
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            message: message.into(),
        }),
    )
        .into_response()
}

pub fn message_response(message: impl Into<String>) -> Response {
    success_response(MessageResponse {
        message: message.into(),
    })
}
