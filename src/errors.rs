use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::sqlx::sqlite::SqliteError;
use sea_orm::{error::DbErr, ConnAcquireErr, RuntimeErr, SqlErr};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// SQLite primary result codes for a held lock.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

/// PostgreSQL SQLSTATEs: serialization_failure, deadlock_detected, lock_not_available.
const PG_CONTENTION_CODES: [&str; 3] = ["40001", "40P01", "55P03"];

/// `code` is an extended SQLite result code; the primary code is its low byte.
fn sqlite_code_is_contention(code: &str) -> bool {
    code.parse::<i64>()
        .map(|extended| matches!(extended & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

/// Lock contention, deadlock or pool exhaustion: the same request may succeed on retry.
fn is_contention(error: &DbErr) -> bool {
    let sqlx_error = match error {
        DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => return true,
        DbErr::Conn(RuntimeErr::SqlxError(e))
        | DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e)) => e,
        _ => return false,
    };
    let Some(db_error) = sqlx_error.as_database_error() else {
        return false;
    };
    let Some(code) = db_error.code() else {
        return false;
    };

    if db_error.try_downcast_ref::<SqliteError>().is_some() {
        sqlite_code_is_contention(&code)
    } else {
        PG_CONTENTION_CODES.contains(&code.as_ref())
    }
}

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Conflict",
    "message": "Insufficient stock: requested 10, available 5",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request", "Conflict")
    #[schema(example = "Conflict")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Insufficient stock: requested 10, available 5")]
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    #[schema(example = "2024-12-09T10:30:00.000Z")]
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Normalizes a database error. Unique-constraint violations become `Conflict`
    /// so a racing duplicate insert reports the same way as the pre-check; lock
    /// contention becomes a retryable `ServiceUnavailable`.
    pub fn db_error(error: DbErr) -> Self {
        if is_contention(&error) {
            tracing::warn!(error = %error, "database contention");
            return ServiceError::ServiceUnavailable(
                "database is busy, retry the request".to_string(),
            );
        }
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                ServiceError::Conflict(format!("unique constraint violated: {}", detail))
            }
            _ => ServiceError::DatabaseError(error),
        }
    }

    /// Whether a caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_) | Self::RateLimitExceeded
        )
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::InsufficientStock(_) => StatusCode::CONFLICT,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rstest::rstest;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.error, "Not Found");
    }

    #[rstest]
    #[case(ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND)]
    #[case(ServiceError::ValidationError("x".into()), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::InvalidInput("x".into()), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::Conflict("x".into()), StatusCode::CONFLICT)]
    #[case(ServiceError::InsufficientStock("x".into()), StatusCode::CONFLICT)]
    #[case(ServiceError::RateLimitExceeded, StatusCode::TOO_MANY_REQUESTS)]
    #[case(ServiceError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(ServiceError::InternalError("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(
        ServiceError::DatabaseError(DbErr::Custom("x".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    fn service_error_status_code_mapping(#[case] err: ServiceError, #[case] expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
    }

    #[test]
    fn service_error_response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("password=hunter2".into()))
                .response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::InternalError("stack trace".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::Other(anyhow::anyhow!("boom")).response_message(),
            "Internal server error"
        );

        assert_eq!(
            ServiceError::NotFound("Warehouse not found".into()).response_message(),
            "Not found: Warehouse not found"
        );
        assert_eq!(
            ServiceError::InsufficientStock("requested 3, available 1".into()).response_message(),
            "Insufficient stock: requested 3, available 1"
        );
    }

    #[test]
    fn db_error_keeps_non_constraint_errors() {
        let err = ServiceError::db_error(DbErr::RecordNotInserted);
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }

    #[rstest]
    #[case("5", true)]
    #[case("517", true)]
    #[case("261", true)]
    #[case("6", true)]
    #[case("262", true)]
    #[case("2067", false)]
    #[case("19", false)]
    #[case("40P01", false)]
    fn sqlite_busy_and_locked_codes_are_contention(#[case] code: &str, #[case] expected: bool) {
        assert_eq!(sqlite_code_is_contention(code), expected);
    }

    #[test]
    fn exhausted_pool_is_retryable() {
        let err = ServiceError::db_error(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout));
        assert!(matches!(err, ServiceError::ServiceUnavailable(_)));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_retryable());

        let closed = ServiceError::db_error(DbErr::ConnectionAcquire(ConnAcquireErr::ConnectionClosed));
        assert!(matches!(closed, ServiceError::DatabaseError(_)));
    }

    #[test]
    fn only_contention_errors_are_retryable() {
        assert!(ServiceError::ServiceUnavailable("lock".into()).is_retryable());
        assert!(ServiceError::RateLimitExceeded.is_retryable());
        assert!(!ServiceError::InsufficientStock("x".into()).is_retryable());
        assert!(!ServiceError::Conflict("x".into()).is_retryable());
    }
}
