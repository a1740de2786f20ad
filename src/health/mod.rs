/*!
 * # Health Check Module
 *
 * - Liveness (`/health`): the process is up and serving
 * - Readiness (`/health/ready`): the database answers a ping
 */

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::error;
use utoipa::ToSchema;

use crate::db::{check_connection, DbPool};

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<HealthStatus>,
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DbPool>,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            start_time: SystemTime::now(),
        }
    }

    /// Calculate system uptime
    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    fn info(&self, status: HealthStatus, database: Option<HealthStatus>) -> HealthInfo {
        HealthInfo {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_seconds: self.uptime(),
            database,
        }
    }
}

/// Basic health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is alive", body = HealthInfo)),
    tag = "health"
)]
pub async fn health_check(State(state): State<HealthState>) -> impl IntoResponse {
    Json(state.info(HealthStatus::Up, None))
}

/// Readiness check; 503 while the database is unreachable
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Database reachable", body = HealthInfo),
        (status = 503, description = "Database unreachable", body = HealthInfo)
    ),
    tag = "health"
)]
pub async fn readiness_check(State(state): State<HealthState>) -> impl IntoResponse {
    match check_connection(&state.db_pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(state.info(HealthStatus::Up, Some(HealthStatus::Up))),
        ),
        Err(e) => {
            error!("Database health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(state.info(HealthStatus::Down, Some(HealthStatus::Down))),
            )
        }
    }
}

/// Health routes with their own state, mergeable into any router.
pub fn health_routes<S>(db_pool: Arc<DbPool>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .with_state(HealthState::new(db_pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use http::Request;
    use sea_orm::Database;
    use tower::ServiceExt;

    #[tokio::test]
    async fn liveness_and_readiness_report_up() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let app: Router = health_routes(Arc::new(db));

        for path in ["/health", "/health/ready"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");

            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let info: HealthInfo = serde_json::from_slice(&body).unwrap();
            assert_eq!(info.status, HealthStatus::Up);
        }
    }

    #[tokio::test]
    async fn readiness_reports_down_after_close() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let pool = Arc::new(db);
        let app: Router = health_routes(pool.clone());
        // Closing a clone closes the shared sqlx pool.
        pool.as_ref().clone().close().await.unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
