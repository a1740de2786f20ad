//! Inventory API Library
//!
//! Warehouses, suppliers and products behind a REST API, with a transactional
//! per-warehouse stock ledger.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod rate_limiter;
pub mod services;
pub mod tracing;

use axum::{http::HeaderValue, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

use crate::errors::ServiceError;
use crate::rate_limiter::{RateLimitConfig, RateLimitLayer, RateLimiter};

/// Upper bound on a whole request, above the per-transaction store timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), config.store_timeout());
        let rate_limiter = RateLimiter::new(RateLimitConfig::from(&config));
        Self {
            db,
            config,
            services,
            rate_limiter,
        }
    }
}

/// CORS policy from configuration: the permissive opt-in, or the listed origins.
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    if cfg.cors_allow_any_origin {
        ::tracing::info!("Using permissive CORS because APP__CORS_ALLOW_ANY_ORIGIN is set");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                ::tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

async fn route_not_found() -> ServiceError {
    ServiceError::NotFound("route not found".to_string())
}

/// Builds the full application: `/api` resources, health, docs and the middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let rate_limit = RateLimitLayer::new(state.rate_limiter.clone());
    let health = health::health_routes(state.db.clone());

    Router::new()
        .nest("/api", handlers::api_routes())
        .fallback(route_not_found)
        .with_state(state)
        .merge(health)
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(rate_limit)
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}
