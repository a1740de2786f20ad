pub mod common;
pub mod inventory;
pub mod products;
pub mod suppliers;
pub mod warehouses;

use crate::{
    db::DbPool,
    services::{ProductService, StockLedger, StockLocks, SupplierService, WarehouseService},
};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub warehouses: Arc<WarehouseService>,
    pub suppliers: Arc<SupplierService>,
    pub products: Arc<ProductService>,
    pub ledger: Arc<StockLedger>,
}

impl AppServices {
    /// Builds the service container; products and the ledger share one lock registry.
    pub fn new(db_pool: Arc<DbPool>, store_timeout: Duration) -> Self {
        let locks = Arc::new(StockLocks::new(store_timeout));

        Self {
            warehouses: Arc::new(WarehouseService::new(db_pool.clone())),
            suppliers: Arc::new(SupplierService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone(), locks.clone())),
            ledger: Arc::new(StockLedger::new(db_pool, locks, store_timeout)),
        }
    }
}

/// All resource routes, relative to the `/api` prefix.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(warehouses::warehouses_router())
        .merge(suppliers::suppliers_router())
        .merge(products::products_router())
        .merge(inventory::inventory_router())
}
