use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory API",
        version = "0.1.0",
        description = r#"
# Warehouse Inventory API

Manage warehouses, suppliers and products, and move stock between warehouses
through a transactional ledger.

## Stock movements

Quantities change only through `increase`, `decrease` and `transfer`. Each
movement is atomic: it either applies fully or leaves every stock record
untouched. A decrease or transfer that would take a record below zero fails
with `409 Conflict`.

## Rate Limiting

Requests are limited per client address in fixed windows. Check the response
headers for rate limit information:
- `X-RateLimit-Limit`: Maximum requests per window
- `X-RateLimit-Remaining`: Remaining requests in current window
- `X-RateLimit-Reset`: Seconds until the window resets

## Error Handling

Every failure returns the same body:

```json
{
  "error": "Conflict",
  "message": "Insufficient stock: requested 10, available 5",
  "request_id": "0b6f4c1e-8f47-4d43-a1a4-3f8a52bd1c55",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "warehouses", description = "Warehouse endpoints"),
        (name = "suppliers", description = "Supplier endpoints"),
        (name = "products", description = "Products stocked in a warehouse"),
        (name = "inventory", description = "Stock levels and movements"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Warehouses
        crate::handlers::warehouses::create_warehouse,
        crate::handlers::warehouses::list_warehouses,
        crate::handlers::warehouses::get_warehouse,
        crate::handlers::warehouses::replace_warehouse,
        crate::handlers::warehouses::patch_warehouse,

        // Suppliers
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::replace_supplier,
        crate::handlers::suppliers::patch_supplier,

        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::replace_product,
        crate::handlers::products::patch_product,
        crate::handlers::products::delete_product,

        // Inventory
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::get_inventory,
        crate::handlers::inventory::increase_stock,
        crate::handlers::inventory::decrease_stock,
        crate::handlers::inventory::transfer_stock,

        // Health
        crate::health::health_check,
        crate::health::readiness_check,
    ),
    components(
        schemas(
            crate::handlers::common::CreatedResponse,
            crate::handlers::common::MessageResponse,
            crate::handlers::common::StockMovementResponse,
            crate::handlers::common::TransferResponse,
            crate::handlers::warehouses::WarehouseResponse,
            crate::handlers::suppliers::SupplierResponse,
            crate::services::warehouses::CreateWarehouseRequest,
            crate::services::warehouses::PatchWarehouseRequest,
            crate::services::suppliers::CreateSupplierRequest,
            crate::services::suppliers::PatchSupplierRequest,
            crate::services::products::CreateProductRequest,
            crate::services::products::ReplaceProductRequest,
            crate::services::products::PatchProductRequest,
            crate::services::products::WarehouseProduct,
            crate::services::products::ProductDetail,
            crate::services::stock_ledger::InventoryLine,
            crate::services::stock_ledger::StockLevel,
            crate::handlers::inventory::IncreaseStockRequest,
            crate::handlers::inventory::DecreaseStockRequest,
            crate::handlers::inventory::TransferStockRequest,
            crate::health::HealthInfo,
            crate::health::HealthStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
