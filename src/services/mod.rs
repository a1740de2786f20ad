pub mod products;
pub mod resolver;
pub mod stock_ledger;
pub mod stock_locks;
pub mod suppliers;
pub mod warehouses;

pub use products::ProductService;
pub use stock_ledger::StockLedger;
pub use stock_locks::StockLocks;
pub use suppliers::SupplierService;
pub use warehouses::WarehouseService;
