pub mod product;
pub mod stock;
pub mod stock_supplier;
pub mod stock_warehouse;
pub mod supplier;
pub mod warehouse;
