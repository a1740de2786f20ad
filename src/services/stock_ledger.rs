//! Stock ledger: per `(product, warehouse)` quantity bookkeeping.
//!
//! Every mutation holds the in-process key lock(s) for the stock rows it
//! touches and runs in a single database transaction that re-reads those rows
//! with `SELECT ... FOR UPDATE` where the backend supports it. A quantity is
//! never allowed below zero, and a transfer moves units between two stock
//! rows without changing their sum.

use super::resolver::{require_product, require_supplier, require_warehouse};
use super::stock_locks::{StockKey, StockLocks};
use crate::db::DbPool;
use crate::entities::{product, stock, stock_supplier, stock_warehouse};
use crate::errors::ServiceError;
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stock held by one warehouse for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StockLevel {
    pub stock_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub sku: String,
    pub stock_quantity: i32,
    pub supplier_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One row of a warehouse's inventory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct InventoryLine {
    pub product_id: Uuid,
    pub sku: String,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Quantity left at the source warehouse
    pub source_quantity: i32,
    /// Quantity now held at the target warehouse
    pub target_quantity: i32,
    pub target_stock_id: Uuid,
    /// Whether the target warehouse had no stock row for the product before
    pub target_created: bool,
}

pub fn require_positive(quantity: i32) -> Result<(), ServiceError> {
    if quantity > 0 {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "quantity must be greater than zero, got {}",
            quantity
        )))
    }
}

/// `current + quantity`, rejecting overflow of the stored integer.
pub fn checked_increase(current: i32, quantity: i32) -> Result<i32, ServiceError> {
    require_positive(quantity)?;
    current.checked_add(quantity).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "adding {} to {} exceeds the maximum stock quantity",
            quantity, current
        ))
    })
}

/// `current - quantity`, refusing to go below zero.
pub fn checked_decrease(current: i32, quantity: i32) -> Result<i32, ServiceError> {
    require_positive(quantity)?;
    if quantity > current {
        return Err(ServiceError::InsufficientStock(format!(
            "requested {}, available {}",
            quantity, current
        )));
    }
    Ok(current - quantity)
}

/// The stock row linked to `warehouse_id` for `product_id`, locked for update
/// when `for_update` is set.
pub(crate) async fn find_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    warehouse_id: Uuid,
    for_update: bool,
) -> Result<Option<stock::Model>, ServiceError> {
    let mut query = stock::Entity::find()
        .inner_join(stock_warehouse::Entity)
        .filter(stock::Column::ProductId.eq(product_id))
        .filter(stock_warehouse::Column::WarehouseId.eq(warehouse_id))
        .order_by_asc(stock::Column::CreatedAt);
    if for_update {
        query = query.lock_exclusive();
    }
    query.one(conn).await.map_err(ServiceError::db_error)
}

fn not_stocked(product_id: Uuid, warehouse_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!(
        "Product {} is not stocked in warehouse {}",
        product_id, warehouse_id
    ))
}

/// Recomputes `products.stock_quantity` from the product's stock rows. The
/// product row is locked first so concurrent movements in other warehouses
/// cannot write back a stale sum.
pub(crate) async fn refresh_product_total<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<i32, ServiceError> {
    let product = product::Entity::find_by_id(product_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

    let sum = stock::Entity::find()
        .select_only()
        .column_as(
            Expr::col((stock::Entity, stock::Column::StockQuantity)).sum(),
            "total",
        )
        .filter(stock::Column::ProductId.eq(product.id))
        .into_tuple::<Option<i64>>()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .flatten()
        .unwrap_or(0);

    let total = i32::try_from(sum).map_err(|_| {
        ServiceError::InvalidInput(format!(
            "total stock for product {} exceeds the maximum stock quantity",
            product.id
        ))
    })?;

    if product.stock_quantity != total {
        let mut active = product.into_active_model();
        active.stock_quantity = Set(total);
        active.update(conn).await.map_err(ServiceError::db_error)?;
    }
    Ok(total)
}

pub struct StockLedger {
    db_pool: Arc<DbPool>,
    locks: Arc<StockLocks>,
    store_timeout: Duration,
}

impl StockLedger {
    pub fn new(db_pool: Arc<DbPool>, locks: Arc<StockLocks>, store_timeout: Duration) -> Self {
        Self {
            db_pool,
            locks,
            store_timeout,
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => {
                if result.is_err() {
                    counter!("inventory.stock_movements.failed", 1, "operation" => operation);
                }
                result
            }
            Err(_) => {
                counter!("inventory.stock_movements.failed", 1, "operation" => operation);
                warn!(operation, timeout = ?self.store_timeout, "stock transaction timed out");
                Err(ServiceError::ServiceUnavailable(format!(
                    "{} timed out, retry the request",
                    operation
                )))
            }
        }
    }

    /// Stock row for the pair, with its supplier links.
    #[instrument(skip(self))]
    pub async fn lookup(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<StockLevel, ServiceError> {
        let db = &*self.db_pool;
        require_warehouse(db, warehouse_id).await?;
        require_product(db, product_id).await?;

        let stock = find_stock(db, product_id, warehouse_id, false)
            .await?
            .ok_or_else(|| not_stocked(product_id, warehouse_id))?;

        let supplier_ids = stock_supplier::Entity::find()
            .filter(stock_supplier::Column::StockId.eq(stock.id))
            .order_by_asc(stock_supplier::Column::SupplierId)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|link| link.supplier_id)
            .collect();

        Ok(StockLevel {
            stock_id: stock.id,
            product_id: stock.product_id,
            warehouse_id,
            sku: stock.sku,
            stock_quantity: stock.stock_quantity,
            supplier_ids,
            created_at: stock.created_at,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_inventory(&self, warehouse_id: Uuid) -> Result<Vec<InventoryLine>, ServiceError> {
        let db = &*self.db_pool;
        require_warehouse(db, warehouse_id).await?;

        let rows = stock::Entity::find()
            .inner_join(stock_warehouse::Entity)
            .filter(stock_warehouse::Column::WarehouseId.eq(warehouse_id))
            .order_by_asc(stock::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .map(|s| InventoryLine {
                product_id: s.product_id,
                sku: s.sku,
                stock_quantity: s.stock_quantity,
            })
            .collect())
    }

    /// Adds `quantity` units; records `supplier_id` against the stock row when given.
    #[instrument(skip(self))]
    pub async fn increase(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        supplier_id: Option<Uuid>,
    ) -> Result<i32, ServiceError> {
        require_positive(quantity)?;
        let _guard = self.locks.acquire(&[(product_id, warehouse_id)]).await?;

        let new_quantity = self
            .bounded("increase", async {
                let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

                require_warehouse(&txn, warehouse_id).await?;
                require_product(&txn, product_id).await?;
                if let Some(supplier_id) = supplier_id {
                    require_supplier(&txn, supplier_id).await?;
                }

                let stock = find_stock(&txn, product_id, warehouse_id, true)
                    .await?
                    .ok_or_else(|| not_stocked(product_id, warehouse_id))?;
                let stock_id = stock.id;
                let new_quantity = checked_increase(stock.stock_quantity, quantity)?;

                let mut active = stock.into_active_model();
                active.stock_quantity = Set(new_quantity);
                active.update(&txn).await.map_err(ServiceError::db_error)?;

                if let Some(supplier_id) = supplier_id {
                    let linked = stock_supplier::Entity::find_by_id((stock_id, supplier_id))
                        .one(&txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if linked.is_none() {
                        stock_supplier::ActiveModel {
                            stock_id: Set(stock_id),
                            supplier_id: Set(supplier_id),
                        }
                        .insert(&txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    }
                }

                refresh_product_total(&txn, product_id).await?;
                txn.commit().await.map_err(ServiceError::db_error)?;
                Ok(new_quantity)
            })
            .await?;

        counter!("inventory.stock_movements", 1, "operation" => "increase");
        info!(
            %product_id,
            %warehouse_id,
            quantity,
            new_quantity,
            supplier_id = ?supplier_id,
            "stock increased"
        );
        Ok(new_quantity)
    }

    /// Removes `quantity` units; fails with `InsufficientStock` and leaves the
    /// row untouched when fewer are on hand.
    #[instrument(skip(self))]
    pub async fn decrease(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        reason: Option<String>,
    ) -> Result<i32, ServiceError> {
        require_positive(quantity)?;
        let _guard = self.locks.acquire(&[(product_id, warehouse_id)]).await?;

        let new_quantity = self
            .bounded("decrease", async {
                let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

                require_warehouse(&txn, warehouse_id).await?;
                require_product(&txn, product_id).await?;

                let stock = find_stock(&txn, product_id, warehouse_id, true)
                    .await?
                    .ok_or_else(|| not_stocked(product_id, warehouse_id))?;
                let new_quantity = checked_decrease(stock.stock_quantity, quantity)?;

                let mut active = stock.into_active_model();
                active.stock_quantity = Set(new_quantity);
                active.update(&txn).await.map_err(ServiceError::db_error)?;

                refresh_product_total(&txn, product_id).await?;
                txn.commit().await.map_err(ServiceError::db_error)?;
                Ok(new_quantity)
            })
            .await?;

        counter!("inventory.stock_movements", 1, "operation" => "decrease");
        info!(
            %product_id,
            %warehouse_id,
            quantity,
            new_quantity,
            reason = reason.as_deref().unwrap_or(""),
            "stock decreased"
        );
        Ok(new_quantity)
    }

    /// Moves `quantity` units from `source_warehouse_id` to `target_warehouse_id`,
    /// creating the target's stock row (linked only to the target) if needed.
    #[instrument(skip(self))]
    pub async fn transfer(
        &self,
        product_id: Uuid,
        source_warehouse_id: Uuid,
        target_warehouse_id: Uuid,
        quantity: i32,
        reason: Option<String>,
    ) -> Result<TransferOutcome, ServiceError> {
        require_positive(quantity)?;
        if source_warehouse_id == target_warehouse_id {
            return Err(ServiceError::InvalidInput(
                "source and target warehouse must differ".to_string(),
            ));
        }

        let keys: [StockKey; 2] = [
            (product_id, source_warehouse_id),
            (product_id, target_warehouse_id),
        ];
        let _guard = self.locks.acquire(&keys).await?;

        let outcome = self
            .bounded("transfer", async {
                let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

                require_warehouse(&txn, source_warehouse_id).await?;
                require_warehouse(&txn, target_warehouse_id).await?;
                require_product(&txn, product_id).await?;

                // Row locks follow the same ascending key order as the in-process locks.
                let (first, second) = if source_warehouse_id < target_warehouse_id {
                    (source_warehouse_id, target_warehouse_id)
                } else {
                    (target_warehouse_id, source_warehouse_id)
                };
                let first_row = find_stock(&txn, product_id, first, true).await?;
                let second_row = find_stock(&txn, product_id, second, true).await?;
                let (source, target) = if first == source_warehouse_id {
                    (first_row, second_row)
                } else {
                    (second_row, first_row)
                };

                let source = source.ok_or_else(|| not_stocked(product_id, source_warehouse_id))?;
                let source_quantity = checked_decrease(source.stock_quantity, quantity)?;
                let target_quantity = match &target {
                    Some(row) => checked_increase(row.stock_quantity, quantity)?,
                    None => quantity,
                };
                let sku = source.sku.clone();

                let mut active = source.into_active_model();
                active.stock_quantity = Set(source_quantity);
                active.update(&txn).await.map_err(ServiceError::db_error)?;

                let (target_stock_id, target_created) = match target {
                    Some(row) => {
                        let id = row.id;
                        let mut active = row.into_active_model();
                        active.stock_quantity = Set(target_quantity);
                        active.update(&txn).await.map_err(ServiceError::db_error)?;
                        (id, false)
                    }
                    None => {
                        let created = stock::ActiveModel {
                            product_id: Set(product_id),
                            sku: Set(sku),
                            stock_quantity: Set(target_quantity),
                            ..Default::default()
                        }
                        .insert(&txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                        stock_warehouse::ActiveModel {
                            stock_id: Set(created.id),
                            warehouse_id: Set(target_warehouse_id),
                        }
                        .insert(&txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                        (created.id, true)
                    }
                };

                txn.commit().await.map_err(ServiceError::db_error)?;
                Ok(TransferOutcome {
                    source_quantity,
                    target_quantity,
                    target_stock_id,
                    target_created,
                })
            })
            .await?;

        counter!("inventory.stock_movements", 1, "operation" => "transfer");
        info!(
            %product_id,
            %source_warehouse_id,
            %target_warehouse_id,
            quantity,
            source_quantity = outcome.source_quantity,
            target_quantity = outcome.target_quantity,
            target_created = outcome.target_created,
            reason = reason.as_deref().unwrap_or(""),
            "stock transferred"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn non_positive_quantities_are_invalid() {
        assert_matches!(checked_increase(5, 0), Err(ServiceError::InvalidInput(_)));
        assert_matches!(checked_increase(5, -1), Err(ServiceError::InvalidInput(_)));
        assert_matches!(checked_decrease(5, 0), Err(ServiceError::InvalidInput(_)));
        assert_matches!(checked_decrease(5, -3), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn decrease_beyond_stock_is_insufficient() {
        assert_matches!(
            checked_decrease(5, 10),
            Err(ServiceError::InsufficientStock(msg)) if msg == "requested 10, available 5"
        );
        assert_eq!(checked_decrease(5, 5).unwrap(), 0);
    }

    #[test]
    fn increase_overflow_is_rejected() {
        assert_matches!(checked_increase(i32::MAX, 1), Err(ServiceError::InvalidInput(_)));
    }

    proptest! {
        #[test]
        fn increase_adds_exactly(current in 0..=1_000_000i32, quantity in 1..=1_000_000i32) {
            prop_assert_eq!(checked_increase(current, quantity).unwrap(), current + quantity);
        }

        #[test]
        fn decrease_never_goes_negative(current in 0..=10_000i32, quantity in 1..=20_000i32) {
            match checked_decrease(current, quantity) {
                Ok(left) => {
                    prop_assert!(quantity <= current);
                    prop_assert_eq!(left, current - quantity);
                }
                Err(ServiceError::InsufficientStock(_)) => prop_assert!(quantity > current),
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        #[test]
        fn transfer_arithmetic_conserves_total(
            source in 0..=100_000i32,
            target in 0..=100_000i32,
            quantity in 1..=100_000i32,
        ) {
            if let Ok(source_after) = checked_decrease(source, quantity) {
                let target_after = checked_increase(target, quantity).unwrap();
                prop_assert_eq!(source_after + target_after, source + target);
            }
        }
    }
}
