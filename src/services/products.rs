use crate::{
    db::DbPool,
    entities::{product, stock, stock_supplier, stock_warehouse},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::resolver::{require_product, require_warehouse};
use super::stock_ledger::find_stock;
use super::stock_locks::{StockKey, StockLocks};

/// Largest price a `NUMERIC(10, 2)` column holds.
const MAX_PRICE_UNITS: i64 = 99_999_999;

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    let mut err = ValidationError::new("price");
    if price.is_sign_negative() && !price.is_zero() {
        err.message = Some("price cannot be negative".into());
        return Err(err);
    }
    if price.normalize().scale() > 2 {
        err.message = Some("price supports at most two decimal places".into());
        return Err(err);
    }
    if price.trunc() > Decimal::from(MAX_PRICE_UNITS) {
        err.message = Some("price exceeds the maximum supported value".into());
        return Err(err);
    }
    Ok(())
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn reject_stock_quantity(field: &Option<serde_json::Value>) -> Result<(), ServiceError> {
    match field {
        Some(_) => Err(ServiceError::InvalidInput(
            "stock_quantity cannot be updated directly; use the inventory increase, decrease or transfer endpoints".to_string(),
        )),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    /// Initial quantity held by the warehouse
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
}

/// Full replacement (PUT). Quantities only change through the inventory endpoints.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReplaceProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    #[validate(custom = "validate_price")]
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    /// Rejected when present
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<i32>)]
    pub stock_quantity: Option<serde_json::Value>,
}

/// Partial update (PATCH). `description` and `category` accept `null` to clear.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PatchProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub sku: Option<String>,
    #[validate(custom = "validate_price")]
    #[schema(value_type = Option<String>, example = "19.99")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[validate(length(max = 500))]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[validate(length(max = 50))]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    /// Rejected when present
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<i32>)]
    pub stock_quantity: Option<serde_json::Value>,
}

/// A product as listed for one warehouse; `stock_quantity` is the quantity held there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WarehouseProduct {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProductDetail {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Total across all warehouses
    pub stock_quantity: i32,
    pub warehouse_id: Uuid,
    /// Quantity held by `warehouse_id`
    pub warehouse_stock_quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl ProductDetail {
    fn new(product: product::Model, warehouse_id: Uuid, warehouse_stock_quantity: i32) -> Self {
        Self {
            id: product.id,
            name: product.name,
            sku: product.sku,
            price: product.price,
            description: product.description,
            category: product.category,
            stock_quantity: product.stock_quantity,
            warehouse_id,
            warehouse_stock_quantity,
            created_at: product.created_at,
        }
    }
}

async fn ensure_sku_available<C: ConnectionTrait>(
    conn: &C,
    sku: &str,
    owner: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = product::Entity::find().filter(product::Column::Sku.eq(sku));
    if let Some(owner) = owner {
        query = query.filter(product::Column::Id.ne(owner));
    }
    let existing = query.one(conn).await.map_err(ServiceError::db_error)?;

    match existing {
        Some(other) => {
            let msg = format!("Product with SKU '{}' already exists ({})", sku, other.id);
            error!(%msg);
            Err(ServiceError::Conflict(msg))
        }
        None => Ok(()),
    }
}

/// Stock copies the product's SKU; keep them in step.
async fn sync_stock_sku<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    sku: &str,
) -> Result<(), ServiceError> {
    stock::Entity::update_many()
        .col_expr(stock::Column::Sku, Expr::value(sku.to_string()))
        .filter(stock::Column::ProductId.eq(product_id))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(())
}

/// Service for managing products within a warehouse
pub struct ProductService {
    db_pool: Arc<DbPool>,
    locks: Arc<StockLocks>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, locks: Arc<StockLocks>) -> Self {
        Self { db_pool, locks }
    }

    /// Registers a product and its initial stock row in `warehouse_id`.
    #[instrument(skip(self))]
    pub async fn create_in_warehouse(
        &self,
        warehouse_id: Uuid,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        require_warehouse(&txn, warehouse_id).await?;
        ensure_sku_available(&txn, &request.sku, None).await?;

        let created = product::ActiveModel {
            name: Set(request.name),
            sku: Set(request.sku.clone()),
            price: Set(request.price),
            stock_quantity: Set(request.stock_quantity),
            description: Set(request.description),
            category: Set(request.category),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let stock = stock::ActiveModel {
            product_id: Set(created.id),
            sku: Set(request.sku),
            stock_quantity: Set(request.stock_quantity),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        stock_warehouse::ActiveModel {
            stock_id: Set(stock.id),
            warehouse_id: Set(warehouse_id),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            product_id = %created.id,
            %warehouse_id,
            sku = %created.sku,
            initial_stock = created.stock_quantity,
            "Product created"
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_in_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<WarehouseProduct>, ServiceError> {
        let db = &*self.db_pool;
        require_warehouse(db, warehouse_id).await?;

        let rows = stock::Entity::find()
            .inner_join(stock_warehouse::Entity)
            .filter(stock_warehouse::Column::WarehouseId.eq(warehouse_id))
            .order_by_asc(stock::Column::CreatedAt)
            .find_also_related(product::Entity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut listed: Vec<WarehouseProduct> = Vec::with_capacity(rows.len());
        for (stock, product) in rows {
            let Some(product) = product else { continue };
            match listed.iter_mut().find(|p| p.id == product.id) {
                Some(entry) => {
                    entry.stock_quantity = entry.stock_quantity.saturating_add(stock.stock_quantity)
                }
                None => listed.push(WarehouseProduct {
                    id: product.id,
                    name: product.name,
                    sku: product.sku,
                    price: product.price,
                    stock_quantity: stock.stock_quantity,
                }),
            }
        }
        Ok(listed)
    }

    #[instrument(skip(self))]
    pub async fn get_in_warehouse(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductDetail, ServiceError> {
        let db = &*self.db_pool;
        require_warehouse(db, warehouse_id).await?;
        let product = require_product(db, product_id).await?;
        let stock = find_stock(db, product_id, warehouse_id, false)
            .await?
            .ok_or_else(|| not_in_warehouse(product_id, warehouse_id))?;

        Ok(ProductDetail::new(product, warehouse_id, stock.stock_quantity))
    }

    #[instrument(skip(self))]
    pub async fn replace(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
        request: ReplaceProductRequest,
    ) -> Result<ProductDetail, ServiceError> {
        reject_stock_quantity(&request.stock_quantity)?;
        request.validate()?;

        self.apply_update(warehouse_id, product_id, |active, current| {
            let new_sku = (request.sku != current.sku).then(|| request.sku.clone());
            active.name = Set(request.name);
            active.sku = Set(request.sku);
            active.price = Set(request.price);
            active.description = Set(request.description);
            active.category = Set(request.category);
            new_sku
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn patch(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
        request: PatchProductRequest,
    ) -> Result<ProductDetail, ServiceError> {
        reject_stock_quantity(&request.stock_quantity)?;
        request.validate()?;

        self.apply_update(warehouse_id, product_id, |active, current| {
            let mut new_sku = None;
            if let Some(name) = request.name {
                active.name = Set(name);
            }
            if let Some(sku) = request.sku {
                if sku != current.sku {
                    new_sku = Some(sku.clone());
                }
                active.sku = Set(sku);
            }
            if let Some(price) = request.price {
                active.price = Set(price);
            }
            if let Some(description) = request.description {
                active.description = Set(description);
            }
            if let Some(category) = request.category {
                active.category = Set(category);
            }
            new_sku
        })
        .await
    }

    /// Shared PUT/PATCH path. `edit` fills the active model and returns the new SKU if it changed.
    async fn apply_update<F>(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
        edit: F,
    ) -> Result<ProductDetail, ServiceError>
    where
        F: FnOnce(&mut product::ActiveModel, &product::Model) -> Option<String>,
    {
        let db = &*self.db_pool;
        require_warehouse(db, warehouse_id).await?;
        require_product(db, product_id).await?;
        let keys = self.stock_keys(product_id).await?;
        let guard = self.locks.acquire(&keys).await?;

        // Same order as the ledger: stock rows by key, then the product row.
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let mut stock = None;
        for &(_, key_warehouse) in guard.keys() {
            let locked = find_stock(&txn, product_id, key_warehouse, true).await?;
            if key_warehouse == warehouse_id {
                stock = locked;
            }
        }
        let stock = stock.ok_or_else(|| not_in_warehouse(product_id, warehouse_id))?;
        let current = product::Entity::find_by_id(product_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let mut active = current.clone().into_active_model();
        let new_sku = edit(&mut active, &current);

        if let Some(sku) = &new_sku {
            ensure_sku_available(&txn, sku, Some(product_id)).await?;
        }
        let updated = if active.is_changed() {
            active.update(&txn).await.map_err(ServiceError::db_error)?
        } else {
            current
        };
        if let Some(sku) = &new_sku {
            sync_stock_sku(&txn, product_id, sku).await?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;
        info!(%product_id, %warehouse_id, new_sku = ?new_sku, "Product updated");
        Ok(ProductDetail::new(updated, warehouse_id, stock.stock_quantity))
    }

    /// Ledger keys of every warehouse holding a stock row for `product_id`.
    async fn stock_keys(&self, product_id: Uuid) -> Result<Vec<StockKey>, ServiceError> {
        let links = stock_warehouse::Entity::find()
            .inner_join(stock::Entity)
            .filter(stock::Column::ProductId.eq(product_id))
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(links
            .into_iter()
            .map(|link| (product_id, link.warehouse_id))
            .collect())
    }

    /// Deletes a product whose stock rows all hold zero units, together with those rows.
    #[instrument(skip(self))]
    pub async fn delete(&self, warehouse_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        require_warehouse(db, warehouse_id).await?;
        require_product(db, product_id).await?;
        find_stock(db, product_id, warehouse_id, false)
            .await?
            .ok_or_else(|| not_in_warehouse(product_id, warehouse_id))?;

        let keys = self.stock_keys(product_id).await?;
        let _guard = self.locks.acquire(&keys).await?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let stocks = stock::Entity::find()
            .filter(stock::Column::ProductId.eq(product_id))
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let on_hand: i64 = stocks.iter().map(|s| i64::from(s.stock_quantity)).sum();
        if on_hand > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product {} still has {} unit(s) in stock",
                product_id, on_hand
            )));
        }

        let stock_ids: Vec<Uuid> = stocks.iter().map(|s| s.id).collect();
        stock_supplier::Entity::delete_many()
            .filter(stock_supplier::Column::StockId.is_in(stock_ids.clone()))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        stock_warehouse::Entity::delete_many()
            .filter(stock_warehouse::Column::StockId.is_in(stock_ids))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        stock::Entity::delete_many()
            .filter(stock::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        product::Entity::delete_by_id(product_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        info!(%product_id, %warehouse_id, removed_stock_rows = stocks.len(), "Product deleted");
        Ok(())
    }
}

fn not_in_warehouse(product_id: Uuid, warehouse_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!(
        "Product {} not found in warehouse {}",
        product_id, warehouse_id
    ))
}
