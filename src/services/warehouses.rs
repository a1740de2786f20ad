use crate::{
    db::DbPool,
    entities::{stock_warehouse, warehouse},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::resolver::require_warehouse;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateWarehouseRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
}

/// Full replacement (PUT); every field is required.
pub type ReplaceWarehouseRequest = CreateWarehouseRequest;

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PatchWarehouseRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub location: Option<String>,
}

/// Service for managing warehouses
pub struct WarehouseService {
    db_pool: Arc<DbPool>,
}

impl WarehouseService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, request: CreateWarehouseRequest) -> Result<warehouse::Model, ServiceError> {
        request.validate()?;

        let created = warehouse::ActiveModel {
            name: Set(request.name),
            location: Set(request.location),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(ServiceError::db_error)?;

        info!(warehouse_id = %created.id, name = %created.name, "Warehouse created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<warehouse::Model, ServiceError> {
        require_warehouse(&*self.db_pool, id).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<warehouse::Model>, ServiceError> {
        warehouse::Entity::find()
            .order_by_asc(warehouse::Column::CreatedAt)
            .order_by_asc(warehouse::Column::Id)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn replace(
        &self,
        id: Uuid,
        request: ReplaceWarehouseRequest,
    ) -> Result<warehouse::Model, ServiceError> {
        request.validate()?;
        let existing = require_warehouse(&*self.db_pool, id).await?;

        let mut active = existing.into_active_model();
        active.name = Set(request.name);
        active.location = Set(request.location);
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn patch(
        &self,
        id: Uuid,
        request: PatchWarehouseRequest,
    ) -> Result<warehouse::Model, ServiceError> {
        request.validate()?;
        let existing = require_warehouse(&*self.db_pool, id).await?;

        let mut active = existing.clone().into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(location) = request.location {
            active.location = Set(location);
        }
        if !active.is_changed() {
            return Ok(existing);
        }
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Removes a warehouse that holds no stock rows.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        require_warehouse(db, id).await?;

        let linked = stock_warehouse::Entity::find()
            .filter(stock_warehouse::Column::WarehouseId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if linked > 0 {
            return Err(ServiceError::Conflict(format!(
                "Warehouse {} still holds {} stock record(s)",
                id, linked
            )));
        }

        warehouse::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(warehouse_id = %id, "Warehouse deleted");
        Ok(())
    }
}
