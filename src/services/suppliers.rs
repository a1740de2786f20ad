use crate::{
    db::DbPool,
    entities::{stock_supplier, supplier},
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

use super::resolver::require_supplier;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email, length(max = 100))]
    pub contact_email: String,
}

pub type ReplaceSupplierRequest = CreateSupplierRequest;

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PatchSupplierRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email, length(max = 100))]
    pub contact_email: Option<String>,
}

/// Service for managing suppliers
pub struct SupplierService {
    db_pool: Arc<DbPool>,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, request: CreateSupplierRequest) -> Result<supplier::Model, ServiceError> {
        request.validate()?;

        let created = supplier::ActiveModel {
            name: Set(request.name),
            contact_email: Set(request.contact_email),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(ServiceError::db_error)?;

        info!(supplier_id = %created.id, name = %created.name, "Supplier created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<supplier::Model, ServiceError> {
        require_supplier(&*self.db_pool, id).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        supplier::Entity::find()
            .order_by_asc(supplier::Column::CreatedAt)
            .order_by_asc(supplier::Column::Id)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn replace(
        &self,
        id: Uuid,
        request: ReplaceSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request.validate()?;
        let existing = require_supplier(&*self.db_pool, id).await?;

        let mut active = existing.into_active_model();
        active.name = Set(request.name);
        active.contact_email = Set(request.contact_email);
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn patch(
        &self,
        id: Uuid,
        request: PatchSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request.validate()?;
        let existing = require_supplier(&*self.db_pool, id).await?;

        let mut active = existing.clone().into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(contact_email) = request.contact_email {
            active.contact_email = Set(contact_email);
        }
        if !active.is_changed() {
            return Ok(existing);
        }
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Removes a supplier no stock row references.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        require_supplier(db, id).await?;

        let linked = stock_supplier::Entity::find()
            .filter(stock_supplier::Column::SupplierId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if linked > 0 {
            return Err(ServiceError::Conflict(format!(
                "Supplier {} is linked to {} stock record(s)",
                id, linked
            )));
        }

        supplier::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }
}
