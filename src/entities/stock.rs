use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// A stock ledger line: the quantity of one product held by the warehouses
/// linked through `stock_warehouses`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stocks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    /// Copy of the owning product's SKU
    pub sku: String,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Restrict"
    )]
    Product,
    #[sea_orm(has_many = "super::stock_warehouse::Entity")]
    StockWarehouses,
    #[sea_orm(has_many = "super::stock_supplier::Entity")]
    StockSuppliers,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::stock_warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockWarehouses.def()
    }
}

impl Related<super::stock_supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockSuppliers.def()
    }
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        super::stock_warehouse::Relation::Warehouse.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::stock_warehouse::Relation::Stock.def().rev())
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        super::stock_supplier::Relation::Supplier.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::stock_supplier::Relation::Stock.def().rev())
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }

        if let ActiveValue::Set(quantity) = active_model.stock_quantity {
            if quantity < 0 {
                return Err(DbErr::Custom(format!(
                    "stock_quantity cannot be negative: {}",
                    quantity
                )));
            }
        }

        Ok(active_model)
    }
}
