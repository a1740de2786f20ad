use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_warehouses_table::Migration),
            Box::new(m20240101_000002_create_suppliers_table::Migration),
            Box::new(m20240101_000003_create_products_table::Migration),
            Box::new(m20240101_000004_create_stocks_table::Migration),
            Box::new(m20240101_000005_create_stock_link_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_warehouses_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_warehouses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Warehouses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Warehouses::Name).string_len(100).not_null())
                        .col(ColumnDef::new(Warehouses::Location).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Warehouses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Warehouses {
        Table,
        Id,
        Name,
        Location,
        CreatedAt,
    }
}

mod m20240101_000002_create_suppliers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_suppliers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Suppliers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Suppliers::Name).string_len(100).not_null())
                        .col(ColumnDef::new(Suppliers::ContactEmail).string_len(100).not_null())
                        .col(
                            ColumnDef::new(Suppliers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Suppliers {
        Table,
        Id,
        Name,
        ContactEmail,
        CreatedAt,
    }
}

mod m20240101_000003_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string_len(100).not_null())
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Price).decimal_len(10, 2).not_null())
                        .col(
                            ColumnDef::new(Products::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Products::StockQuantity).gte(0)),
                        )
                        .col(ColumnDef::new(Products::Description).string_len(500).null())
                        .col(ColumnDef::new(Products::Category).string_len(50).null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        Sku,
        Price,
        StockQuantity,
        Description,
        Category,
        CreatedAt,
    }
}

mod m20240101_000004_create_stocks_table {
    use super::m20240101_000003_create_products_table::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_stocks_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stocks::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stocks::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Stocks::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Stocks::Sku).string_len(50).not_null())
                        .col(
                            ColumnDef::new(Stocks::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Stocks::StockQuantity).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Stocks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stocks_product_id")
                                .from(Stocks::Table, Stocks::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stocks_product_id")
                        .table(Stocks::Table)
                        .col(Stocks::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Stocks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Stocks {
        Table,
        Id,
        ProductId,
        Sku,
        StockQuantity,
        CreatedAt,
    }
}

mod m20240101_000005_create_stock_link_tables {
    use super::m20240101_000001_create_warehouses_table::Warehouses;
    use super::m20240101_000002_create_suppliers_table::Suppliers;
    use super::m20240101_000004_create_stocks_table::Stocks;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_stock_link_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockWarehouses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StockWarehouses::StockId).uuid().not_null())
                        .col(ColumnDef::new(StockWarehouses::WarehouseId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(StockWarehouses::StockId)
                                .col(StockWarehouses::WarehouseId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_warehouses_stock_id")
                                .from(StockWarehouses::Table, StockWarehouses::StockId)
                                .to(Stocks::Table, Stocks::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_warehouses_warehouse_id")
                                .from(StockWarehouses::Table, StockWarehouses::WarehouseId)
                                .to(Warehouses::Table, Warehouses::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_warehouses_warehouse_id")
                        .table(StockWarehouses::Table)
                        .col(StockWarehouses::WarehouseId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockSuppliers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StockSuppliers::StockId).uuid().not_null())
                        .col(ColumnDef::new(StockSuppliers::SupplierId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(StockSuppliers::StockId)
                                .col(StockSuppliers::SupplierId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_suppliers_stock_id")
                                .from(StockSuppliers::Table, StockSuppliers::StockId)
                                .to(Stocks::Table, Stocks::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_suppliers_supplier_id")
                                .from(StockSuppliers::Table, StockSuppliers::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockSuppliers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockWarehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockWarehouses {
        Table,
        StockId,
        WarehouseId,
    }

    #[derive(DeriveIden)]
    enum StockSuppliers {
        Table,
        StockId,
        SupplierId,
    }
}
