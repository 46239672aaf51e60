use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // featured_product_id has no FK: products reference collections, and the
        // product service clears the column when the featured product goes away.
        manager
            .create_table(
                Table::create()
                    .table(Collections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Collections::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Collections::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Collections::FeaturedProductId).integer().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Products::Slug).string_len(255).not_null())
                    .col(ColumnDef::new(Products::Description).text().null())
                    .col(
                        ColumnDef::new(Products::UnitPrice)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Products::UnitPrice).gte(1)),
                    )
                    .col(
                        ColumnDef::new(Products::Inventory)
                            .integer()
                            .not_null()
                            .check(Expr::col(Products::Inventory).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Products::LastUpdate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Products::CollectionId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_collection")
                            .from(Products::Table, Products::CollectionId)
                            .to(Collections::Table, Collections::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_products_collection")
                    .table(Products::Table)
                    .col(Products::CollectionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Collections::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Collections {
    Table,
    Id,
    Title,
    FeaturedProductId,
}

#[derive(DeriveIden)]
pub(crate) enum Products {
    Table,
    Id,
    Title,
    Slug,
    Description,
    UnitPrice,
    Inventory,
    LastUpdate,
    CollectionId,
}
