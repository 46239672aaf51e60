use sea_orm_migration::prelude::*;

use super::{m20250101_000001_create_catalog::Products, m20250101_000002_create_ordering::Customers};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductImages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductImages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductImages::ProductId).integer().not_null())
                    .col(ColumnDef::new(ProductImages::Image).string_len(255).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_images_product")
                            .from(ProductImages::Table, ProductImages::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Promotions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Promotions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Promotions::Description).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Promotions::Discount)
                            .double()
                            .not_null()
                            .check(Expr::col(Promotions::Discount).gt(0)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductPromotions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductPromotions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductPromotions::ProductId).integer().not_null())
                    .col(ColumnDef::new(ProductPromotions::PromotionId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_promotions_product")
                            .from(ProductPromotions::Table, ProductPromotions::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_promotions_promotion")
                            .from(ProductPromotions::Table, ProductPromotions::PromotionId)
                            .to(Promotions::Table, Promotions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_product_promotions_product_promotion")
                    .table(ProductPromotions::Table)
                    .col(ProductPromotions::ProductId)
                    .col(ProductPromotions::PromotionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Addresses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Addresses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Addresses::Street).string_len(255).not_null())
                    .col(ColumnDef::new(Addresses::City).string_len(255).not_null())
                    .col(ColumnDef::new(Addresses::CustomerId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_addresses_customer")
                            .from(Addresses::Table, Addresses::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Addresses::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductPromotions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Promotions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductImages::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductImages {
    Table,
    Id,
    ProductId,
    Image,
}

#[derive(DeriveIden)]
enum Promotions {
    Table,
    Id,
    Description,
    Discount,
}

#[derive(DeriveIden)]
enum ProductPromotions {
    Table,
    Id,
    ProductId,
    PromotionId,
}

#[derive(DeriveIden)]
enum Addresses {
    Table,
    Id,
    Street,
    City,
    CustomerId,
}
