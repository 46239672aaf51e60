use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub description: String,
    /// Percentage off.
    pub discount: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_promotions::Entity")]
    ProductPromotions,
}

impl Related<super::product_promotions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductPromotions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
