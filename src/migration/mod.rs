pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_catalog;
mod m20250101_000002_create_ordering;
mod m20250101_000003_create_engagement;
mod m20250201_000004_create_merchandising;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_catalog::Migration),
            Box::new(m20250101_000002_create_ordering::Migration),
            Box::new(m20250101_000003_create_engagement::Migration),
            Box::new(m20250201_000004_create_merchandising::Migration),
        ]
    }
}
