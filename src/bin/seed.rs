use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{collections, products, tags},
    services::product_service::slugify,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let apparel = ensure_collection(&orm, "Apparel").await?;
    let books = ensure_collection(&orm, "Books").await?;
    let goodies = ensure_collection(&orm, "Goodies").await?;

    seed_products(
        &orm,
        &[
            ("Axum Hoodie", "Warm hoodie for Rustaceans", 5500, 50, apparel),
            ("Ferris Mug", "Coffee tastes better with Ferris", 1200, 100, goodies),
            ("Rust Sticker Pack", "Decorate your laptop", 500, 200, goodies),
            ("E-book: Async Rust", "Learn async Rust patterns", 2500, 75, books),
        ],
    )
    .await?;

    for label in ["new", "bestseller", "gift"] {
        ensure_tag(&orm, label).await?;
    }

    println!("Seed completed");
    Ok(())
}

async fn ensure_collection(orm: &DatabaseConnection, title: &str) -> anyhow::Result<i32> {
    if let Some(existing) = collections::Entity::find()
        .filter(collections::Column::Title.eq(title))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let inserted = collections::ActiveModel {
        id: NotSet,
        title: Set(title.to_string()),
        featured_product_id: Set(None),
    }
    .insert(orm)
    .await?;

    println!("Ensured collection {title}");
    Ok(inserted.id)
}

async fn seed_products(
    orm: &DatabaseConnection,
    rows: &[(&str, &str, i64, i32, i32)],
) -> anyhow::Result<()> {
    for &(title, description, unit_price, inventory, collection_id) in rows {
        let slug = slugify(title);
        let exists = products::Entity::find()
            .filter(products::Column::Slug.eq(slug.as_str()))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        products::ActiveModel {
            id: NotSet,
            title: Set(title.to_string()),
            slug: Set(slug),
            description: Set(Some(description.to_string())),
            unit_price: Set(unit_price),
            inventory: Set(inventory),
            last_update: Set(Utc::now().into()),
            collection_id: Set(collection_id),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn ensure_tag(orm: &DatabaseConnection, label: &str) -> anyhow::Result<()> {
    let exists = tags::Entity::find()
        .filter(tags::Column::Label.eq(label))
        .one(orm)
        .await?
        .is_some();
    if !exists {
        tags::ActiveModel {
            id: NotSet,
            label: Set(label.to_string()),
        }
        .insert(orm)
        .await?;
    }
    Ok(())
}
