#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ConnectOptions, Database, Set};
use storefront_api::{
    config::AppConfig,
    db::run_migrations,
    entity::{collections, customers, products},
    events::EventBus,
    middleware::auth::{ADMIN_ROLE, AuthUser},
    models::Membership,
    state::AppState,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: JWT_SECRET.to_string(),
        tax_percent: 10,
        concurrency_limit: 16,
        body_limit_bytes: 64 * 1024,
        media_dir: std::env::temp_dir()
            .join(format!("storefront-test-{}", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned(),
        max_image_bytes: 4 * 1024,
    }
}

/// Fresh in-memory database with the schema applied. A single pooled
/// connection keeps every query on the same SQLite database.
pub async fn setup_state(events: EventBus) -> anyhow::Result<AppState> {
    let config = test_config();
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(orm, config, events))
}

pub fn user(user_id: i64) -> AuthUser {
    AuthUser {
        user_id,
        role: "user".into(),
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        user_id: 1,
        role: ADMIN_ROLE.into(),
    }
}

pub async fn create_collection(state: &AppState, title: &str) -> anyhow::Result<i32> {
    let model = collections::ActiveModel {
        id: NotSet,
        title: Set(title.to_string()),
        featured_product_id: Set(None),
    }
    .insert(&state.orm)
    .await?;
    Ok(model.id)
}

pub async fn create_product(
    state: &AppState,
    collection_id: i32,
    title: &str,
    unit_price: i64,
) -> anyhow::Result<products::Model> {
    let model = products::ActiveModel {
        id: NotSet,
        title: Set(title.to_string()),
        slug: Set(title.to_lowercase().replace(' ', "-")),
        description: Set(None),
        unit_price: Set(unit_price),
        inventory: Set(10),
        last_update: Set(Utc::now().into()),
        collection_id: Set(collection_id),
    }
    .insert(&state.orm)
    .await?;
    Ok(model)
}

pub async fn create_customer(state: &AppState, user_id: i64) -> anyhow::Result<customers::Model> {
    let model = customers::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        phone: Set("555-0100".to_string()),
        birth_date: Set(None),
        membership: Set(Membership::Bronze),
    }
    .insert(&state.orm)
    .await?;
    Ok(model)
}
