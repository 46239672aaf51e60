use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::Expr;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        collections::{Column as CollectionCol, Entity as Collections},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        product_images::{Column as ImageCol, Entity as ProductImages},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, SimpleProduct},
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    services::{image_service, require_text},
    state::AppState,
};

/// Highest price the catalog accepts, in cents (9999.99).
pub const MAX_UNIT_PRICE: i64 = 999_999;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(collection_id) = query.collection_id {
        condition = condition.add(Column::CollectionId.eq(collection_id));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_asc(Column::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let tax = state.config.tax_percent;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| product_from_entity(model, tax))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: i32) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product, state.config.tax_percent),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let title = require_text("title", &payload.title, 255)?;
    let slug = match payload.slug.as_deref() {
        Some(slug) => require_text("slug", slug, 255)?,
        None => slugify(&title),
    };
    validate_unit_price(payload.unit_price)?;
    validate_inventory(payload.inventory)?;
    ensure_collection(state, payload.collection_id).await?;

    let product = ActiveModel {
        id: NotSet,
        title: Set(title),
        slug: Set(slug),
        description: Set(payload.description),
        unit_price: Set(payload.unit_price),
        inventory: Set(payload.inventory),
        last_update: Set(Utc::now().into()),
        collection_id: Set(payload.collection_id),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product, state.config.tax_percent),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.is_empty() {
        return Err(AppError::BadRequest("no fields to update".into()));
    }
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(require_text("title", &title, 255)?);
    }
    if let Some(slug) = payload.slug {
        active.slug = Set(require_text("slug", &slug, 255)?);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(unit_price) = payload.unit_price {
        validate_unit_price(unit_price)?;
        active.unit_price = Set(unit_price);
    }
    if let Some(inventory) = payload.inventory {
        validate_inventory(inventory)?;
        active.inventory = Set(inventory);
    }
    if let Some(collection_id) = payload.collection_id {
        ensure_collection(state, collection_id).await?;
        active.collection_id = Set(collection_id);
    }
    active.last_update = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product, state.config.tax_percent),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(state: &AppState, user: &AuthUser, id: i32) -> AppResult<()> {
    ensure_admin(user)?;
    if Products::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let ordered = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::Conflict(
            "Product cannot be deleted as it is associated with an order item.".into(),
        ));
    }

    let images: Vec<String> = ProductImages::find()
        .filter(ImageCol::ProductId.eq(id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|image| image.image)
        .collect();

    let txn = state.orm.begin().await?;
    Collections::update_many()
        .col_expr(
            CollectionCol::FeaturedProductId,
            Expr::value(Option::<i32>::None),
        )
        .filter(CollectionCol::FeaturedProductId.eq(id))
        .exec(&txn)
        .await?;
    Products::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    image_service::remove_files(&state.config.media_dir, images).await;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(())
}

async fn ensure_collection(state: &AppState, collection_id: i32) -> AppResult<()> {
    if Collections::find_by_id(collection_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::validation(
            "collection_id",
            "No collection with the given ID was found.",
        ));
    }
    Ok(())
}

fn validate_unit_price(unit_price: i64) -> AppResult<()> {
    if !(1..=MAX_UNIT_PRICE).contains(&unit_price) {
        return Err(AppError::validation(
            "unit_price",
            format!("unit_price must be between 1 and {MAX_UNIT_PRICE} cents"),
        ));
    }
    Ok(())
}

fn validate_inventory(inventory: i32) -> AppResult<()> {
    if inventory < 0 {
        return Err(AppError::validation(
            "inventory",
            "inventory must not be negative",
        ));
    }
    Ok(())
}

/// `unit_price` with `tax_percent` applied, rounded half-up to the cent.
pub fn price_plus_tax(unit_price: i64, tax_percent: i64) -> i64 {
    (unit_price * (100 + tax_percent) + 50) / 100
}

/// Lowercase ASCII-alphanumeric words joined by `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub(crate) fn product_from_entity(model: ProductModel, tax_percent: i64) -> Product {
    Product {
        id: model.id,
        price_plus_tax: price_plus_tax(model.unit_price, tax_percent),
        title: model.title,
        slug: model.slug,
        description: model.description,
        unit_price: model.unit_price,
        inventory: model.inventory,
        collection_id: model.collection_id,
        last_update: model.last_update.with_timezone(&Utc),
    }
}

pub(crate) fn simple_product(model: &ProductModel) -> SimpleProduct {
    SimpleProduct {
        id: model.id,
        title: model.title.clone(),
        unit_price: model.unit_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_rounds_half_up() {
        assert_eq!(price_plus_tax(1999, 10), 2199);
        assert_eq!(price_plus_tax(1000, 10), 1100);
        assert_eq!(price_plus_tax(5, 10), 6);
        assert_eq!(price_plus_tax(1999, 0), 1999);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Ferris Mug"), "ferris-mug");
        assert_eq!(slugify("  E-book: Async Rust!! "), "e-book-async-rust");
        assert_eq!(slugify("***"), "");
    }
}
