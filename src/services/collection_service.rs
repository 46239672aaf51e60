use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::Expr;

use crate::{
    audit,
    dto::collections::{CollectionList, CollectionRequest},
    entity::{
        collections::{ActiveModel, Column, Entity as Collections, Model as CollectionModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Collection,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::require_text,
    state::AppState,
};

pub async fn list_collections(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<CollectionList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Collections::find().order_by_asc(Column::Title);
    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let ids: Vec<i32> = models.iter().map(|c| c.id).collect();
    let counts = product_counts(&state.orm, ids).await?;
    let items = models
        .into_iter()
        .map(|model| {
            let count = counts.get(&model.id).copied().unwrap_or(0);
            collection_from_entity(model, count)
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Collections",
        CollectionList { items },
        Some(meta),
    ))
}

pub async fn get_collection(state: &AppState, id: i32) -> AppResult<ApiResponse<Collection>> {
    let model = Collections::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let count = product_count(&state.orm, id).await?;
    Ok(ApiResponse::success(
        "Collection",
        collection_from_entity(model, count),
        None,
    ))
}

pub async fn create_collection(
    state: &AppState,
    user: &AuthUser,
    payload: CollectionRequest,
) -> AppResult<ApiResponse<Collection>> {
    ensure_admin(user)?;
    let title = require_text("title", &payload.title, 255)?;
    ensure_featured_product(state, payload.featured_product_id).await?;

    let model = ActiveModel {
        id: NotSet,
        title: Set(title),
        featured_product_id: Set(payload.featured_product_id),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "collection_create",
        "collections",
        serde_json::json!({ "collection_id": model.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Collection created",
        collection_from_entity(model, 0),
        Some(Meta::empty()),
    ))
}

pub async fn update_collection(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: CollectionRequest,
) -> AppResult<ApiResponse<Collection>> {
    ensure_admin(user)?;
    let existing = Collections::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let title = require_text("title", &payload.title, 255)?;
    ensure_featured_product(state, payload.featured_product_id).await?;

    let mut active: ActiveModel = existing.into();
    active.title = Set(title);
    active.featured_product_id = Set(payload.featured_product_id);
    let model = active.update(&state.orm).await?;
    let count = product_count(&state.orm, id).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "collection_update",
        "collections",
        serde_json::json!({ "collection_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        collection_from_entity(model, count),
        Some(Meta::empty()),
    ))
}

pub async fn delete_collection(state: &AppState, user: &AuthUser, id: i32) -> AppResult<()> {
    ensure_admin(user)?;
    if Collections::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    if product_count(&state.orm, id).await? > 0 {
        return Err(AppError::Conflict(
            "Collection cannot be deleted as it contains one or more products.".into(),
        ));
    }

    Collections::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "collection_delete",
        "collections",
        serde_json::json!({ "collection_id": id }),
    )
    .await;

    Ok(())
}

async fn ensure_featured_product(state: &AppState, product_id: Option<i32>) -> AppResult<()> {
    let Some(product_id) = product_id else {
        return Ok(());
    };
    if Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::validation(
            "featured_product_id",
            "No product with the given ID was found.",
        ));
    }
    Ok(())
}

async fn product_count<C: ConnectionTrait>(conn: &C, collection_id: i32) -> Result<i64, DbErr> {
    let count = Products::find()
        .filter(ProdCol::CollectionId.eq(collection_id))
        .count(conn)
        .await?;
    Ok(count as i64)
}

/// Product counts for many collections in one grouped query.
async fn product_counts<C: ConnectionTrait>(
    conn: &C,
    collection_ids: Vec<i32>,
) -> Result<HashMap<i32, i64>, DbErr> {
    if collection_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, i64)> = Products::find()
        .select_only()
        .column(ProdCol::CollectionId)
        .column_as(Expr::col(ProdCol::Id).count(), "product_count")
        .filter(ProdCol::CollectionId.is_in(collection_ids))
        .group_by(ProdCol::CollectionId)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows.into_iter().collect())
}

fn collection_from_entity(model: CollectionModel, product_count: i64) -> Collection {
    Collection {
        id: model.id,
        title: model.title,
        featured_product_id: model.featured_product_id,
        product_count,
    }
}
