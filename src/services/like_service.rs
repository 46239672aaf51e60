use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::{
    dto::likes::{LikeRequest, LikedProductList},
    entity::{
        likes::{ActiveModel, Column, Entity as Likes, Model as LikeModel},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Like,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::product_service::product_from_entity,
    state::AppState,
};

pub async fn list_likes(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<LikedProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Likes::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id);
    let total = finder.clone().count(&state.orm).await? as i64;

    let tax = state.config.tax_percent;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .find_also_related(Products)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|(_, product)| product)
        .map(|product| product_from_entity(product, tax))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", LikedProductList { items }, Some(meta)))
}

/// Liking an already liked product returns the existing like.
pub async fn like_product(
    state: &AppState,
    user: &AuthUser,
    payload: LikeRequest,
) -> AppResult<ApiResponse<Like>> {
    if Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::validation(
            "product_id",
            "No product with the given ID was found.",
        ));
    }

    let existing = Likes::find()
        .filter(Column::UserId.eq(user.user_id))
        .filter(Column::ProductId.eq(payload.product_id))
        .one(&state.orm)
        .await?;

    let like = match existing {
        Some(like) => like,
        None => {
            ActiveModel {
                id: NotSet,
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                created_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?
        }
    };

    Ok(ApiResponse::success("Liked", like_from_entity(like), None))
}

pub async fn unlike_product(state: &AppState, user: &AuthUser, product_id: i32) -> AppResult<()> {
    let result = Likes::delete_many()
        .filter(Column::UserId.eq(user.user_id))
        .filter(Column::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

fn like_from_entity(model: LikeModel) -> Like {
    Like {
        id: model.id,
        user_id: model.user_id,
        product_id: model.product_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
