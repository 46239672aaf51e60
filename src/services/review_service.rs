use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::{
    dto::reviews::{CreateReviewRequest, ReviewList},
    entity::{
        reviews::{ActiveModel, Column, Entity as Reviews, Model as ReviewModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{customer_service, ensure_product, require_text},
    state::AppState,
};

pub async fn list_reviews(
    state: &AppState,
    product_id: i32,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReviewList>> {
    ensure_product(state, product_id).await?;
    let (page, limit, offset) = pagination.normalize();
    let finder = Reviews::find()
        .filter(Column::ProductId.eq(product_id))
        .order_by_desc(Column::Date);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Reviews", ReviewList { items }, Some(meta)))
}

pub async fn get_review(
    state: &AppState,
    product_id: i32,
    review_id: i32,
) -> AppResult<ApiResponse<Review>> {
    let review = find_review(state, product_id, review_id).await?;
    Ok(ApiResponse::success("Review", review_from_entity(review), None))
}

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_product(state, product_id).await?;
    let text = require_text("text", &payload.text, 10_000)?;
    let customer = customer_service::ensure_customer(&state.orm, user.user_id).await?;

    let review = ActiveModel {
        id: NotSet,
        product_id: Set(product_id),
        customer_id: Set(customer.id),
        text: Set(text),
        date: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Review created",
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

/// Authors may delete their own reviews; admins may delete any.
pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
    review_id: i32,
) -> AppResult<()> {
    let review = find_review(state, product_id, review_id).await?;
    if !user.is_admin() {
        let customer = customer_service::find_by_user(&state.orm, user.user_id).await?;
        if customer.map(|c| c.id) != Some(review.customer_id) {
            return Err(AppError::Forbidden);
        }
    }
    Reviews::delete_by_id(review.id).exec(&state.orm).await?;
    Ok(())
}

async fn find_review(state: &AppState, product_id: i32, review_id: i32) -> AppResult<ReviewModel> {
    Reviews::find_by_id(review_id)
        .filter(Column::ProductId.eq(product_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        product_id: model.product_id,
        customer_id: model.customer_id,
        text: model.text,
        date: model.date.with_timezone(&Utc),
    }
}
