use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::{
    audit,
    dto::promotions::{AttachPromotionRequest, CreatePromotionRequest, PromotionList},
    entity::{
        product_promotions::{
            ActiveModel as LinkActive, Column as LinkCol, Entity as ProductPromotions,
        },
        promotions::{ActiveModel, Column, Entity as Promotions, Model as PromotionModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Promotion,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{ensure_product, require_text},
    state::AppState,
};

pub async fn list_promotions(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<PromotionList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Promotions::find().order_by_asc(Column::Id);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(promotion_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Promotions",
        PromotionList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_promotion(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePromotionRequest,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_admin(user)?;
    let description = require_text("description", &payload.description, 255)?;
    validate_discount(payload.discount)?;

    let promotion = ActiveModel {
        id: NotSet,
        description: Set(description),
        discount: Set(payload.discount),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "promotion_create",
        "promotions",
        serde_json::json!({ "promotion_id": promotion.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Promotion created",
        promotion_from_entity(promotion),
        Some(Meta::empty()),
    ))
}

/// Removes the promotion together with its product links.
pub async fn delete_promotion(state: &AppState, user: &AuthUser, id: i32) -> AppResult<()> {
    ensure_admin(user)?;
    let result = Promotions::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    audit::record(
        &state.orm,
        Some(user.user_id),
        "promotion_delete",
        "promotions",
        serde_json::json!({ "promotion_id": id }),
    )
    .await;
    Ok(())
}

pub async fn list_product_promotions(
    state: &AppState,
    product_id: i32,
) -> AppResult<ApiResponse<PromotionList>> {
    ensure_product(state, product_id).await?;
    let items: Vec<Promotion> = Promotions::find()
        .inner_join(ProductPromotions)
        .filter(LinkCol::ProductId.eq(product_id))
        .order_by_asc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(promotion_from_entity)
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Promotions",
        PromotionList { items },
        Some(Meta::new(1, total, total)),
    ))
}

/// Attaching a promotion that is already attached is a no-op.
pub async fn attach_promotion(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
    payload: AttachPromotionRequest,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_admin(user)?;
    ensure_product(state, product_id).await?;
    let promotion = Promotions::find_by_id(payload.promotion_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            AppError::validation("promotion_id", "No promotion with the given ID was found.")
        })?;

    let existing = ProductPromotions::find()
        .filter(LinkCol::ProductId.eq(product_id))
        .filter(LinkCol::PromotionId.eq(promotion.id))
        .one(&state.orm)
        .await?;
    if existing.is_none() {
        LinkActive {
            id: NotSet,
            product_id: Set(product_id),
            promotion_id: Set(promotion.id),
        }
        .insert(&state.orm)
        .await?;
    }

    Ok(ApiResponse::success(
        "Promotion attached",
        promotion_from_entity(promotion),
        None,
    ))
}

pub async fn detach_promotion(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
    promotion_id: i32,
) -> AppResult<()> {
    ensure_admin(user)?;
    let result = ProductPromotions::delete_many()
        .filter(LinkCol::ProductId.eq(product_id))
        .filter(LinkCol::PromotionId.eq(promotion_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Percentage off, strictly positive and at most 100.
fn validate_discount(discount: f64) -> AppResult<()> {
    if !discount.is_finite() || discount <= 0.0 || discount > 100.0 {
        return Err(AppError::validation(
            "discount",
            "discount must be greater than 0 and at most 100",
        ));
    }
    Ok(())
}

fn promotion_from_entity(model: PromotionModel) -> Promotion {
    Promotion {
        id: model.id,
        description: model.description,
        discount: model.discount,
    }
}
