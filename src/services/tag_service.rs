use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::{
    audit,
    dto::tags::{AttachTagRequest, CreateTagRequest, TagList},
    entity::{
        tagged_items::{ActiveModel as TaggedActive, Column as TaggedCol, Entity as TaggedItems},
        tags::{ActiveModel, Column, Entity as Tags, Model as TagModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Tag,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{ensure_product, require_text},
    state::AppState,
};

pub async fn list_tags(state: &AppState, pagination: Pagination) -> AppResult<ApiResponse<TagList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Tags::find().order_by_asc(Column::Label);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tag_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Tags",
        TagList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_tag(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTagRequest,
) -> AppResult<ApiResponse<Tag>> {
    ensure_admin(user)?;
    let label = require_text("label", &payload.label, 255)?;
    let tag = ActiveModel {
        id: NotSet,
        label: Set(label),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Tag created",
        tag_from_entity(tag),
        Some(Meta::empty()),
    ))
}

pub async fn list_product_tags(
    state: &AppState,
    product_id: i32,
) -> AppResult<ApiResponse<TagList>> {
    ensure_product(state, product_id).await?;
    let items: Vec<Tag> = Tags::find()
        .inner_join(TaggedItems)
        .filter(TaggedCol::ProductId.eq(product_id))
        .order_by_asc(Column::Label)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tag_from_entity)
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Tags",
        TagList { items },
        Some(Meta::new(1, total, total)),
    ))
}

/// Attaching a tag that is already attached is a no-op.
pub async fn attach_tag(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
    payload: AttachTagRequest,
) -> AppResult<ApiResponse<Tag>> {
    ensure_admin(user)?;
    ensure_product(state, product_id).await?;
    let tag = Tags::find_by_id(payload.tag_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::validation("tag_id", "No tag with the given ID was found."))?;

    let existing = TaggedItems::find()
        .filter(TaggedCol::TagId.eq(tag.id))
        .filter(TaggedCol::ProductId.eq(product_id))
        .one(&state.orm)
        .await?;
    if existing.is_none() {
        TaggedActive {
            id: NotSet,
            tag_id: Set(tag.id),
            product_id: Set(product_id),
        }
        .insert(&state.orm)
        .await?;

        audit::record(
            &state.orm,
            Some(user.user_id),
            "product_tag",
            "tagged_items",
            serde_json::json!({ "product_id": product_id, "tag_id": tag.id }),
        )
        .await;
    }

    Ok(ApiResponse::success("Tagged", tag_from_entity(tag), None))
}

pub async fn detach_tag(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
    tag_id: i32,
) -> AppResult<()> {
    ensure_admin(user)?;
    let result = TaggedItems::delete_many()
        .filter(TaggedCol::TagId.eq(tag_id))
        .filter(TaggedCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

fn tag_from_entity(model: TagModel) -> Tag {
    Tag {
        id: model.id,
        label: model.label,
    }
}
