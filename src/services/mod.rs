use sea_orm::EntityTrait;

use crate::{
    entity::products::Entity as Products,
    error::{AppError, AppResult},
    state::AppState,
};

pub mod address_service;
pub mod cart_service;
pub mod collection_service;
pub mod customer_service;
pub mod image_service;
pub mod like_service;
pub mod order_service;
pub mod product_service;
pub mod promotion_service;
pub mod review_service;
pub mod tag_service;

/// Trim `value` and reject it when empty or longer than `max_chars`.
pub(crate) fn require_text(field: &str, value: &str, max_chars: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(field, format!("{field} may not be blank")));
    }
    if value.chars().count() > max_chars {
        return Err(AppError::validation(
            field,
            format!("{field} must have at most {max_chars} characters"),
        ));
    }
    Ok(value.to_string())
}

/// 404 unless the product exists.
pub(crate) async fn ensure_product(state: &AppState, product_id: i32) -> AppResult<()> {
    if Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }
    Ok(())
}
