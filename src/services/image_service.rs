use std::path::{Path, PathBuf};

use anyhow::Context;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::images::ProductImageList,
    entity::product_images::{ActiveModel, Column, Entity as ProductImages, Model as ImageModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::ProductImage,
    response::{ApiResponse, Meta},
    services::ensure_product,
    state::AppState,
};

/// Directory under the media root that holds product images.
pub const IMAGE_DIR: &str = "store/images";

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

pub async fn list_images(
    state: &AppState,
    product_id: i32,
) -> AppResult<ApiResponse<ProductImageList>> {
    ensure_product(state, product_id).await?;
    let items: Vec<ProductImage> = ProductImages::find()
        .filter(Column::ProductId.eq(product_id))
        .order_by_asc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(image_from_entity)
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Images",
        ProductImageList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_image(
    state: &AppState,
    product_id: i32,
    image_id: i32,
) -> AppResult<ApiResponse<ProductImage>> {
    let image = find_image(state, product_id, image_id).await?;
    Ok(ApiResponse::success(
        "Image",
        image_from_entity(image),
        Some(Meta::empty()),
    ))
}

/// Store `bytes` under the media root and record it against the product.
pub async fn upload_image(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
    file_name: &str,
    bytes: &[u8],
) -> AppResult<ApiResponse<ProductImage>> {
    ensure_admin(user)?;
    ensure_product(state, product_id).await?;
    let extension = validate_image(file_name, bytes.len(), state.config.max_image_bytes)?;

    let relative = format!("{IMAGE_DIR}/{}.{extension}", Uuid::new_v4());
    let path = media_path(&state.config.media_dir, &relative);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create {}", parent.display()))?;
    }
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("write {}", path.display()))?;

    let inserted = ActiveModel {
        id: NotSet,
        product_id: Set(product_id),
        image: Set(relative.clone()),
    }
    .insert(&state.orm)
    .await;
    let image = match inserted {
        Ok(image) => image,
        Err(err) => {
            remove_files(&state.config.media_dir, [relative]).await;
            return Err(err.into());
        }
    };

    tracing::info!(product_id, image_id = image.id, size = bytes.len(), "product image stored");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_image_upload",
        "product_images",
        serde_json::json!({ "product_id": product_id, "image_id": image.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Image uploaded",
        image_from_entity(image),
        Some(Meta::empty()),
    ))
}

pub async fn delete_image(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
    image_id: i32,
) -> AppResult<()> {
    ensure_admin(user)?;
    let image = find_image(state, product_id, image_id).await?;
    ProductImages::delete_by_id(image.id).exec(&state.orm).await?;
    remove_files(&state.config.media_dir, [image.image]).await;
    Ok(())
}

/// Best-effort removal of stored files; failures are only logged.
pub async fn remove_files(media_dir: &str, relative_paths: impl IntoIterator<Item = String>) {
    for relative in relative_paths {
        let path = media_path(media_dir, &relative);
        if let Err(err) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove media file");
        }
    }
}

/// Check size and extension, returning the lowercased extension.
pub fn validate_image(file_name: &str, size: usize, max_bytes: usize) -> AppResult<String> {
    if size == 0 {
        return Err(AppError::validation("image", "The submitted file is empty."));
    }
    if size > max_bytes {
        return Err(AppError::validation(
            "image",
            format!("Image too big, max allowed: {} KB", max_bytes / 1024),
        ));
    }
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::validation(
            "image",
            format!("Unsupported image type, allowed: {}", ALLOWED_EXTENSIONS.join(", ")),
        ));
    }
    Ok(extension)
}

pub fn media_path(media_dir: &str, relative: &str) -> PathBuf {
    Path::new(media_dir).join(relative)
}

async fn find_image(state: &AppState, product_id: i32, image_id: i32) -> AppResult<ImageModel> {
    ProductImages::find_by_id(image_id)
        .filter(Column::ProductId.eq(product_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn image_from_entity(model: ImageModel) -> ProductImage {
    ProductImage {
        id: model.id,
        product_id: model.product_id,
        image: format!("/media/{}", model.image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_image_checks_size_and_extension() {
        assert_eq!(validate_image("Cat.PNG", 10, 1024).unwrap(), "png");
        assert!(matches!(
            validate_image("cat.png", 2048, 1024),
            Err(AppError::Validation { field, message })
                if field == "image" && message == "Image too big, max allowed: 1 KB"
        ));
        assert!(validate_image("cat.png", 0, 1024).is_err());
        assert!(validate_image("notes.txt", 10, 1024).is_err());
        assert!(validate_image("no-extension", 10, 1024).is_err());
    }
}
