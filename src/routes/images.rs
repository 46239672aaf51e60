use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};

use crate::{
    dto::images::{ImageUpload, ProductImageList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::ProductImage,
    response::ApiResponse,
    services::image_service,
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/api/products/{id}/images",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Images of a product", body = ApiResponse<ProductImageList>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Images"
)]
pub async fn list_images(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<ProductImageList>>> {
    let resp = image_service::list_images(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/images/{image_id}",
    params(
        ("id" = i32, Path, description = "Product ID"),
        ("image_id" = i32, Path, description = "Image ID"),
    ),
    responses(
        (status = 200, description = "Image", body = ApiResponse<ProductImage>),
        (status = 404, description = "Image not found"),
    ),
    tag = "Images"
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i32, i32)>,
) -> AppResult<Json<ApiResponse<ProductImage>>> {
    let resp = image_service::get_image(&state, id, image_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/images",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body(content = ImageUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image uploaded", body = ApiResponse<ProductImage>),
        (status = 400, description = "Missing, empty, oversized or unsupported image"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Images"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<ProductImage>>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(err.body_text()))?;
        let resp = image_service::upload_image(&state, &user, id, &file_name, &bytes).await?;
        return Ok((StatusCode::CREATED, Json(resp)));
    }
    Err(AppError::validation("image", "No file was submitted."))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}/images/{image_id}",
    params(
        ("id" = i32, Path, description = "Product ID"),
        ("image_id" = i32, Path, description = "Image ID"),
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Image not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Images"
)]
pub async fn delete_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, image_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    image_service::delete_image(&state, &user, id, image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
