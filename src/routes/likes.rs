use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};

use crate::{
    dto::likes::{LikeRequest, LikedProductList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Like,
    response::ApiResponse,
    routes::params::Pagination,
    services::like_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_likes).post(like_product))
        .route("/{product_id}", delete(unlike_product))
}

#[utoipa::path(
    get,
    path = "/api/likes",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Products liked by the caller", body = ApiResponse<LikedProductList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Likes"
)]
pub async fn list_likes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<LikedProductList>>> {
    let resp = like_service::list_likes(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/likes",
    request_body = LikeRequest,
    responses(
        (status = 201, description = "Product liked", body = ApiResponse<Like>),
        (status = 400, description = "Unknown product"),
    ),
    security(("bearer_auth" = [])),
    tag = "Likes"
)]
pub async fn like_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<LikeRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Like>>)> {
    let resp = like_service::like_product(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/likes/{product_id}",
    params(
        ("product_id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Like removed"),
        (status = 404, description = "Product was not liked"),
    ),
    security(("bearer_auth" = [])),
    tag = "Likes"
)]
pub async fn unlike_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<i32>,
) -> AppResult<StatusCode> {
    like_service::unlike_product(&state, &user, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
