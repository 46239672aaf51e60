use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};

use crate::{
    dto::promotions::{AttachPromotionRequest, CreatePromotionRequest, PromotionList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Promotion,
    response::ApiResponse,
    routes::params::Pagination,
    services::promotion_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promotions).post(create_promotion))
        .route("/{id}", delete(delete_promotion))
}

#[utoipa::path(
    get,
    path = "/api/promotions",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "All promotions", body = ApiResponse<PromotionList>)
    ),
    tag = "Promotions"
)]
pub async fn list_promotions(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PromotionList>>> {
    let resp = promotion_service::list_promotions(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/promotions",
    request_body = CreatePromotionRequest,
    responses(
        (status = 201, description = "Promotion created", body = ApiResponse<Promotion>),
        (status = 400, description = "Invalid promotion"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn create_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePromotionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Promotion>>)> {
    let resp = promotion_service::create_promotion(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/promotions/{id}",
    params(
        ("id" = i32, Path, description = "Promotion ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Promotion not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn delete_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    promotion_service::delete_promotion(&state, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/promotions",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Promotions of a product", body = ApiResponse<PromotionList>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Promotions"
)]
pub async fn list_product_promotions(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<PromotionList>>> {
    let resp = promotion_service::list_product_promotions(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/promotions",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body = AttachPromotionRequest,
    responses(
        (status = 200, description = "Promotion attached", body = ApiResponse<Promotion>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn attach_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<AttachPromotionRequest>,
) -> AppResult<Json<ApiResponse<Promotion>>> {
    let resp = promotion_service::attach_promotion(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}/promotions/{promotion_id}",
    params(
        ("id" = i32, Path, description = "Product ID"),
        ("promotion_id" = i32, Path, description = "Promotion ID"),
    ),
    responses(
        (status = 204, description = "Promotion detached"),
        (status = 404, description = "Promotion not attached"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn detach_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, promotion_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    promotion_service::detach_promotion(&state, &user, id, promotion_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
