use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::tags::{CreateTagRequest, TagList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Tag,
    response::ApiResponse,
    routes::params::Pagination,
    services::tag_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_tags).post(create_tag))
}

#[utoipa::path(
    get,
    path = "/api/tags",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "All tags", body = ApiResponse<TagList>)
    ),
    tag = "Tags"
)]
pub async fn list_tags(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<TagList>>> {
    let resp = tag_service::list_tags(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/tags",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created", body = ApiResponse<Tag>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tags"
)]
pub async fn create_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTagRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Tag>>)> {
    let resp = tag_service::create_tag(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
