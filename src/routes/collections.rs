use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::collections::{CollectionList, CollectionRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Collection,
    response::ApiResponse,
    routes::params::Pagination,
    services::collection_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_collections).post(create_collection))
        .route(
            "/{id}",
            get(get_collection)
                .put(update_collection)
                .delete(delete_collection),
        )
}

#[utoipa::path(
    get,
    path = "/api/collections",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List collections with product counts", body = ApiResponse<CollectionList>)
    ),
    tag = "Collections"
)]
pub async fn list_collections(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<CollectionList>>> {
    let resp = collection_service::list_collections(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/collections/{id}",
    params(
        ("id" = i32, Path, description = "Collection ID")
    ),
    responses(
        (status = 200, description = "Get collection", body = ApiResponse<Collection>),
        (status = 404, description = "Collection not found"),
    ),
    tag = "Collections"
)]
pub async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Collection>>> {
    let resp = collection_service::get_collection(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/collections",
    request_body = CollectionRequest,
    responses(
        (status = 201, description = "Collection created", body = ApiResponse<Collection>),
        (status = 400, description = "Invalid collection"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn create_collection(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CollectionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Collection>>)> {
    let resp = collection_service::create_collection(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/collections/{id}",
    params(
        ("id" = i32, Path, description = "Collection ID")
    ),
    request_body = CollectionRequest,
    responses(
        (status = 200, description = "Collection updated", body = ApiResponse<Collection>),
        (status = 404, description = "Collection not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn update_collection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<CollectionRequest>,
) -> AppResult<Json<ApiResponse<Collection>>> {
    let resp = collection_service::update_collection(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/collections/{id}",
    params(
        ("id" = i32, Path, description = "Collection ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Collection not found"),
        (status = 409, description = "Collection still has products"),
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn delete_collection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    collection_service::delete_collection(&state, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
