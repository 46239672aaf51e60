use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartItemList, UpdateCartItemRequest},
    error::AppResult,
    models::{Cart, CartItem},
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

// Carts are anonymous: whoever holds the id may use it.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_cart))
        .route("/{cart_id}", get(get_cart).delete(delete_cart))
        .route("/{cart_id}/items", get(list_items).post(add_item))
        .route(
            "/{cart_id}/items/{item_id}",
            get(get_item).patch(update_item).delete(remove_item),
        )
}

#[utoipa::path(
    post,
    path = "/api/carts",
    responses(
        (status = 201, description = "Empty cart created", body = ApiResponse<Cart>)
    ),
    tag = "Carts"
)]
pub async fn create_cart(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<ApiResponse<Cart>>)> {
    let resp = cart_service::create_cart(&state).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/carts/{cart_id}",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID")
    ),
    responses(
        (status = 200, description = "Cart with lines and total", body = ApiResponse<Cart>),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Carts"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::get_cart(&state, cart_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{cart_id}",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Carts"
)]
pub async fn delete_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    cart_service::delete_cart(&state, cart_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/carts/{cart_id}/items",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID")
    ),
    responses(
        (status = 200, description = "Cart lines", body = ApiResponse<CartItemList>),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Carts"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartItemList>>> {
    let resp = cart_service::list_items(&state, cart_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/carts/{cart_id}/items",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID")
    ),
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Line added or quantity increased", body = ApiResponse<CartItem>),
        (status = 400, description = "Invalid product or quantity"),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Carts"
)]
pub async fn add_item(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CartItem>>)> {
    let resp = cart_service::add_to_cart(&state, cart_id, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/carts/{cart_id}/items/{item_id}",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID"),
        ("item_id" = i32, Path, description = "Cart item ID"),
    ),
    responses(
        (status = 200, description = "Cart line", body = ApiResponse<CartItem>),
        (status = 404, description = "Cart item not found"),
    ),
    tag = "Carts"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, i32)>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let resp = cart_service::get_item(&state, cart_id, item_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/carts/{cart_id}/items/{item_id}",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID"),
        ("item_id" = i32, Path, description = "Cart item ID"),
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity replaced", body = ApiResponse<CartItem>),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Cart item not found"),
    ),
    tag = "Carts"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, i32)>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let resp = cart_service::update_item(&state, cart_id, item_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{cart_id}/items/{item_id}",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID"),
        ("item_id" = i32, Path, description = "Cart item ID"),
    ),
    responses(
        (status = 204, description = "Line removed"),
        (status = 404, description = "Cart item not found"),
    ),
    tag = "Carts"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, i32)>,
) -> AppResult<StatusCode> {
    cart_service::remove_item(&state, cart_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
