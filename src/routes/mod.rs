use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use tower_http::services::ServeDir;

use crate::{
    error::ErrorData,
    response::ApiResponse,
    state::AppState,
};

pub mod carts;
pub mod collections;
pub mod customers;
pub mod doc;
pub mod health;
pub mod images;
pub mod likes;
pub mod orders;
pub mod params;
pub mod products;
pub mod promotions;
pub mod tags;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/collections", collections::router())
        .nest("/products", products::router())
        .nest("/tags", tags::router())
        .nest("/promotions", promotions::router())
        .nest("/likes", likes::router())
        .nest("/carts", carts::router())
        .nest("/orders", orders::router())
        .nest("/customers", customers::router())
}

/// Full application router with state bound; middleware layers are added by the caller.
pub fn create_router(state: AppState) -> Router {
    let media = ServeDir::new(&state.config.media_dir);
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .nest_service("/media", media)
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<ErrorData>>) {
    let body = ApiResponse::failure(
        "Not Found",
        ErrorData::new(format!("no route for {}", uri.path())),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
