mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use storefront_api::{
    events::EventBus,
    middleware::auth::{ADMIN_ROLE, Claims},
    routes::create_router,
};
use tower::ServiceExt;

use common::{JWT_SECRET, create_collection, create_customer, create_product, setup_state};

fn token(user_id: i64, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {bearer}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_database() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let app = create_router(state);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Health check");
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_404() -> anyhow::Result<()> {
    let app = create_router(setup_state(EventBus::new()).await?);
    let (status, body) = send(&app, "GET", "/api/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    Ok(())
}

#[tokio::test]
async fn catalog_is_public() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;
    create_product(&state, collection, "Ferris Mug", 1000).await?;
    let app = create_router(state);

    let (status, body) = send(&app, "GET", "/api/products?page=1&per_page=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["price_plus_tax"], 1100);
    assert_eq!(body["meta"]["per_page"], 5);
    Ok(())
}

#[tokio::test]
async fn far_pages_are_empty_not_errors() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;
    create_product(&state, collection, "Ferris Mug", 1000).await?;
    let app = create_router(state);

    let (status, body) = send(
        &app,
        "GET",
        "/api/products?page=9223372036854775807",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["meta"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn placing_an_order_requires_a_token() -> anyhow::Result<()> {
    let app = create_router(setup_state(EventBus::new()).await?);
    let payload = json!({ "cart_id": uuid::Uuid::new_v4() });

    let (status, _) = send(&app, "POST", "/api/orders", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/orders", Some("not-a-jwt"), Some(payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn checkout_over_http() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;
    let mug = create_product(&state, collection, "Ferris Mug", 1200).await?;
    create_customer(&state, 42).await?;
    let app = create_router(state);
    let customer_token = token(42, "user");

    let (status, body) = send(&app, "POST", "/api/carts", None, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let cart_id = body["data"]["id"].as_str().expect("cart id").to_string();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/carts/{cart_id}/items"),
        None,
        Some(json!({ "product_id": mug.id, "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(&customer_token),
        Some(json!({ "cart_id": cart_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["payment_status"], "pending");
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));
    let order_id = body["data"]["id"].as_i64().expect("order id");

    let (status, _) = send(&app, "GET", &format!("/api/carts/{cart_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/orders/{order_id}"),
        Some(&customer_token),
        Some(json!({ "payment_status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/orders/{order_id}"),
        Some(&token(1, ADMIN_ROLE)),
        Some(json!({ "payment_status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_status"], "completed");
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_a_field_error() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    create_customer(&state, 42).await?;
    let app = create_router(state);

    let (_, body) = send(&app, "POST", "/api/carts", None, None).await;
    let cart_id = body["data"]["id"].as_str().expect("cart id").to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(&token(42, "user")),
        Some(json!({ "cart_id": cart_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["field"], "cart_id");
    Ok(())
}

#[tokio::test]
async fn deleting_a_cart_returns_no_content() -> anyhow::Result<()> {
    let app = create_router(setup_state(EventBus::new()).await?);
    let (_, body) = send(&app, "POST", "/api/carts", None, None).await;
    let cart_id = body["data"]["id"].as_str().expect("cart id").to_string();

    let (status, _) = send(&app, "DELETE", &format!("/api/carts/{cart_id}"), None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/api/carts/{cart_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

fn multipart_request(uri: &str, bearer: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "storefront-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn product_images_upload_and_serve_over_http() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Posters").await?;
    let poster = create_product(&state, collection, "Sunset", 1500).await?;
    let max_image_bytes = state.config.max_image_bytes;
    let app = create_router(state);
    let admin = token(1, ADMIN_ROLE);
    let uri = format!("/api/products/{}/images", poster.id);

    let response = app
        .clone()
        .oneshot(multipart_request(&uri, &admin, "sunset.png", b"fake png bytes"))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await?)?;
    let url = body["data"]["image"].as_str().expect("url").to_string();
    assert!(url.starts_with("/media/store/images/"));

    let served = app
        .clone()
        .oneshot(Request::builder().uri(&url).body(Body::empty())?)
        .await?;
    assert_eq!(served.status(), StatusCode::OK);
    let served = to_bytes(served.into_body(), usize::MAX).await?;
    assert_eq!(&served[..], b"fake png bytes");

    let too_big = vec![b'x'; max_image_bytes + 1];
    let response = app
        .clone()
        .oneshot(multipart_request(&uri, &admin, "huge.png", &too_big))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await?)?;
    assert_eq!(body["data"]["field"], "image");

    let (status, body) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn addresses_require_a_token() -> anyhow::Result<()> {
    let app = create_router(setup_state(EventBus::new()).await?);
    let body = json!({ "street": "1 Main St", "city": "Springfield" });

    let (status, _) = send(&app, "POST", "/api/customers/me/addresses", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bearer = token(40, "user");
    let (status, created) = send(
        &app,
        "POST",
        "/api/customers/me/addresses",
        Some(&bearer),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["city"], "Springfield");
    Ok(())
}
