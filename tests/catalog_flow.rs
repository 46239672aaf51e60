mod common;

use storefront_api::{
    dto::{
        cart::AddToCartRequest,
        collections::CollectionRequest,
        likes::LikeRequest,
        products::{CreateProductRequest, UpdateProductRequest},
        reviews::CreateReviewRequest,
        tags::{AttachTagRequest, CreateTagRequest},
    },
    error::AppError,
    events::EventBus,
    routes::params::{Pagination, ProductQuery},
    services::{
        cart_service, collection_service, like_service, order_service, product_service,
        review_service, tag_service,
    },
};

use common::{admin, create_collection, create_customer, create_product, setup_state, user};

#[tokio::test]
async fn products_report_price_with_tax() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;

    let product = product_service::create_product(
        &state,
        &admin(),
        CreateProductRequest {
            title: "Ferris Mug".into(),
            slug: None,
            description: Some("Coffee tastes better with Ferris".into()),
            unit_price: 1999,
            inventory: 5,
            collection_id: collection,
        },
    )
    .await?
    .data
    .expect("product");

    assert_eq!(product.slug, "ferris-mug");
    assert_eq!(product.price_plus_tax, 2199);
    Ok(())
}

#[tokio::test]
async fn catalog_writes_require_admin() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let err = collection_service::create_collection(
        &state,
        &user(42),
        CollectionRequest {
            title: "Apparel".into(),
            featured_product_id: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn invalid_product_fields_are_rejected() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;
    let product = create_product(&state, collection, "Ferris Mug", 1200).await?;

    let err = product_service::update_product(
        &state,
        &admin(),
        product.id,
        UpdateProductRequest {
            unit_price: Some(0),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "unit_price"));

    let err = product_service::create_product(
        &state,
        &admin(),
        CreateProductRequest {
            title: "Orphan".into(),
            slug: None,
            description: None,
            unit_price: 100,
            inventory: 1,
            collection_id: 404,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "collection_id"));
    Ok(())
}

#[tokio::test]
async fn ordered_product_cannot_be_deleted() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;
    let mug = create_product(&state, collection, "Ferris Mug", 1200).await?;
    create_customer(&state, 42).await?;
    let cart_id = cart_service::create_cart(&state).await?.data.expect("cart").id;
    cart_service::add_to_cart(
        &state,
        cart_id,
        AddToCartRequest {
            product_id: mug.id,
            quantity: 1,
        },
    )
    .await?;
    order_service::place_order(&state, 42, cart_id).await?;

    let err = product_service::delete_product(&state, &admin(), mug.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(product_service::get_product(&state, mug.id).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn deleting_featured_product_clears_collection() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;
    let mug = create_product(&state, collection, "Ferris Mug", 1200).await?;
    collection_service::update_collection(
        &state,
        &admin(),
        collection,
        CollectionRequest {
            title: "Goodies".into(),
            featured_product_id: Some(mug.id),
        },
    )
    .await?;

    product_service::delete_product(&state, &admin(), mug.id).await?;

    let fetched = collection_service::get_collection(&state, collection)
        .await?
        .data
        .expect("collection");
    assert_eq!(fetched.featured_product_id, None);
    assert_eq!(fetched.product_count, 0);
    Ok(())
}

#[tokio::test]
async fn non_empty_collection_cannot_be_deleted() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let goodies = create_collection(&state, "Goodies").await?;
    let empty = create_collection(&state, "Empty").await?;
    create_product(&state, goodies, "Ferris Mug", 1200).await?;

    let err = collection_service::delete_collection(&state, &admin(), goodies)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    collection_service::delete_collection(&state, &admin(), empty).await?;

    let listed = collection_service::list_collections(&state, Pagination::default())
        .await?
        .data
        .expect("collections");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].product_count, 1);
    Ok(())
}

#[tokio::test]
async fn products_filter_by_collection() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let goodies = create_collection(&state, "Goodies").await?;
    let books = create_collection(&state, "Books").await?;
    create_product(&state, goodies, "Ferris Mug", 1200).await?;
    let book = create_product(&state, books, "Async Rust", 2500).await?;

    let resp = product_service::list_products(
        &state,
        ProductQuery {
            collection_id: Some(books),
            ..Default::default()
        },
    )
    .await?;
    let items = resp.data.expect("products").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, book.id);
    assert_eq!(resp.meta.expect("meta").total, Some(1));
    Ok(())
}

#[tokio::test]
async fn reviews_belong_to_their_author() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Books").await?;
    let book = create_product(&state, collection, "Async Rust", 2500).await?;

    let review = review_service::create_review(
        &state,
        &user(42),
        book.id,
        CreateReviewRequest {
            text: "Great read".into(),
        },
    )
    .await?
    .data
    .expect("review");

    let err = review_service::delete_review(&state, &user(43), book.id, review.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    review_service::delete_review(&state, &user(42), book.id, review.id).await?;
    let listed = review_service::list_reviews(&state, book.id, Pagination::default())
        .await?
        .data
        .expect("reviews");
    assert!(listed.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn tags_attach_once_and_detach() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Books").await?;
    let book = create_product(&state, collection, "Async Rust", 2500).await?;
    let tag = tag_service::create_tag(
        &state,
        &admin(),
        CreateTagRequest {
            label: "bestseller".into(),
        },
    )
    .await?
    .data
    .expect("tag");

    for _ in 0..2 {
        tag_service::attach_tag(&state, &admin(), book.id, AttachTagRequest { tag_id: tag.id })
            .await?;
    }
    let tags = tag_service::list_product_tags(&state, book.id)
        .await?
        .data
        .expect("tags");
    assert_eq!(tags.items.len(), 1);
    assert_eq!(tags.items[0].label, "bestseller");

    tag_service::detach_tag(&state, &admin(), book.id, tag.id).await?;
    let err = tag_service::detach_tag(&state, &admin(), book.id, tag.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn likes_are_idempotent_per_user() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;
    let mug = create_product(&state, collection, "Ferris Mug", 1200).await?;

    let first = like_service::like_product(&state, &user(42), LikeRequest { product_id: mug.id })
        .await?
        .data
        .expect("like");
    let second = like_service::like_product(&state, &user(42), LikeRequest { product_id: mug.id })
        .await?
        .data
        .expect("like");
    assert_eq!(first.id, second.id);

    let liked = like_service::list_likes(&state, &user(42), Pagination::default())
        .await?
        .data
        .expect("likes");
    assert_eq!(liked.items.len(), 1);
    assert_eq!(liked.items[0].price_plus_tax, 1320);

    like_service::unlike_product(&state, &user(42), mug.id).await?;
    let err = like_service::unlike_product(&state, &user(42), mug.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn empty_product_update_is_rejected() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;
    let product = create_product(&state, collection, "Ferris Mug", 1200).await?;

    let err = product_service::update_product(
        &state,
        &admin(),
        product.id,
        UpdateProductRequest::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}
