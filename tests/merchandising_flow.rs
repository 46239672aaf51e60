mod common;

use std::path::PathBuf;

use storefront_api::{
    dto::{
        addresses::AddressRequest,
        promotions::{AttachPromotionRequest, CreatePromotionRequest},
    },
    error::AppError,
    events::EventBus,
    routes::params::Pagination,
    services::{address_service, image_service, product_service, promotion_service},
    state::AppState,
};

use common::{admin, create_collection, create_product, setup_state, user};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-a-picture";

fn stored_path(state: &AppState, url: &str) -> PathBuf {
    let relative = url.trim_start_matches("/media/");
    image_service::media_path(&state.config.media_dir, relative)
}

#[tokio::test]
async fn images_are_stored_listed_and_removed() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Posters").await?;
    let poster = create_product(&state, collection, "Sunset", 1500).await?;

    let image = image_service::upload_image(&state, &admin(), poster.id, "sunset.PNG", PNG_BYTES)
        .await?
        .data
        .expect("image");
    assert!(image.image.starts_with("/media/store/images/"));
    assert!(image.image.ends_with(".png"));
    let path = stored_path(&state, &image.image);
    assert_eq!(tokio::fs::read(&path).await?, PNG_BYTES);

    let listed = image_service::list_images(&state, poster.id)
        .await?
        .data
        .expect("images");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].id, image.id);

    image_service::delete_image(&state, &admin(), poster.id, image.id).await?;
    assert!(!path.exists());
    let err = image_service::get_image(&state, poster.id, image.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn oversized_or_foreign_uploads_are_rejected() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Posters").await?;
    let poster = create_product(&state, collection, "Sunset", 1500).await?;

    let too_big = vec![0u8; state.config.max_image_bytes + 1];
    let err = image_service::upload_image(&state, &admin(), poster.id, "big.jpg", &too_big)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation { ref field, ref message }
            if field == "image" && message.starts_with("Image too big")
    ));

    let err = image_service::upload_image(&state, &user(7), poster.id, "ok.jpg", PNG_BYTES)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = image_service::upload_image(&state, &admin(), 9_999, "ok.jpg", PNG_BYTES)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let listed = image_service::list_images(&state, poster.id)
        .await?
        .data
        .expect("images");
    assert!(listed.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn deleting_a_product_removes_its_image_files() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Posters").await?;
    let poster = create_product(&state, collection, "Sunset", 1500).await?;
    let image = image_service::upload_image(&state, &admin(), poster.id, "a.webp", PNG_BYTES)
        .await?
        .data
        .expect("image");
    let path = stored_path(&state, &image.image);
    assert!(path.exists());

    product_service::delete_product(&state, &admin(), poster.id).await?;
    assert!(!path.exists());
    Ok(())
}

#[tokio::test]
async fn promotions_attach_once_and_detach() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Shoes").await?;
    let boots = create_product(&state, collection, "Boots", 9000).await?;

    for discount in [0.0, -5.0, 150.0, f64::NAN] {
        let err = promotion_service::create_promotion(
            &state,
            &admin(),
            CreatePromotionRequest {
                description: "Nope".into(),
                discount,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "discount"));
    }

    let promo = promotion_service::create_promotion(
        &state,
        &admin(),
        CreatePromotionRequest {
            description: "Winter sale".into(),
            discount: 15.5,
        },
    )
    .await?
    .data
    .expect("promotion");

    for _ in 0..2 {
        promotion_service::attach_promotion(
            &state,
            &admin(),
            boots.id,
            AttachPromotionRequest {
                promotion_id: promo.id,
            },
        )
        .await?;
    }
    let attached = promotion_service::list_product_promotions(&state, boots.id)
        .await?
        .data
        .expect("promotions");
    assert_eq!(attached.items.len(), 1);
    assert_eq!(attached.items[0].discount, 15.5);

    let err = promotion_service::attach_promotion(
        &state,
        &admin(),
        boots.id,
        AttachPromotionRequest { promotion_id: 404 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "promotion_id"));

    promotion_service::detach_promotion(&state, &admin(), boots.id, promo.id).await?;
    let err = promotion_service::detach_promotion(&state, &admin(), boots.id, promo.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn deleting_a_promotion_drops_its_links() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Shoes").await?;
    let boots = create_product(&state, collection, "Boots", 9000).await?;
    let promo = promotion_service::create_promotion(
        &state,
        &admin(),
        CreatePromotionRequest {
            description: "Clearance".into(),
            discount: 50.0,
        },
    )
    .await?
    .data
    .expect("promotion");
    promotion_service::attach_promotion(
        &state,
        &admin(),
        boots.id,
        AttachPromotionRequest {
            promotion_id: promo.id,
        },
    )
    .await?;

    let err = promotion_service::delete_promotion(&state, &user(3), promo.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    promotion_service::delete_promotion(&state, &admin(), promo.id).await?;
    let attached = promotion_service::list_product_promotions(&state, boots.id)
        .await?
        .data
        .expect("promotions");
    assert!(attached.items.is_empty());
    let all = promotion_service::list_promotions(&state, Pagination::default())
        .await?
        .meta
        .expect("meta");
    assert_eq!(all.total, Some(0));
    Ok(())
}

#[tokio::test]
async fn addresses_are_scoped_to_their_owner() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let alice = user(21);
    let bob = user(22);

    let home = address_service::add_address(
        &state,
        &alice,
        AddressRequest {
            street: " 1 Main St ".into(),
            city: "Springfield".into(),
        },
    )
    .await?
    .data
    .expect("address");
    assert_eq!(home.street, "1 Main St");

    let err = address_service::add_address(
        &state,
        &alice,
        AddressRequest {
            street: "   ".into(),
            city: "Springfield".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "street"));

    let bobs = address_service::list_addresses(&state, &bob)
        .await?
        .data
        .expect("addresses");
    assert!(bobs.items.is_empty());

    let err = address_service::delete_address(&state, &bob, home.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let moved = address_service::update_address(
        &state,
        &alice,
        home.id,
        AddressRequest {
            street: "2 Elm St".into(),
            city: "Shelbyville".into(),
        },
    )
    .await?
    .data
    .expect("address");
    assert_eq!(moved.city, "Shelbyville");

    address_service::delete_address(&state, &alice, home.id).await?;
    let alices = address_service::list_addresses(&state, &alice)
        .await?
        .data
        .expect("addresses");
    assert!(alices.items.is_empty());
    Ok(())
}
