mod common;

use storefront_api::{
    dto::customers::{UpdateCustomerRequest, UpdateProfileRequest},
    error::AppError,
    events::EventBus,
    models::Membership,
    routes::params::Pagination,
    services::customer_service,
};

use common::{admin, setup_state, user};

#[tokio::test]
async fn me_provisions_a_bronze_profile_once() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;

    let first = customer_service::me(&state, &user(42)).await?.data.expect("customer");
    let again = customer_service::me(&state, &user(42)).await?.data.expect("customer");

    assert_eq!(first.id, again.id);
    assert_eq!(first.user_id, 42);
    assert_eq!(first.membership, Membership::Bronze);
    Ok(())
}

#[tokio::test]
async fn profile_updates_keep_unset_fields() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    customer_service::update_me(
        &state,
        &user(42),
        UpdateProfileRequest {
            phone: Some(" 555-0199 ".into()),
            birth_date: None,
        },
    )
    .await?;

    let customer = customer_service::me(&state, &user(42)).await?.data.expect("customer");
    assert_eq!(customer.phone, "555-0199");
    assert_eq!(customer.birth_date, None);
    Ok(())
}

#[tokio::test]
async fn membership_is_managed_by_admins() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let customer = customer_service::me(&state, &user(42)).await?.data.expect("customer");

    let err = customer_service::list_customers(&state, &user(42), Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let updated = customer_service::update_customer(
        &state,
        &admin(),
        customer.id,
        UpdateCustomerRequest {
            membership: Some(Membership::Gold),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("customer");
    assert_eq!(updated.membership, Membership::Gold);

    let listed = customer_service::list_customers(&state, &admin(), Pagination::default())
        .await?
        .data
        .expect("customers");
    assert_eq!(listed.items.len(), 1);
    Ok(())
}
