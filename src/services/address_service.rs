use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::{
    dto::addresses::{AddressList, AddressRequest},
    entity::addresses::{ActiveModel, Column, Entity as Addresses, Model as AddressModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    services::{customer_service::ensure_customer, require_text},
    state::AppState,
};

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let customer = ensure_customer(&state.orm, user.user_id).await?;
    let items: Vec<Address> = Addresses::find()
        .filter(Column::CustomerId.eq(customer.id))
        .order_by_asc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(address_from_entity)
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Addresses",
        AddressList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn add_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let street = require_text("street", &payload.street, 255)?;
    let city = require_text("city", &payload.city, 255)?;
    let customer = ensure_customer(&state.orm, user.user_id).await?;

    let address = ActiveModel {
        id: NotSet,
        street: Set(street),
        city: Set(city),
        customer_id: Set(customer.id),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Address added",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    address_id: i32,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let street = require_text("street", &payload.street, 255)?;
    let city = require_text("city", &payload.city, 255)?;
    let existing = find_own(state, user, address_id).await?;

    let mut active: ActiveModel = existing.into();
    active.street = Set(street);
    active.city = Set(city);
    let address = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn delete_address(state: &AppState, user: &AuthUser, address_id: i32) -> AppResult<()> {
    let address = find_own(state, user, address_id).await?;
    Addresses::delete_by_id(address.id).exec(&state.orm).await?;
    Ok(())
}

/// Another customer's address is reported as missing.
async fn find_own(state: &AppState, user: &AuthUser, address_id: i32) -> AppResult<AddressModel> {
    let customer = ensure_customer(&state.orm, user.user_id).await?;
    Addresses::find_by_id(address_id)
        .filter(Column::CustomerId.eq(customer.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn address_from_entity(model: AddressModel) -> Address {
    Address {
        id: model.id,
        street: model.street,
        city: model.city,
        customer_id: model.customer_id,
    }
}
