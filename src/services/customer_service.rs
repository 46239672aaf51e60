use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};

use crate::{
    audit,
    dto::customers::{CustomerList, UpdateCustomerRequest, UpdateProfileRequest},
    entity::customers::{ActiveModel, Column, Entity as Customers, Model as CustomerModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Customer, Membership},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::require_text,
    state::AppState,
};

pub async fn find_by_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<Option<CustomerModel>, DbErr> {
    Customers::find()
        .filter(Column::UserId.eq(user_id))
        .one(conn)
        .await
}

/// Fetch the profile linked to `user_id`, creating a Bronze one on first use.
pub async fn ensure_customer<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<CustomerModel, DbErr> {
    if let Some(customer) = find_by_user(conn, user_id).await? {
        return Ok(customer);
    }

    let inserted = ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        phone: Set(String::new()),
        birth_date: Set(None),
        membership: Set(Membership::Bronze),
    }
    .insert(conn)
    .await;

    match inserted {
        Ok(customer) => {
            tracing::info!(user_id, customer_id = customer.id, "customer profile created");
            Ok(customer)
        }
        // A concurrent request provisioned the same user first.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_by_user(conn, user_id)
                .await?
                .ok_or_else(|| DbErr::RecordNotFound(format!("customer for user {user_id}")))
        }
        Err(err) => Err(err),
    }
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Customer>> {
    let customer = ensure_customer(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success(
        "Customer",
        customer_from_entity(customer),
        Some(Meta::empty()),
    ))
}

pub async fn update_me(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<Customer>> {
    let customer = ensure_customer(&state.orm, user.user_id).await?;
    let mut active: ActiveModel = customer.into();
    if let Some(phone) = payload.phone {
        active.phone = Set(require_text("phone", &phone, 255)?);
    }
    if let Some(birth_date) = payload.birth_date {
        active.birth_date = Set(Some(birth_date));
    }
    let customer = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        customer_from_entity(customer),
        Some(Meta::empty()),
    ))
}

pub async fn list_customers(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CustomerList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();
    let finder = Customers::find().order_by_asc(Column::Id);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(customer_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Customers", CustomerList { items }, Some(meta)))
}

pub async fn get_customer(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<Customer>> {
    ensure_admin(user)?;
    let customer = Customers::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Customer",
        customer_from_entity(customer),
        Some(Meta::empty()),
    ))
}

pub async fn update_customer(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateCustomerRequest,
) -> AppResult<ApiResponse<Customer>> {
    ensure_admin(user)?;
    let existing = Customers::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(phone) = payload.phone {
        active.phone = Set(require_text("phone", &phone, 255)?);
    }
    if let Some(birth_date) = payload.birth_date {
        active.birth_date = Set(Some(birth_date));
    }
    if let Some(membership) = payload.membership {
        active.membership = Set(membership);
    }
    let customer = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "customer_update",
        "customers",
        serde_json::json!({ "customer_id": customer.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        customer_from_entity(customer),
        Some(Meta::empty()),
    ))
}

fn customer_from_entity(model: CustomerModel) -> Customer {
    Customer {
        id: model.id,
        user_id: model.user_id,
        phone: model.phone,
        birth_date: model.birth_date,
        membership: model.membership,
    }
}
