use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, PlaceOrderRequest, UpdateOrderRequest},
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        carts::Entity as Carts,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    events::OrderCreated,
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{cart_service, customer_service, product_service::simple_product},
    state::AppState,
};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("No cart with given cart id.")]
    CartNotFound(Uuid),

    #[error("Cart is empty.")]
    EmptyCart(Uuid),

    #[error("No customer profile for user {0}.")]
    CustomerNotFound(i64),

    #[error("Database error")]
    Database(#[from] DbErr),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::CartNotFound(_) | OrderError::CustomerNotFound(_) => AppError::NotFound,
            OrderError::EmptyCart(_) => AppError::validation("cart_id", "Cart is empty."),
            OrderError::Database(err) => AppError::from(err),
        }
    }
}

/// Convert a non-empty cart into an order owned by `user_id`'s customer.
///
/// Order, order lines and the cart deletion commit together or not at all.
/// Line prices are copied from the products at this instant. Subscribers of
/// [`OrderCreated`] run after commit and cannot fail the call.
pub async fn place_order(
    state: &AppState,
    user_id: i64,
    cart_id: Uuid,
) -> Result<Order, OrderError> {
    if Carts::find_by_id(cart_id).one(&state.orm).await?.is_none() {
        return Err(OrderError::CartNotFound(cart_id));
    }
    let line_count = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .count(&state.orm)
        .await?;
    if line_count == 0 {
        return Err(OrderError::EmptyCart(cart_id));
    }
    let customer = customer_service::find_by_user(&state.orm, user_id)
        .await?
        .ok_or(OrderError::CustomerNotFound(user_id))?;

    let txn = state.orm.begin().await?;

    let order = OrderActive {
        id: NotSet,
        placed_at: Set(Utc::now().into()),
        payment_status: Set(PaymentStatus::Pending),
        customer_id: Set(customer.id),
    }
    .insert(&txn)
    .await?;

    let lines = cart_service::load_lines(&txn, cart_id).await?;
    if lines.is_empty() {
        // Emptied between the precondition check and the transaction.
        return Err(OrderError::EmptyCart(cart_id));
    }

    let rows: Vec<OrderItemActive> = lines
        .iter()
        .map(|(item, product)| OrderItemActive {
            id: NotSet,
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price: Set(product.unit_price),
        })
        .collect();
    OrderItems::insert_many(rows).exec(&txn).await?;

    // Cart lines go with the cart through the cascading foreign key.
    let deleted = Carts::delete_by_id(cart_id).exec(&txn).await?;
    if deleted.rows_affected == 0 {
        return Err(OrderError::CartNotFound(cart_id));
    }

    let mut items = load_items(&txn, vec![order.id]).await?;
    txn.commit().await?;

    let order_items = items.remove(&order.id).unwrap_or_default();
    let placed = order_from_entity(order, order_items);
    tracing::info!(
        order_id = placed.id,
        customer_id = placed.customer,
        lines = placed.items.len(),
        %cart_id,
        "order placed"
    );

    state
        .events
        .send_robust(&OrderCreated {
            order: placed.clone(),
        })
        .await;

    Ok(placed)
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let order = place_order(state, user.user_id, payload.cart_id).await?;
    Ok(ApiResponse::success(
        "Order placed",
        order,
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Orders::find();
    if !user.is_admin() {
        let Some(customer) = customer_service::find_by_user(&state.orm, user.user_id).await? else {
            return Ok(ApiResponse::success(
                "Ok",
                OrderList { items: Vec::new() },
                Some(Meta::new(page, limit, 0)),
            ));
        };
        finder = finder.filter(OrderCol::CustomerId.eq(customer.id));
    }

    finder = match query.sort_order.unwrap_or_default() {
        SortOrder::Asc => finder.order_by_asc(OrderCol::PlacedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::PlacedAt),
    }
    .order_by_asc(OrderCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = load_orders(&state.orm, models, query.include_items.unwrap_or(true)).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<Order>> {
    let order = find_visible_order(state, user, id).await?;
    let mut orders = load_orders(&state.orm, vec![order], true).await?;
    let order = orders.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: OrderActive = existing.into();
    active.payment_status = Set(payload.payment_status);
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_payment_status",
        "orders",
        serde_json::json!({ "order_id": order.id, "payment_status": payload.payment_status }),
    )
    .await;

    let mut orders = load_orders(&state.orm, vec![order], true).await?;
    let order = orders.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Payment status updated",
        order,
        Some(Meta::empty()),
    ))
}

pub async fn delete_order(state: &AppState, user: &AuthUser, id: i32) -> AppResult<()> {
    ensure_admin(user)?;
    let result = Orders::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(())
}

/// Orders other than the caller's own are reported as missing to non-admins.
async fn find_visible_order(state: &AppState, user: &AuthUser, id: i32) -> AppResult<OrderModel> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if user.is_admin() {
        return Ok(order);
    }
    let customer = customer_service::find_by_user(&state.orm, user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.customer_id != customer.id {
        return Err(AppError::NotFound);
    }
    Ok(order)
}

/// Turn order rows into API orders. With `with_items` the lines of every
/// order are fetched in a single query; without it `items` stays empty.
pub async fn load_orders<C: ConnectionTrait>(
    conn: &C,
    models: Vec<OrderModel>,
    with_items: bool,
) -> Result<Vec<Order>, DbErr> {
    let mut items = if with_items {
        load_items(conn, models.iter().map(|o| o.id).collect()).await?
    } else {
        HashMap::new()
    };
    Ok(models
        .into_iter()
        .map(|model| {
            let lines = items.remove(&model.id).unwrap_or_default();
            order_from_entity(model, lines)
        })
        .collect())
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    order_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<OrderItem>>, DbErr> {
    let mut grouped: HashMap<i32, Vec<OrderItem>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::Id)
        .find_also_related(Products)
        .all(conn)
        .await?;

    for (item, product) in rows {
        let product = product.ok_or_else(|| {
            DbErr::RecordNotFound(format!(
                "product {} of order item {}",
                item.product_id, item.id
            ))
        })?;
        grouped.entry(item.order_id).or_default().push(OrderItem {
            id: item.id,
            product: simple_product(&product),
            quantity: item.quantity,
            unit_price: item.unit_price,
        });
    }
    Ok(grouped)
}

fn order_from_entity(model: OrderModel, items: Vec<OrderItem>) -> Order {
    Order {
        id: model.id,
        placed_at: model.placed_at.with_timezone(&Utc),
        payment_status: model.payment_status,
        customer: model.customer_id,
        items,
    }
}
