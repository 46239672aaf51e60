use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use sea_orm::sea_query::{Expr, OnConflict};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartItemList, UpdateCartItemRequest},
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{ActiveModel as CartActive, Entity as Carts, Model as CartModel},
        products::{Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::{Cart, CartItem},
    response::{ApiResponse, Meta},
    services::product_service::simple_product,
    state::AppState,
};

/// Largest quantity a single cart line may hold.
pub const MAX_QUANTITY: i32 = 32_767;

pub async fn create_cart(state: &AppState) -> AppResult<ApiResponse<Cart>> {
    let cart = CartActive {
        id: Set(Uuid::new_v4()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(cart_id = %cart.id, "cart created");

    Ok(ApiResponse::success(
        "Cart created",
        cart_from_entities(cart, Vec::new()),
        Some(Meta::empty()),
    ))
}

pub async fn get_cart(state: &AppState, cart_id: Uuid) -> AppResult<ApiResponse<Cart>> {
    let cart = find_cart(state, cart_id).await?;
    let lines = load_lines(&state.orm, cart_id).await?;
    Ok(ApiResponse::success(
        "OK",
        cart_from_entities(cart, lines),
        Some(Meta::empty()),
    ))
}

pub async fn delete_cart(state: &AppState, cart_id: Uuid) -> AppResult<()> {
    let result = Carts::delete_by_id(cart_id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn list_items(state: &AppState, cart_id: Uuid) -> AppResult<ApiResponse<CartItemList>> {
    find_cart(state, cart_id).await?;
    let items: Vec<CartItem> = load_lines(&state.orm, cart_id)
        .await?
        .into_iter()
        .map(|(item, product)| cart_item_from_entity(item, &product))
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "OK",
        CartItemList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_item(
    state: &AppState,
    cart_id: Uuid,
    item_id: i32,
) -> AppResult<ApiResponse<CartItem>> {
    let (item, product) = find_line(&state.orm, cart_id, item_id).await?;
    Ok(ApiResponse::success(
        "OK",
        cart_item_from_entity(item, &product),
        None,
    ))
}

pub async fn add_to_cart(
    state: &AppState,
    cart_id: Uuid,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    validate_quantity(payload.quantity)?;
    find_cart(state, cart_id).await?;
    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            AppError::validation("product_id", "No product with the given ID was found.")
        })?;

    let item = upsert_cart_item(&state.orm, cart_id, product.id, payload.quantity).await?;

    tracing::debug!(
        %cart_id,
        product_id = product.id,
        quantity = item.quantity,
        "cart item upserted"
    );

    Ok(ApiResponse::success(
        "OK",
        cart_item_from_entity(item, &product),
        None,
    ))
}

/// Add `quantity` of a product to a cart, merging with an existing line for
/// the same product in a single `INSERT .. ON CONFLICT` statement. The merged
/// quantity may not exceed [`MAX_QUANTITY`].
pub async fn upsert_cart_item<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    product_id: i32,
    quantity: i32,
) -> AppResult<CartItemModel> {
    validate_quantity(quantity)?;
    let current = find_line_for_product(conn, cart_id, product_id)
        .await?
        .map_or(0, |item| item.quantity);
    if current + quantity > MAX_QUANTITY {
        return Err(AppError::validation(
            "quantity",
            format!("cart line may hold at most {MAX_QUANTITY} units, it already has {current}"),
        ));
    }

    CartItems::insert(CartItemActive {
        id: NotSet,
        cart_id: Set(cart_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
    })
    .on_conflict(
        OnConflict::columns([CartItemCol::CartId, CartItemCol::ProductId])
            .value(
                CartItemCol::Quantity,
                Expr::col(CartItemCol::Quantity).add(quantity),
            )
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    find_line_for_product(conn, cart_id, product_id)
        .await?
        .ok_or_else(|| {
            AppError::from(DbErr::RecordNotFound(format!(
                "cart item for product {product_id} in cart {cart_id}"
            )))
        })
}

async fn find_line_for_product<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    product_id: i32,
) -> Result<Option<CartItemModel>, DbErr> {
    CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .filter(CartItemCol::ProductId.eq(product_id))
        .one(conn)
        .await
}

pub async fn update_item(
    state: &AppState,
    cart_id: Uuid,
    item_id: i32,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    validate_quantity(payload.quantity)?;
    let (item, product) = find_line(&state.orm, cart_id, item_id).await?;

    let mut active: CartItemActive = item.into();
    active.quantity = Set(payload.quantity);
    let item = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        cart_item_from_entity(item, &product),
        None,
    ))
}

pub async fn remove_item(state: &AppState, cart_id: Uuid, item_id: i32) -> AppResult<()> {
    let result = CartItems::delete_many()
        .filter(CartItemCol::Id.eq(item_id))
        .filter(CartItemCol::CartId.eq(cart_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(AppError::validation(
            "quantity",
            format!("quantity must be between 1 and {MAX_QUANTITY}"),
        ));
    }
    Ok(())
}

async fn find_cart(state: &AppState, cart_id: Uuid) -> AppResult<CartModel> {
    Carts::find_by_id(cart_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

async fn find_line<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    item_id: i32,
) -> AppResult<(CartItemModel, ProductModel)> {
    let row = CartItems::find_by_id(item_id)
        .filter(CartItemCol::CartId.eq(cart_id))
        .find_also_related(Products)
        .one(conn)
        .await?;
    match row {
        Some((item, Some(product))) => Ok((item, product)),
        _ => Err(AppError::NotFound),
    }
}

/// Cart lines with their products, loaded in one joined query.
pub(crate) async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> Result<Vec<(CartItemModel, ProductModel)>, DbErr> {
    let rows = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .order_by_asc(CartItemCol::Id)
        .find_also_related(Products)
        .all(conn)
        .await?;

    rows.into_iter()
        .map(|(item, product)| match product {
            Some(product) => Ok((item, product)),
            None => Err(DbErr::RecordNotFound(format!(
                "product {} of cart item {}",
                item.product_id, item.id
            ))),
        })
        .collect()
}

fn cart_item_from_entity(item: CartItemModel, product: &ProductModel) -> CartItem {
    CartItem {
        id: item.id,
        product: simple_product(product),
        quantity: item.quantity,
        total_price: product.unit_price * i64::from(item.quantity),
    }
}

fn cart_from_entities(cart: CartModel, lines: Vec<(CartItemModel, ProductModel)>) -> Cart {
    let items: Vec<CartItem> = lines
        .into_iter()
        .map(|(item, product)| cart_item_from_entity(item, &product))
        .collect();
    let total_price = items.iter().map(|item| item.total_price).sum();
    Cart {
        id: cart.id,
        created_at: cart.created_at.with_timezone(&Utc),
        items,
        total_price,
    }
}
