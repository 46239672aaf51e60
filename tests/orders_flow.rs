mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use storefront_api::{
    dto::{cart::AddToCartRequest, orders::UpdateOrderRequest},
    entity::{AuditLogs, CartItems, Carts, Orders, audit_logs, products},
    events::{AuditOrderCreated, EventBus, OrderCreated, OrderCreatedHandler},
    models::PaymentStatus,
    routes::params::OrderListQuery,
    services::{cart_service, order_service, order_service::OrderError},
    state::AppState,
};
use uuid::Uuid;

use common::{admin, create_collection, create_customer, create_product, setup_state, user};

struct FailingHandler;

#[async_trait]
impl OrderCreatedHandler for FailingHandler {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn handle(&self, _event: &OrderCreated) -> anyhow::Result<()> {
        anyhow::bail!("mail server unavailable")
    }
}

struct PanickingHandler;

#[async_trait]
impl OrderCreatedHandler for PanickingHandler {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn handle(&self, _event: &OrderCreated) -> anyhow::Result<()> {
        panic!("handler bug")
    }
}

#[derive(Clone, Default)]
struct RecordingHandler {
    seen: Arc<Mutex<Vec<i32>>>,
}

#[async_trait]
impl OrderCreatedHandler for RecordingHandler {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn handle(&self, event: &OrderCreated) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(event.order.id);
        Ok(())
    }
}

async fn new_cart(state: &AppState) -> anyhow::Result<Uuid> {
    let cart = cart_service::create_cart(state).await?;
    Ok(cart.data.expect("cart").id)
}

async fn add(state: &AppState, cart_id: Uuid, product_id: i32, quantity: i32) -> anyhow::Result<()> {
    cart_service::add_to_cart(
        state,
        cart_id,
        AddToCartRequest {
            product_id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn place_order_moves_cart_lines_into_order() -> anyhow::Result<()> {
    let recorder = RecordingHandler::default();
    let state = setup_state(EventBus::new().subscribe(recorder.clone())).await?;
    let collection = create_collection(&state, "Goodies").await?;
    let mug = create_product(&state, collection, "Ferris Mug", 1200).await?;
    let sticker = create_product(&state, collection, "Sticker", 250).await?;
    let customer = create_customer(&state, 42).await?;

    let cart_id = new_cart(&state).await?;
    add(&state, cart_id, mug.id, 2).await?;
    add(&state, cart_id, sticker.id, 1).await?;

    let order = order_service::place_order(&state, 42, cart_id).await?;

    assert_eq!(order.customer, customer.id);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items.len(), 2);
    let mug_line = order
        .items
        .iter()
        .find(|item| item.product.id == mug.id)
        .expect("mug line");
    assert_eq!(mug_line.quantity, 2);
    assert_eq!(mug_line.unit_price, 1200);

    assert!(Carts::find_by_id(cart_id).one(&state.orm).await?.is_none());
    assert_eq!(CartItems::find().count(&state.orm).await?, 0);
    assert_eq!(*recorder.seen.lock().unwrap(), vec![order.id]);
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_rejected_and_nothing_is_written() -> anyhow::Result<()> {
    let recorder = RecordingHandler::default();
    let state = setup_state(EventBus::new().subscribe(recorder.clone())).await?;
    create_customer(&state, 42).await?;
    let cart_id = new_cart(&state).await?;

    let err = order_service::place_order(&state, 42, cart_id)
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::EmptyCart(id) if id == cart_id));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert!(Carts::find_by_id(cart_id).one(&state.orm).await?.is_some());
    assert!(recorder.seen.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_cart_is_rejected() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    create_customer(&state, 42).await?;
    let missing = Uuid::new_v4();

    let err = order_service::place_order(&state, 42, missing)
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::CartNotFound(id) if id == missing));
    Ok(())
}

#[tokio::test]
async fn cart_cannot_be_ordered_twice() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Books").await?;
    let book = create_product(&state, collection, "Async Rust", 2500).await?;
    create_customer(&state, 42).await?;
    let cart_id = new_cart(&state).await?;
    add(&state, cart_id, book.id, 1).await?;

    order_service::place_order(&state, 42, cart_id).await?;
    let err = order_service::place_order(&state, 42, cart_id)
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::CartNotFound(_)));
    assert_eq!(Orders::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn missing_customer_leaves_cart_intact() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Books").await?;
    let book = create_product(&state, collection, "Async Rust", 2500).await?;
    let cart_id = new_cart(&state).await?;
    add(&state, cart_id, book.id, 3).await?;

    let err = order_service::place_order(&state, 7, cart_id)
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::CustomerNotFound(7)));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(
        CartItems::find()
            .filter(storefront_api::entity::cart_items::Column::CartId.eq(cart_id))
            .count(&state.orm)
            .await?,
        1
    );
    Ok(())
}

#[tokio::test]
async fn failed_line_insert_rolls_back_the_whole_order() -> anyhow::Result<()> {
    let recorder = RecordingHandler::default();
    let state = setup_state(EventBus::new().subscribe(recorder.clone())).await?;
    let collection = create_collection(&state, "Books").await?;
    let book = create_product(&state, collection, "Async Rust", 2500).await?;
    create_customer(&state, 42).await?;
    let cart_id = new_cart(&state).await?;
    add(&state, cart_id, book.id, 2).await?;

    // The order row is written first; its lines then fail to insert.
    state
        .orm
        .execute_unprepared(
            "CREATE TRIGGER reject_order_items BEFORE INSERT ON order_items \
             BEGIN SELECT RAISE(ABORT, 'order lines rejected'); END;",
        )
        .await?;

    let err = order_service::place_order(&state, 42, cart_id)
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::Database(_)));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert!(Carts::find_by_id(cart_id).one(&state.orm).await?.is_some());
    let lines = CartItems::find()
        .filter(storefront_api::entity::cart_items::Column::CartId.eq(cart_id))
        .all(&state.orm)
        .await?;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
    assert!(recorder.seen.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn order_lines_keep_the_price_paid() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Apparel").await?;
    let hoodie = create_product(&state, collection, "Axum Hoodie", 5500).await?;
    create_customer(&state, 42).await?;
    let cart_id = new_cart(&state).await?;
    add(&state, cart_id, hoodie.id, 1).await?;
    let order = order_service::place_order(&state, 42, cart_id).await?;

    let mut active: products::ActiveModel = hoodie.into();
    active.unit_price = Set(9900);
    active.update(&state.orm).await?;

    let fetched = order_service::get_order(&state, &user(42), order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(fetched.items[0].unit_price, 5500);
    Ok(())
}

#[tokio::test]
async fn failing_handlers_do_not_block_later_ones() -> anyhow::Result<()> {
    let recorder = RecordingHandler::default();
    let events = EventBus::new()
        .subscribe(FailingHandler)
        .subscribe(PanickingHandler)
        .subscribe(recorder.clone());
    let state = setup_state(events).await?;
    let collection = create_collection(&state, "Goodies").await?;
    let mug = create_product(&state, collection, "Ferris Mug", 1200).await?;
    create_customer(&state, 42).await?;
    let cart_id = new_cart(&state).await?;
    add(&state, cart_id, mug.id, 1).await?;

    assert_eq!(
        state.events.handler_names(),
        vec!["failing", "panicking", "recording"]
    );

    let order = order_service::place_order(&state, 42, cart_id).await?;

    assert_eq!(*recorder.seen.lock().unwrap(), vec![order.id]);

    let deliveries = state
        .events
        .send_robust(&OrderCreated {
            order: order.clone(),
        })
        .await;
    let outcomes: Vec<(&str, bool)> = deliveries
        .iter()
        .map(|delivery| (delivery.handler, delivery.is_ok()))
        .collect();
    assert_eq!(
        outcomes,
        vec![("failing", false), ("panicking", false), ("recording", true)]
    );
    Ok(())
}

#[tokio::test]
async fn placed_orders_are_audited() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let state = AppState {
        events: EventBus::new().subscribe(AuditOrderCreated::new(state.orm.clone())),
        ..state
    };
    let collection = create_collection(&state, "Goodies").await?;
    let mug = create_product(&state, collection, "Ferris Mug", 1200).await?;
    create_customer(&state, 42).await?;
    let cart_id = new_cart(&state).await?;
    add(&state, cart_id, mug.id, 1).await?;

    let order = order_service::place_order(&state, 42, cart_id).await?;

    let entry = AuditLogs::find()
        .filter(audit_logs::Column::Action.eq("order_created"))
        .one(&state.orm)
        .await?
        .expect("audit entry");
    let metadata = entry.metadata.expect("metadata");
    assert_eq!(metadata["order_id"], order.id);
    assert_eq!(metadata["lines"], 1);
    Ok(())
}

#[tokio::test]
async fn customers_only_see_their_own_orders() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;
    let mug = create_product(&state, collection, "Ferris Mug", 1200).await?;
    create_customer(&state, 42).await?;
    create_customer(&state, 43).await?;

    let first = new_cart(&state).await?;
    add(&state, first, mug.id, 1).await?;
    let mine = order_service::place_order(&state, 42, first).await?;
    let second = new_cart(&state).await?;
    add(&state, second, mug.id, 1).await?;
    let theirs = order_service::place_order(&state, 43, second).await?;

    let listed = order_service::list_orders(&state, &user(42), OrderListQuery::default())
        .await?
        .data
        .expect("orders");
    let ids: Vec<i32> = listed.items.iter().map(|order| order.id).collect();
    assert_eq!(ids, vec![mine.id]);

    let err = order_service::get_order(&state, &user(42), theirs.id)
        .await
        .unwrap_err();
    assert!(matches!(err, storefront_api::error::AppError::NotFound));

    let all = order_service::list_orders(&state, &admin(), OrderListQuery::default())
        .await?
        .data
        .expect("orders");
    assert_eq!(all.items.len(), 2);
    Ok(())
}

#[tokio::test]
async fn only_admins_change_payment_status() -> anyhow::Result<()> {
    let state = setup_state(EventBus::new()).await?;
    let collection = create_collection(&state, "Goodies").await?;
    let mug = create_product(&state, collection, "Ferris Mug", 1200).await?;
    create_customer(&state, 42).await?;
    let cart_id = new_cart(&state).await?;
    add(&state, cart_id, mug.id, 1).await?;
    let order = order_service::place_order(&state, 42, cart_id).await?;

    let err = order_service::update_order(
        &state,
        &user(42),
        order.id,
        UpdateOrderRequest {
            payment_status: PaymentStatus::Completed,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, storefront_api::error::AppError::Forbidden));

    let updated = order_service::update_order(
        &state,
        &admin(),
        order.id,
        UpdateOrderRequest {
            payment_status: PaymentStatus::Completed,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(updated.payment_status, PaymentStatus::Completed);
    Ok(())
}
