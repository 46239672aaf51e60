//! In-process domain events.
//!
//! Handlers run after the originating transaction has committed. Delivery is
//! robust: every handler is invoked even when an earlier one fails or panics,
//! and no handler outcome ever reaches the code that published the event.

use std::{panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt;
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::{audit::log_audit, models::Order};

#[derive(Debug, Clone, Serialize)]
pub struct OrderCreated {
    pub order: Order,
}

#[async_trait]
pub trait OrderCreatedHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &OrderCreated) -> anyhow::Result<()>;
}

/// Outcome of delivering one event to one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub handler: &'static str,
    pub error: Option<String>,
}

impl Delivery {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Vec<Arc<dyn OrderCreatedHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(mut self, handler: impl OrderCreatedHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Names of the subscribed handlers, in delivery order.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }

    /// Deliver `event` to every handler in subscription order.
    pub async fn send_robust(&self, event: &OrderCreated) -> Vec<Delivery> {
        let mut deliveries = Vec::with_capacity(self.handlers.len());
        for handler in &self.handlers {
            let name = handler.name();
            let outcome = AssertUnwindSafe(handler.handle(event)).catch_unwind().await;
            let error = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(panic) => Some(panic_message(panic.as_ref())),
            };
            if let Some(error) = &error {
                tracing::warn!(
                    handler = name,
                    order_id = event.order.id,
                    error = %error,
                    "order_created handler failed"
                );
            }
            deliveries.push(Delivery {
                handler: name,
                error,
            });
        }
        deliveries
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("handler panicked: {msg}")
    } else {
        "handler panicked".to_string()
    }
}

/// Records every placed order in the audit trail.
pub struct AuditOrderCreated {
    conn: DatabaseConnection,
}

impl AuditOrderCreated {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl OrderCreatedHandler for AuditOrderCreated {
    fn name(&self) -> &'static str {
        "audit_order_created"
    }

    async fn handle(&self, event: &OrderCreated) -> anyhow::Result<()> {
        log_audit(
            &self.conn,
            None,
            "order_created",
            Some("orders"),
            Some(serde_json::json!({
                "order_id": event.order.id,
                "customer_id": event.order.customer,
                "lines": event.order.items.len(),
            })),
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.to_string()))
    }
}
