use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{config::AppConfig, events::EventBus};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub events: EventBus,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, config: AppConfig, events: EventBus) -> Self {
        Self {
            orm,
            config: Arc::new(config),
            events,
        }
    }
}
