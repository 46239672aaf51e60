use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Collection;

/// Used for both create and full update.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CollectionRequest {
    pub title: String,
    pub featured_product_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CollectionList {
    pub items: Vec<Collection>,
}
