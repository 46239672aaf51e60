use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub title: String,
    /// Derived from the title when omitted.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub unit_price: i64,
    pub inventory: i32,
    pub collection_id: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<i64>,
    pub inventory: Option<i32>,
    pub collection_id: Option<i32>,
}

impl UpdateProductRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.unit_price.is_none()
            && self.inventory.is_none()
            && self.collection_id.is_none()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}
