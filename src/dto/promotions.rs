use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Promotion;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePromotionRequest {
    pub description: String,
    pub discount: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttachPromotionRequest {
    pub promotion_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromotionList {
    pub items: Vec<Promotion>,
}
