use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Tag;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    pub label: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttachTagRequest {
    pub tag_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagList {
    pub items: Vec<Tag>,
}
