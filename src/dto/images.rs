use serde::Serialize;
use utoipa::ToSchema;

use crate::models::ProductImage;

/// Multipart form accepted by the image upload endpoint.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUpload {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductImageList {
    pub items: Vec<ProductImage>,
}
