use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub use crate::entity::{customers::Membership, orders::PaymentStatus};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Collection {
    pub id: i32,
    pub title: String,
    pub featured_product_id: Option<i32>,
    pub product_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    /// Price in cents.
    pub unit_price: i64,
    pub price_plus_tax: i64,
    pub inventory: i32,
    pub collection_id: i32,
    pub last_update: DateTime<Utc>,
}

/// Reduced product view embedded in cart and order lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SimpleProduct {
    pub id: i32,
    pub title: String,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: i32,
    pub user_id: i64,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub membership: Membership,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
    pub total_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: i32,
    pub product: SimpleProduct,
    pub quantity: i32,
    pub total_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i32,
    pub placed_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    /// Customer id.
    pub customer: i32,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i32,
    pub product: SimpleProduct,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: i32,
    pub product_id: i32,
    pub customer_id: i32,
    pub text: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Tag {
    pub id: i32,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Like {
    pub id: i32,
    pub user_id: i64,
    pub product_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub id: i32,
    pub product_id: i32,
    /// URL under `/media`.
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Promotion {
    pub id: i32,
    pub description: String,
    /// Percentage off, in (0, 100].
    pub discount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: i32,
    pub street: String,
    pub city: String,
    pub customer_id: i32,
}
