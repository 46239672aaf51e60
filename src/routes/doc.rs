use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::{AddressList, AddressRequest},
        cart::{AddToCartRequest, CartItemList, UpdateCartItemRequest},
        collections::{CollectionList, CollectionRequest},
        customers::{CustomerList, UpdateCustomerRequest, UpdateProfileRequest},
        images::{ImageUpload, ProductImageList},
        likes::{LikeRequest, LikedProductList},
        orders::{OrderList, PlaceOrderRequest, UpdateOrderRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        promotions::{AttachPromotionRequest, CreatePromotionRequest, PromotionList},
        reviews::{CreateReviewRequest, ReviewList},
        tags::{AttachTagRequest, CreateTagRequest, TagList},
    },
    error::ErrorData,
    models::{
        Address, Cart, CartItem, Collection, Customer, Like, Membership, Order, OrderItem,
        PaymentStatus, Product, ProductImage, Promotion, Review, SimpleProduct, Tag,
    },
    response::{ApiResponse, Meta},
    routes::{
        carts, collections, customers, health, images, likes, orders, params, products,
        promotions, tags,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        collections::list_collections,
        collections::get_collection,
        collections::create_collection,
        collections::update_collection,
        collections::delete_collection,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::list_reviews,
        products::create_review,
        products::get_review,
        products::delete_review,
        products::list_product_tags,
        products::attach_tag,
        products::detach_tag,
        images::list_images,
        images::get_image,
        images::upload_image,
        images::delete_image,
        promotions::list_promotions,
        promotions::create_promotion,
        promotions::delete_promotion,
        promotions::list_product_promotions,
        promotions::attach_promotion,
        promotions::detach_promotion,
        tags::list_tags,
        tags::create_tag,
        likes::list_likes,
        likes::like_product,
        likes::unlike_product,
        carts::create_cart,
        carts::get_cart,
        carts::delete_cart,
        carts::list_items,
        carts::add_item,
        carts::get_item,
        carts::update_item,
        carts::remove_item,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        customers::me,
        customers::update_me,
        customers::list_customers,
        customers::get_customer,
        customers::update_customer,
        customers::list_addresses,
        customers::add_address,
        customers::update_address,
        customers::delete_address
    ),
    components(
        schemas(
            Collection,
            Product,
            SimpleProduct,
            Customer,
            Membership,
            Cart,
            CartItem,
            Order,
            OrderItem,
            PaymentStatus,
            Review,
            Tag,
            Like,
            ProductImage,
            Promotion,
            Address,
            CollectionRequest,
            CollectionList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateReviewRequest,
            ReviewList,
            CreateTagRequest,
            AttachTagRequest,
            TagList,
            LikeRequest,
            LikedProductList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemList,
            PlaceOrderRequest,
            UpdateOrderRequest,
            OrderList,
            UpdateProfileRequest,
            UpdateCustomerRequest,
            CustomerList,
            ImageUpload,
            ProductImageList,
            CreatePromotionRequest,
            AttachPromotionRequest,
            PromotionList,
            AddressRequest,
            AddressList,
            params::Pagination,
            params::SortOrder,
            ErrorData,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Cart>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<ErrorData>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Collections", description = "Product collection endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Reviews", description = "Product review endpoints"),
        (name = "Tags", description = "Tagging endpoints"),
        (name = "Images", description = "Product image endpoints"),
        (name = "Promotions", description = "Promotion endpoints"),
        (name = "Likes", description = "Liked product endpoints"),
        (name = "Carts", description = "Anonymous cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Customers", description = "Customer profile endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
