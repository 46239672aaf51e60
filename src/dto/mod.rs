pub mod addresses;
pub mod cart;
pub mod collections;
pub mod customers;
pub mod images;
pub mod likes;
pub mod orders;
pub mod products;
pub mod promotions;
pub mod reviews;
pub mod tags;
