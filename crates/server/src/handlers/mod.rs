//! REST handlers for the aggregate API

pub mod orders;
pub mod products;

pub use orders::{create_order, delete_order, list_orders};
pub use products::{create_product, delete_product, list_products};
