pub mod brand;
pub mod category;
pub mod city;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod product_variation;
pub mod review;
pub mod shipping_info;
pub mod size;
pub mod user;

pub use order::OrderStatus;
