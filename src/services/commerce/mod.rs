/// Storefront services: catalog, session cart and checkout
pub mod cart_service;
pub mod checkout_service;
pub mod product_catalog_service;

pub use cart_service::{CartAction, CartService, CartView, QuantityQuery};
pub use checkout_service::{CheckoutPage, CheckoutService, PlaceOrderOutcome};
pub use product_catalog_service::{CatalogLookup, ProductCatalogService, ShopQuery};
