pub mod cart;
pub mod checkout;
pub mod common;
pub mod health;
pub mod reviews;
pub mod store;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    notifications::Notifier,
    services::{
        commerce::{CartService, CatalogLookup, CheckoutService, ProductCatalogService},
        payment_gateway::PaymentGateway,
        payments::PaymentService,
        reviews::ReviewService,
    },
    session::SessionStore,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<ProductCatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub payments: Arc<PaymentService>,
    pub reviews: Arc<ReviewService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        config: Arc<AppConfig>,
        sessions: Arc<dyn SessionStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let catalog = Arc::new(ProductCatalogService::new(db_pool.clone(), config.clone()));
        let lookup: Arc<dyn CatalogLookup> = catalog.clone();

        let cart = Arc::new(CartService::new(sessions.clone(), lookup.clone()));
        let checkout = Arc::new(CheckoutService::new(
            db_pool.clone(),
            sessions.clone(),
            lookup,
            notifier,
            config.clone(),
        ));
        let payments = Arc::new(PaymentService::new(
            db_pool.clone(),
            sessions,
            gateway,
            config,
        ));
        let reviews = Arc::new(ReviewService::new(db_pool));

        Self {
            catalog,
            cart,
            checkout,
            payments,
            reviews,
        }
    }
}
