//! Storefront API
//!
//! Catalog browsing, a session cart, checkout, hosted payment and product
//! reviews for a single-vendor clothing shop.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod notifications;
pub mod services;
pub mod session;
pub mod tracing;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    errors::ServiceError,
    middleware_helpers::SessionCookie,
    notifications::{LogNotifier, Notifier},
    services::payment_gateway::{LocalGateway, PaymentGateway, StripeCheckoutGateway},
    session::{InMemorySessionStore, RedisSessionStore, SessionStore},
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub sessions: Arc<dyn SessionStore>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        sessions: Arc<dyn SessionStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));
        let services = handlers::AppServices::new(
            db.clone(),
            config.clone(),
            sessions.clone(),
            gateway,
            notifier,
        );
        Self {
            db,
            config,
            auth,
            sessions,
            services,
        }
    }

    /// Picks the session backend and payment provider named in `config`
    pub fn from_config(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
    ) -> Result<Self, ServiceError> {
        let sessions: Arc<dyn SessionStore> = if config.uses_redis_sessions() {
            ::tracing::info!("Using Redis session store");
            Arc::new(RedisSessionStore::new(&config.redis_url, config.session_ttl())?)
        } else {
            ::tracing::info!("Using in-memory session store");
            Arc::new(InMemorySessionStore::new())
        };

        let gateway: Arc<dyn PaymentGateway> = if config.uses_stripe() {
            Arc::new(StripeCheckoutGateway::from_config(&config)?)
        } else {
            ::tracing::warn!("Payments use the local gateway; orders are confirmed without charging");
            Arc::new(LocalGateway)
        };

        let notifier: Arc<dyn Notifier> =
            Arc::new(LogNotifier::new(config.notification_from_email.clone()));

        Ok(Self::new(db, config, sessions, gateway, notifier))
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Storefront pages, cart, checkout and review routes
pub fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::store::home))
        .route("/shop", get(handlers::store::shop))
        .route("/cart/", get(handlers::cart::cart_page))
        .route("/cart/reset/", get(handlers::cart::reset_cart))
        .route("/cart/:slug/add-to-cart", get(handlers::cart::add_to_cart))
        .route(
            "/cart/:id/update/:action/",
            get(handlers::cart::update_cart),
        )
        .route(
            "/checkout/",
            get(handlers::checkout::checkout_page).post(handlers::checkout::place_order),
        )
        .route("/checkout/pay/", get(handlers::checkout::pay))
        .route(
            "/checkout/pay/success",
            get(handlers::checkout::payment_success),
        )
        .route(
            "/checkout/pay/cancel",
            get(handlers::checkout::payment_cancel),
        )
        .route("/reviews/:slug/", post(handlers::reviews::submit_review))
        .route("/:slug/", get(handlers::store::product_detail))
}

/// Full application router with session, security header, request id and
/// tracing layers applied
pub fn build_router(state: AppState) -> Router {
    let cookie = SessionCookie::from_config(&state.config);

    Router::new()
        .route("/health", get(handlers::health::readiness))
        .route("/health/live", get(handlers::health::liveness))
        .merge(storefront_routes())
        .layer(axum::middleware::from_fn_with_state(
            cookie,
            middleware_helpers::session_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware_helpers::security_headers_middleware,
        ))
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
