#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    config::{AppConfig, DEV_DEFAULT_JWT_SECRET},
    db::{self, DbConfig},
    entities::{brand, category, city, product, product_variation, size, user},
    errors::ServiceError,
    models::catalog::VariationDraft,
    notifications::RecordingNotifier,
    services::{
        commerce::product_catalog_service::{CreateCategoryInput, CreateProductInput},
        payment_gateway::{CheckoutSessionHandle, CheckoutSessionRequest, PaymentGateway},
    },
    session::InMemorySessionStore,
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const PAYMENT_PAGE: &str = "https://pay.test/session";

/// Payment provider double that remembers every session it was asked for
#[derive(Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<CheckoutSessionRequest>>,
}

impl RecordingGateway {
    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        let id = format!("cs_test_{}", request.order_id.simple());
        Ok(CheckoutSessionHandle {
            url: format!("{}/{}", PAYMENT_PAGE, id),
            id,
        })
    }
}

/// A small catalog: one product with a featured white variation in two
/// sizes and a discounted navy one
pub struct Catalog {
    pub brand: brand::Model,
    pub category: category::Model,
    pub small: size::Model,
    pub medium: size::Model,
    pub product: product::Model,
    pub white_m: product_variation::Model,
    pub white_s: product_variation::Model,
    pub navy_m: product_variation::Model,
    pub city: city::Model,
}

/// Helper harness for spinning up the storefront backed by an in-memory
/// SQLite database and in-memory sessions. Requests share one cookie jar,
/// so consecutive calls belong to the same visitor.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<RecordingGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub customer: user::Model,
    token: String,
    cookie: Mutex<Option<String>>,
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        DEV_DEFAULT_JWT_SECRET.to_string(),
        "test".to_string(),
    );
    cfg.public_base_url = "http://shop.test".to_string();
    cfg.shipping_fee_cents = 1000;
    cfg.shop_page_size = 2;
    cfg
}

impl TestApp {
    pub async fn new() -> Self {
        let gateway = Arc::new(RecordingGateway::default());
        Self::build(test_config(), gateway.clone(), gateway).await
    }

    /// Same harness, but payments go through `gateway`
    pub async fn with_gateway(cfg: AppConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::build(cfg, gateway, Arc::new(RecordingGateway::default())).await
    }

    async fn build(
        cfg: AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        recorder: Arc<RecordingGateway>,
    ) -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let notifier = RecordingNotifier::new();
        let state = AppState::new(
            Arc::new(pool),
            Arc::new(cfg),
            Arc::new(InMemorySessionStore::new()),
            gateway,
            notifier.clone(),
        );

        let customer = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            first_name: Set("Mona".into()),
            last_name: Set("Hassan".into()),
            email: Set("mona@example.com".into()),
            is_active: Set(true),
            date_joined: Set(Utc::now()),
        }
        .insert(&*state.db)
        .await
        .expect("insert customer");
        let token = state
            .auth
            .generate_token(&customer)
            .expect("token for customer");

        Self {
            router: storefront_api::build_router(state.clone()),
            state,
            gateway: recorder,
            notifier,
            customer,
            token,
            cookie: Mutex::new(None),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Forget the session cookie, as a new visitor would
    pub fn clear_cookies(&self) {
        *self.cookie.lock().unwrap() = None;
    }

    pub async fn seed_catalog(&self) -> Catalog {
        let catalog = &self.state.services.catalog;
        let brand = catalog.create_brand("Nile Cotton").await.unwrap();
        let small = catalog.create_size("S").await.unwrap();
        let medium = catalog.create_size("M").await.unwrap();
        let category = catalog
            .create_category(CreateCategoryInput {
                name: "Shirts".into(),
                parent_id: None,
                description: String::new(),
                image_url: None,
            })
            .await
            .unwrap();
        let product = catalog
            .create_product(CreateProductInput {
                name: "Linen Shirt".into(),
                category_id: category.id,
                brand_id: brand.id,
                description: "Breathable linen".into(),
                base_image_url: Some("https://img.test/linen.png".into()),
                base_price_cents: 2500,
                is_active: true,
            })
            .await
            .unwrap();

        let white_m = self
            .variation(&product, &medium, "#FFFFFF", 5, Decimal::ZERO, true)
            .await;
        let white_s = self
            .variation(&product, &small, "#FFFFFF", 3, Decimal::ZERO, false)
            .await;
        let navy_m = self
            .variation(&product, &medium, "#000080", 2, Decimal::from(20), false)
            .await;

        let city = city::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Cairo".into()),
            country_code: Set("EG".into()),
        }
        .insert(&*self.state.db)
        .await
        .unwrap();

        Catalog {
            brand,
            category,
            small,
            medium,
            product,
            white_m,
            white_s,
            navy_m,
            city,
        }
    }

    pub async fn variation(
        &self,
        product: &product::Model,
        size: &size::Model,
        color: &str,
        stock: i32,
        discount: Decimal,
        featured: bool,
    ) -> product_variation::Model {
        self.state
            .services
            .catalog
            .create_variation(
                product.id,
                size.id,
                VariationDraft {
                    color: color.into(),
                    stock,
                    discount,
                    featured,
                    is_active: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    /// Draft carrying a variation's current fields, for edits
    pub fn draft_of(variation: &product_variation::Model) -> VariationDraft {
        VariationDraft {
            color: variation.color.clone(),
            description: variation.description.clone(),
            sku: Some(variation.sku.clone()),
            price_cents: Some(variation.price_cents),
            stock: variation.stock,
            variation_image_url: variation.variation_image_url.clone(),
            discount: variation.discount,
            featured: variation.featured,
            is_active: true,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, form: Option<&[(&str, &str)]>, authed: bool) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = self.cookie.lock().unwrap().clone() {
            builder = builder.header(header::COOKIE, cookie);
        }
        if authed {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        }
        let body = match form {
            Some(fields) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(encode_form(fields))
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie
                .to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap()
                .to_string();
            *self.cookie.lock().unwrap() = Some(pair);
        }
        response
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None, false).await
    }

    pub async fn get_authed(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None, true).await
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> Response {
        self.request(Method::POST, uri, Some(fields), false).await
    }

    pub async fn post_form_authed(&self, uri: &str, fields: &[(&str, &str)]) -> Response {
        self.request(Method::POST, uri, Some(fields), true).await
    }

    pub async fn cart_json(&self) -> Value {
        response_json(self.get("/cart/").await).await
    }

    pub async fn add_to_cart(&self, variation: &product_variation::Model, quantity: i64) -> Response {
        self.get(&format!(
            "/cart/{}/add-to-cart?quantity={}",
            variation.slug, quantity
        ))
        .await
    }

    pub fn shipping_fields(&self, city: &city::Model) -> Vec<(&'static str, String)> {
        vec![
            ("first_name", "Mona".to_string()),
            ("last_name", "Hassan".to_string()),
            ("email", "mona@example.com".to_string()),
            ("city_id", city.id.to_string()),
            ("address", "12 Nile St".to_string()),
            ("postal_code", "11511".to_string()),
            ("phone_number", "010 1234 5678".to_string()),
        ]
    }

    pub async fn place_order(&self, city: &city::Model) -> Response {
        let fields = self.shipping_fields(city);
        let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.post_form_authed("/checkout/", &borrowed).await
    }
}

fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn percent_encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            b' ' => "+".to_string(),
            other => format!("%{:02X}", other),
        })
        .collect()
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect location")
        .to_str()
        .unwrap()
}
