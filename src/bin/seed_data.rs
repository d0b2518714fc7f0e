//! Seed data script - populates the storefront with a small demo catalog
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 2 brands, 3 sizes and a two-level category tree
//! - 4 products with colored variations per size
//! - a few delivery cities
//! - one demo customer, whose bearer token is printed at the end

use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use storefront_api::{
    auth::{AuthConfig, AuthService},
    config,
    db,
    entities::{city, size, user},
    models::catalog::VariationDraft,
    services::commerce::{
        product_catalog_service::{CreateCategoryInput, CreateProductInput},
        ProductCatalogService,
    },
};

const CITIES: &[&str] = &["Alexandria", "Cairo", "Giza", "Luxor"];

struct SeedProduct {
    name: &'static str,
    category: usize,
    brand: usize,
    price_cents: i64,
    colors: &'static [(&'static str, i32)],
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Linen Shirt",
        category: 1,
        brand: 0,
        price_cents: 2500,
        colors: &[("#FFFFFF", 12), ("#D2B48C", 6)],
    },
    SeedProduct {
        name: "Oxford Shirt",
        category: 1,
        brand: 1,
        price_cents: 3200,
        colors: &[("#1E3A8A", 8)],
    },
    SeedProduct {
        name: "Chino Trousers",
        category: 2,
        brand: 0,
        price_cents: 4500,
        colors: &[("#C3B091", 10), ("#000080", 4)],
    },
    SeedProduct {
        name: "Denim Jeans",
        category: 2,
        brand: 1,
        price_cents: 5000,
        colors: &[("#3F51B5", 15)],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    info!("=== Storefront Seed Data ===");
    let pool = db::establish_connection_from_app_config(&cfg).await?;
    db::run_migrations(&pool).await?;

    let cfg = Arc::new(cfg);
    let db = Arc::new(pool);
    let catalog = ProductCatalogService::new(db.clone(), cfg.clone());

    let brands = vec![
        catalog.create_brand("Nile Cotton").await?,
        catalog.create_brand("Delta Denim").await?,
    ];
    let mut sizes: Vec<size::Model> = Vec::new();
    for name in ["S", "M", "L"] {
        sizes.push(catalog.create_size(name).await?);
    }
    info!("  Created {} brands and {} sizes", brands.len(), sizes.len());

    let men = catalog
        .create_category(CreateCategoryInput {
            name: "Men".into(),
            parent_id: None,
            description: "Menswear".into(),
            image_url: None,
        })
        .await?;
    let mut categories = vec![men.clone()];
    for name in ["Shirts", "Trousers"] {
        categories.push(
            catalog
                .create_category(CreateCategoryInput {
                    name: name.into(),
                    parent_id: Some(men.id),
                    description: String::new(),
                    image_url: None,
                })
                .await?,
        );
    }
    info!("  Created {} categories", categories.len());

    let mut variation_count = 0;
    for seed in PRODUCTS {
        let product = catalog
            .create_product(CreateProductInput {
                name: seed.name.into(),
                category_id: categories[seed.category].id,
                brand_id: brands[seed.brand].id,
                description: format!("{} from the demo catalog", seed.name),
                base_image_url: None,
                base_price_cents: seed.price_cents,
                is_active: true,
            })
            .await?;

        for (i, (color, stock)) in seed.colors.iter().enumerate() {
            for (j, size) in sizes.iter().enumerate() {
                catalog
                    .create_variation(
                        product.id,
                        size.id,
                        VariationDraft {
                            color: (*color).into(),
                            description: String::new(),
                            sku: None,
                            price_cents: None,
                            stock: *stock,
                            variation_image_url: None,
                            discount: if i == 1 { dec!(10) } else { dec!(0) },
                            featured: i == 0 && j == 1,
                            is_active: true,
                        },
                    )
                    .await?;
                variation_count += 1;
            }
        }
    }
    info!(
        "  Created {} products with {} variations",
        PRODUCTS.len(),
        variation_count
    );

    for name in CITIES {
        city::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set((*name).into()),
            country_code: Set("EG".into()),
        }
        .insert(&*db)
        .await?;
    }
    info!("  Created {} cities", CITIES.len());

    let customer = create_customer(&db).await?;
    let auth = AuthService::new(AuthConfig::from_app_config(&cfg), db.clone());
    let token = auth.generate_token(&customer)?;

    info!("=== Seed Data Complete ===");
    info!("Demo customer: {}", customer.email);
    info!("Bearer token for checkout: {}", token);
    info!("Try: curl 'http://localhost:{}/shop?sorting=alpha'", cfg.port);

    Ok(())
}

async fn create_customer(db: &DatabaseConnection) -> anyhow::Result<user::Model> {
    let customer = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set("Demo".into()),
        last_name: Set("Customer".into()),
        email: Set(format!("demo+{}@example.com", Uuid::new_v4().simple())),
        is_active: Set(true),
        date_joined: Set(Utc::now()),
    }
    .insert(db)
    .await?;
    Ok(customer)
}
