use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, Query, SelectStatement},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    entities::{brand, category, product, product_variation, size},
    errors::ServiceError,
    models::{
        cart::SessionCart,
        catalog::{normalize_variation, VariationDraft, VariationSummary},
        slug::{slug_candidate, slugify},
    },
    services::reviews::{review_views, ReviewView},
};

/// Read access to variations for the cart: stock checks when adding and
/// display data when rendering.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn find_variation(
        &self,
        id: Uuid,
    ) -> Result<Option<product_variation::Model>, ServiceError>;

    async fn find_variation_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<product_variation::Model>, ServiceError>;

    /// Display rows for `ids`; unknown ids are skipped
    async fn variation_summaries(&self, ids: &[Uuid])
        -> Result<Vec<VariationSummary>, ServiceError>;
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    pub category_id: Uuid,
    pub brand_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[serde(default)]
    pub base_image_url: Option<String>,
    #[validate(range(min = 0))]
    pub base_price_cents: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Shop listing filters, taken verbatim from the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopQuery {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub query: Option<String>,
    pub sorting: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sorting {
    Latest,
    Alpha,
    OnSale,
}

impl Sorting {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw? {
            "latest" => Some(Sorting::Latest),
            "alpha" => Some(Sorting::Alpha),
            "on_sale" => Some(Sorting::OnSale),
            _ => None,
        }
    }
}

/// Product as listed on the home and shop pages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCard {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub base_price: Decimal,
    /// Featured variation's undiscounted price
    pub price: Option<Decimal>,
    pub price_after: Option<Decimal>,
    pub on_sale: bool,
    pub is_active_now: bool,
    pub image_url: Option<String>,
    pub featured_variation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationView {
    pub id: Uuid,
    pub slug: String,
    pub sku: String,
    pub display_name: String,
    pub color: String,
    pub size: String,
    pub description: String,
    pub price: Decimal,
    pub price_after: Option<Decimal>,
    pub has_discount: bool,
    pub discount: Decimal,
    pub stock: i32,
    pub featured: bool,
    pub is_active: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub top_categories: Vec<category::Model>,
    pub latest_products: Vec<ProductCard>,
    pub popular_products: Vec<ProductCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: u64,
    pub num_pages: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageInfo {
    /// Resolves a requested page the forgiving way: anything unparsable or
    /// below one is page 1, anything past the end is the last page.
    pub fn resolve(requested: Option<&str>, total_items: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let num_pages = total_items.div_ceil(page_size).max(1);
        let number = requested
            .and_then(|p| p.trim().parse::<i64>().ok())
            .map(|p| if p < 1 { 1 } else { (p as u64).min(num_pages) })
            .unwrap_or(1);
        Self {
            number,
            num_pages,
            page_size,
            total_items,
            has_next: number < num_pages,
            has_previous: number > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShopPage {
    pub products: Vec<ProductCard>,
    pub page: PageInfo,
    pub categories: Vec<category::Model>,
    pub sizes: Vec<size::Model>,
    pub brands: Vec<brand::Model>,
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub product: product::Model,
    pub base_price: Decimal,
    pub chosen: Option<VariationView>,
    pub variations: Vec<VariationView>,
    pub same_colors: Vec<VariationView>,
    pub other_colors: Vec<VariationView>,
    pub reviews: Vec<ReviewView>,
    pub reviews_count: usize,
    /// Initial value of the add-to-cart quantity field
    pub quantity: i64,
}

/// Data every storefront page carries
#[derive(Debug, Clone, Serialize)]
pub struct LayoutContext {
    pub categories: Vec<category::Model>,
    pub cart_length: i64,
}

/// Catalog reads for the storefront and the write path used to maintain it
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    config: Arc<AppConfig>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    // ----- write path -----

    #[instrument(skip(self))]
    pub async fn create_brand(&self, name: &str) -> Result<brand::Model, ServiceError> {
        let name = required_name(name, 50)?;
        let taken = brand::Entity::find()
            .filter(brand::Column::Name.eq(name.as_str()))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::ValidationError(format!(
                "Brand {} already exists",
                name
            )));
        }
        let brand = brand::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
        }
        .insert(&*self.db)
        .await?;
        info!(brand_id = %brand.id, "Created brand {}", brand.name);
        Ok(brand)
    }

    #[instrument(skip(self))]
    pub async fn create_size(&self, name: &str) -> Result<size::Model, ServiceError> {
        let name = required_name(name, 10)?;
        let taken = size::Entity::find()
            .filter(size::Column::Name.eq(name.as_str()))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::ValidationError(format!(
                "Size {} already exists",
                name
            )));
        }
        let size = size::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
        }
        .insert(&*self.db)
        .await?;
        info!(size_id = %size.id, "Created size {}", size.name);
        Ok(size)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let name = input.name.trim().to_string();

        if let Some(parent_id) = input.parent_id {
            category::Entity::find_by_id(parent_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Parent category {} not found", parent_id))
                })?;
        }
        let taken = category::Entity::find()
            .filter(category::Column::Name.eq(name.as_str()))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::ValidationError(format!(
                "Category {} already exists",
                name
            )));
        }

        let slug = unique_category_slug(&*self.db, &name).await?;
        let now = Utc::now();
        let category = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            parent_id: Set(input.parent_id),
            slug: Set(slug),
            description: Set(input.description),
            image_url: Set(input.image_url),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(category_id = %category.id, slug = %category.slug, "Created category");
        Ok(category)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let name = input.name.trim().to_string();

        category::Entity::find_by_id(input.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category {} not found", input.category_id))
            })?;
        brand::Entity::find_by_id(input.brand_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Brand {} not found", input.brand_id)))?;

        let taken = product::Entity::find()
            .filter(product::Column::Name.eq(name.as_str()))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::ValidationError(format!(
                "Product {} already exists",
                name
            )));
        }

        let slug = unique_product_slug(&*self.db, &name).await?;
        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            category_id: Set(input.category_id),
            brand_id: Set(input.brand_id),
            slug: Set(slug),
            description: Set(input.description),
            base_image_url: Set(input.base_image_url),
            base_price_cents: Set(input.base_price_cents),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(product_id = %product.id, slug = %product.slug, "Created product");
        Ok(product)
    }

    /// Creates a variation after normalizing it against its product and
    /// siblings. Saving a featured variation un-features the others.
    #[instrument(skip(self, draft))]
    pub async fn create_variation(
        &self,
        product_id: Uuid,
        size_id: Uuid,
        draft: VariationDraft,
    ) -> Result<product_variation::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let product = product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        let size = size::Entity::find_by_id(size_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Size {} not found", size_id)))?;

        let has_featured_sibling = product_variation::Entity::find()
            .filter(product_variation::Column::ProductId.eq(product.id))
            .filter(product_variation::Column::Featured.eq(true))
            .count(&txn)
            .await?
            > 0;

        let normalized = normalize_variation(draft, &product, &size, has_featured_sibling)?;
        ensure_unique_combination(&txn, product.id, &normalized.color, size.id, None).await?;
        ensure_unique_sku(&txn, &normalized.sku, None).await?;

        if normalized.unfeature_siblings {
            product_variation::Entity::update_many()
                .col_expr(product_variation::Column::Featured, Expr::value(false))
                .filter(product_variation::Column::ProductId.eq(product.id))
                .exec(&txn)
                .await?;
        }

        let now = Utc::now();
        let variation = product_variation::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            size_id: Set(size.id),
            color: Set(normalized.color),
            slug: Set(normalized.slug),
            description: Set(normalized.description),
            sku: Set(normalized.sku),
            price_cents: Set(normalized.price_cents),
            stock: Set(normalized.stock),
            variation_image_url: Set(normalized.variation_image_url),
            discount: Set(normalized.discount),
            featured: Set(normalized.featured),
            is_active: Set(normalized.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(variation_id = %variation.id, sku = %variation.sku, "Created product variation");
        Ok(variation)
    }

    /// Replaces a variation's editable fields, re-running normalization. The
    /// existing SKU is kept when the draft does not supply one.
    #[instrument(skip(self, draft))]
    pub async fn update_variation(
        &self,
        variation_id: Uuid,
        mut draft: VariationDraft,
    ) -> Result<product_variation::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = product_variation::Entity::find_by_id(variation_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variation {} not found", variation_id))
            })?;
        let product = product::Entity::find_by_id(existing.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", existing.product_id))
            })?;
        let size = size::Entity::find_by_id(existing.size_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Size {} not found", existing.size_id)))?;

        let has_featured_sibling = product_variation::Entity::find()
            .filter(product_variation::Column::ProductId.eq(product.id))
            .filter(product_variation::Column::Featured.eq(true))
            .filter(product_variation::Column::Id.ne(existing.id))
            .count(&txn)
            .await?
            > 0;

        if draft.sku.as_deref().map_or(true, |s| s.trim().is_empty()) {
            draft.sku = Some(existing.sku.clone());
        }
        let normalized = normalize_variation(draft, &product, &size, has_featured_sibling)?;
        ensure_unique_combination(&txn, product.id, &normalized.color, size.id, Some(existing.id))
            .await?;
        ensure_unique_sku(&txn, &normalized.sku, Some(existing.id)).await?;

        if normalized.unfeature_siblings {
            product_variation::Entity::update_many()
                .col_expr(product_variation::Column::Featured, Expr::value(false))
                .filter(product_variation::Column::ProductId.eq(product.id))
                .filter(product_variation::Column::Id.ne(existing.id))
                .exec(&txn)
                .await?;
        }

        let mut active: product_variation::ActiveModel = existing.into();
        active.color = Set(normalized.color);
        active.slug = Set(normalized.slug);
        active.description = Set(normalized.description);
        active.sku = Set(normalized.sku);
        active.price_cents = Set(normalized.price_cents);
        active.stock = Set(normalized.stock);
        active.variation_image_url = Set(normalized.variation_image_url);
        active.discount = Set(normalized.discount);
        active.featured = Set(normalized.featured);
        active.is_active = Set(normalized.is_active);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        info!(variation_id = %updated.id, stock = updated.stock, "Updated product variation");
        Ok(updated)
    }

    /// Hides a product from the storefront. Products are never hard-deleted.
    #[instrument(skip(self))]
    pub async fn deactivate_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        let product = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let mut active: product::ActiveModel = product.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let product = active.update(&*self.db).await?;
        info!(product_id = %product.id, "Deactivated product");
        Ok(product)
    }

    /// Deletes a category together with all of its descendants. Refused while
    /// any category in that subtree still holds products.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<u64, ServiceError> {
        let txn = self.db.begin().await?;

        category::Entity::find_by_id(category_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))?;

        let mut subtree = vec![category_id];
        let mut frontier = vec![category_id];
        while !frontier.is_empty() {
            let children: Vec<Uuid> = category::Entity::find()
                .filter(category::Column::ParentId.is_in(frontier.clone()))
                .all(&txn)
                .await?
                .into_iter()
                .map(|c| c.id)
                .filter(|id| !subtree.contains(id))
                .collect();
            subtree.extend(children.iter().copied());
            frontier = children;
        }

        let products = product::Entity::find()
            .filter(product::Column::CategoryId.is_in(subtree.clone()))
            .count(&txn)
            .await?;
        if products > 0 {
            warn!(%category_id, products, "Refusing to delete category that still has products");
            return Err(ServiceError::InvalidOperation(format!(
                "Category still holds {} product(s)",
                products
            )));
        }

        let deleted = category::Entity::delete_many()
            .filter(category::Column::Id.is_in(subtree))
            .exec(&txn)
            .await?
            .rows_affected;

        txn.commit().await?;
        info!(%category_id, deleted, "Deleted category subtree");
        Ok(deleted)
    }

    // ----- read path -----

    pub async fn layout(&self, cart: &SessionCart) -> Result<LayoutContext, ServiceError> {
        Ok(LayoutContext {
            categories: self.all_categories().await?,
            cart_length: cart.len(),
        })
    }

    #[instrument(skip(self))]
    pub async fn home(&self) -> Result<HomePage, ServiceError> {
        let top_categories = category::Entity::find()
            .filter(category::Column::ParentId.is_null())
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?;

        let latest = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id)
            .limit(self.config.home_products_limit)
            .all(&*self.db)
            .await?;
        let latest_products = self.cards(latest).await?;

        Ok(HomePage {
            top_categories,
            popular_products: latest_products.clone(),
            latest_products,
        })
    }

    #[instrument(skip(self))]
    pub async fn shop(&self, query: &ShopQuery) -> Result<ShopPage, ServiceError> {
        let mut select = product::Entity::find().filter(product::Column::IsActive.eq(true));

        let sorting = Sorting::parse(non_blank(&query.sorting));
        if sorting == Some(Sorting::OnSale) {
            select = select.filter(product::Column::Id.in_subquery(
                variation_products()
                    .and_where(product_variation::Column::Discount.ne(Decimal::ZERO))
                    .to_owned(),
            ));
        }

        if let Some(slug) = non_blank(&query.category) {
            let category = category::Entity::find()
                .filter(category::Column::Slug.eq(slug))
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", slug)))?;
            select = select.filter(product::Column::CategoryId.eq(category.id));
        }

        if let Some(name) = non_blank(&query.size) {
            let size = size::Entity::find()
                .filter(size::Column::Name.eq(name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Size {} not found", name)))?;
            select = select.filter(product::Column::Id.in_subquery(
                variation_products()
                    .and_where(product_variation::Column::SizeId.eq(size.id))
                    .to_owned(),
            ));
        }

        if let Some(color) = non_blank(&query.color) {
            select = select.filter(
                product::Column::Id.in_subquery(
                    variation_products()
                        .and_where(
                            Expr::expr(Func::lower(Expr::col(product_variation::Column::Color)))
                                .eq(color.to_lowercase()),
                        )
                        .to_owned(),
                ),
            );
        }

        if let Some(name) = non_blank(&query.brand) {
            let brand = brand::Entity::find()
                .filter(brand::Column::Name.eq(name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Brand {} not found", name)))?;
            select = select.filter(product::Column::BrandId.eq(brand.id));
        }

        if let Some(needle) = non_blank(&query.query) {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col((product::Entity, product::Column::Name))))
                    .like(contains_pattern(needle)),
            );
        }

        let select = order_listing(select, sorting);
        let paginator = select.paginate(&*self.db, self.config.shop_page_size);
        let page = PageInfo::resolve(
            non_blank(&query.page),
            paginator.num_items().await?,
            self.config.shop_page_size,
        );
        let products = paginator.fetch_page(page.number - 1).await?;
        let products = self.cards(products).await?;

        let colors = product_variation::Entity::find()
            .select_only()
            .column(product_variation::Column::Color)
            .filter(product_variation::Column::IsActive.eq(true))
            .distinct()
            .order_by_asc(product_variation::Column::Color)
            .into_tuple::<String>()
            .all(&*self.db)
            .await?;

        Ok(ShopPage {
            products,
            page,
            categories: self.all_categories().await?,
            sizes: size::Entity::find()
                .order_by_asc(size::Column::Name)
                .all(&*self.db)
                .await?,
            brands: brand::Entity::find()
                .order_by_asc(brand::Column::Name)
                .all(&*self.db)
                .await?,
            colors,
        })
    }

    /// Product page. Without `variant_slug` the featured variation is shown;
    /// a slug that is not one of this product's variations is a 404.
    #[instrument(skip(self))]
    pub async fn product_detail(
        &self,
        slug: &str,
        variant_slug: Option<&str>,
    ) -> Result<ProductDetail, ServiceError> {
        let product = product::Entity::find()
            .filter(product::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", slug)))?;

        let variations = product_variation::Entity::find()
            .filter(product_variation::Column::ProductId.eq(product.id))
            .order_by_asc(product_variation::Column::Color)
            .order_by_asc(product_variation::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let chosen = match variant_slug.map(str::trim).filter(|s| !s.is_empty()) {
            None => product.featured(&variations),
            Some(variant) => Some(variations.iter().find(|v| v.slug == variant).ok_or_else(
                || ServiceError::NotFound(format!("Variation {} not found", variant)),
            )?),
        };

        let size_names = self.size_names(&variations).await?;
        let view = |v: &product_variation::Model| variation_view(v, &product, &size_names);

        let (same_colors, other_colors) = match chosen {
            Some(c) => (
                c.same_colors(&variations).into_iter().map(view).collect(),
                c.other_color_variations(&variations)
                    .into_iter()
                    .map(view)
                    .collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let reviews = review_views(&self.db, product.id).await?;

        Ok(ProductDetail {
            base_price: product.base_price(),
            chosen: chosen.map(view),
            variations: variations.iter().map(view).collect(),
            same_colors,
            other_colors,
            reviews_count: reviews.len(),
            reviews,
            quantity: 1,
            product,
        })
    }

    async fn all_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    async fn size_names(
        &self,
        variations: &[product_variation::Model],
    ) -> Result<HashMap<Uuid, String>, ServiceError> {
        let ids: HashSet<Uuid> = variations.iter().map(|v| v.size_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(size::Entity::find()
            .filter(size::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect())
    }

    async fn cards(&self, products: Vec<product::Model>) -> Result<Vec<ProductCard>, ServiceError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let variations = product_variation::Entity::find()
            .filter(product_variation::Column::ProductId.is_in(ids))
            .order_by_asc(product_variation::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(products
            .into_iter()
            .map(|p| {
                let featured = p.featured(&variations);
                ProductCard {
                    id: p.id,
                    base_price: p.base_price(),
                    price: featured.map(|v| v.price_without()),
                    price_after: featured.and_then(|v| v.price_after()),
                    on_sale: p.on_sale(&variations),
                    is_active_now: p.is_active_now(&variations),
                    image_url: featured
                        .and_then(|v| v.image_url(p.base_image_url.as_deref()))
                        .or_else(|| p.base_image_url.clone()),
                    featured_variation: featured.map(|v| v.slug.clone()),
                    name: p.name,
                    slug: p.slug,
                }
            })
            .collect())
    }
}

#[async_trait]
impl CatalogLookup for ProductCatalogService {
    async fn find_variation(
        &self,
        id: Uuid,
    ) -> Result<Option<product_variation::Model>, ServiceError> {
        Ok(product_variation::Entity::find_by_id(id)
            .one(&*self.db)
            .await?)
    }

    async fn find_variation_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<product_variation::Model>, ServiceError> {
        Ok(product_variation::Entity::find()
            .filter(product_variation::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?)
    }

    async fn variation_summaries(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<VariationSummary>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = product_variation::Entity::find()
            .filter(product_variation::Column::Id.is_in(ids.to_vec()))
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(v, p)| {
                let p = p?;
                Some(VariationSummary {
                    id: v.id,
                    product_id: p.id,
                    image_url: v.image_url(p.base_image_url.as_deref()),
                    product_name: p.name,
                    product_slug: p.slug,
                    slug: v.slug,
                    price_cents: v.price_cents,
                    stock: v.stock,
                })
            })
            .collect())
    }
}

fn variation_view(
    v: &product_variation::Model,
    product: &product::Model,
    size_names: &HashMap<Uuid, String>,
) -> VariationView {
    let size = size_names.get(&v.size_id).cloned().unwrap_or_default();
    VariationView {
        id: v.id,
        slug: v.slug.clone(),
        sku: v.sku.clone(),
        display_name: v.display_name(&product.name, &size),
        color: v.color.clone(),
        size,
        description: v.description.clone(),
        price: v.price_without(),
        price_after: v.price_after(),
        has_discount: v.has_discount(),
        discount: v.discount,
        stock: v.stock,
        featured: v.featured,
        is_active: v.is_active,
        image_url: v.image_url(product.base_image_url.as_deref()),
    }
}

fn variation_products() -> SelectStatement {
    Query::select()
        .column(product_variation::Column::ProductId)
        .from(product_variation::Entity)
        .to_owned()
}

fn order_listing(select: Select<product::Entity>, sorting: Option<Sorting>) -> Select<product::Entity> {
    match sorting {
        Some(Sorting::Latest) => select
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id),
        _ => select
            .order_by_asc(product::Column::Name)
            .order_by_asc(product::Column::Id),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required_name(raw: &str, max: usize) -> Result<String, ServiceError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > max {
        return Err(ServiceError::ValidationError(format!(
            "name must be between 1 and {} characters",
            max
        )));
    }
    Ok(name.to_string())
}

async fn unique_category_slug<C: ConnectionTrait>(db: &C, name: &str) -> Result<String, ServiceError> {
    let base = slug_base(name)?;
    let mut attempt = 1;
    loop {
        let candidate = slug_candidate(&base, attempt);
        let taken = category::Entity::find()
            .filter(category::Column::Slug.eq(candidate.as_str()))
            .count(db)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

async fn unique_product_slug<C: ConnectionTrait>(db: &C, name: &str) -> Result<String, ServiceError> {
    let base = slug_base(name)?;
    let mut attempt = 1;
    loop {
        let candidate = slug_candidate(&base, attempt);
        let taken = product::Entity::find()
            .filter(product::Column::Slug.eq(candidate.as_str()))
            .count(db)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

fn slug_base(name: &str) -> Result<String, ServiceError> {
    let base = slugify(name);
    if base.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "'{}' does not produce a usable slug",
            name
        )));
    }
    Ok(base)
}

async fn ensure_unique_combination<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    color: &str,
    size_id: Uuid,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut select = product_variation::Entity::find()
        .filter(product_variation::Column::ProductId.eq(product_id))
        .filter(product_variation::Column::Color.eq(color))
        .filter(product_variation::Column::SizeId.eq(size_id));
    if let Some(id) = except {
        select = select.filter(product_variation::Column::Id.ne(id));
    }
    if select.count(db).await? > 0 {
        return Err(ServiceError::ValidationError(
            "A variation with this color and size already exists for the product".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_unique_sku<C: ConnectionTrait>(
    db: &C,
    sku: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut select =
        product_variation::Entity::find().filter(product_variation::Column::Sku.eq(sku));
    if let Some(id) = except {
        select = select.filter(product_variation::Column::Id.ne(id));
    }
    if select.count(db).await? > 0 {
        return Err(ServiceError::ValidationError(format!(
            "SKU {} is already in use",
            sku
        )));
    }
    Ok(())
}

const LIKE_ESCAPE: char = '|';

/// Case-insensitive substring match with `%` and `_` taken literally
fn contains_pattern(needle: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape(LIKE_ESCAPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{QueryStatementWriter, SqliteQueryBuilder};

    #[test]
    fn search_pattern_escapes_wildcards() {
        let sql = Query::select()
            .column(product::Column::Name)
            .from(product::Entity)
            .and_where(Expr::col(product::Column::Name).like(contains_pattern("50%_Off")))
            .to_string(SqliteQueryBuilder);
        assert!(sql.contains("LIKE '%50|%|_off%' ESCAPE '|'"), "{}", sql);
    }

    #[test]
    fn page_resolution_is_forgiving() {
        let p = PageInfo::resolve(None, 12, 5);
        assert_eq!((p.number, p.num_pages), (1, 3));
        assert!(p.has_next && !p.has_previous);

        assert_eq!(PageInfo::resolve(Some("abc"), 12, 5).number, 1);
        assert_eq!(PageInfo::resolve(Some("0"), 12, 5).number, 1);
        assert_eq!(PageInfo::resolve(Some("-4"), 12, 5).number, 1);
        assert_eq!(PageInfo::resolve(Some("2"), 12, 5).number, 2);

        let last = PageInfo::resolve(Some("99"), 12, 5);
        assert_eq!(last.number, 3);
        assert!(!last.has_next && last.has_previous);
    }

    #[test]
    fn empty_listing_still_has_one_page() {
        let p = PageInfo::resolve(Some("3"), 0, 5);
        assert_eq!((p.number, p.num_pages, p.total_items), (1, 1, 0));
    }

    #[test]
    fn sorting_values() {
        assert_eq!(Sorting::parse(Some("latest")), Some(Sorting::Latest));
        assert_eq!(Sorting::parse(Some("alpha")), Some(Sorting::Alpha));
        assert_eq!(Sorting::parse(Some("on_sale")), Some(Sorting::OnSale));
        assert_eq!(Sorting::parse(Some("price")), None);
        assert_eq!(Sorting::parse(None), None);
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(required_name("  XL ", 10).unwrap(), "XL");
        assert!(required_name("   ", 10).is_err());
        assert!(required_name("ExtraExtraLarge", 10).is_err());
    }
}
