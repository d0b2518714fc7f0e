use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::common::{page, Page};
use crate::{
    errors::ServiceError,
    services::commerce::{
        product_catalog_service::{HomePage, ProductDetail, ShopPage},
        ShopQuery,
    },
    session::SessionKey,
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    pub variant_slug: Option<String>,
}

pub async fn home(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
) -> Result<Json<Page<HomePage>>, ServiceError> {
    let home = state.services.catalog.home().await?;
    page(&state, &key, home).await
}

/// Catalog listing with filters, search, sorting and pagination
pub async fn shop(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
    Query(query): Query<ShopQuery>,
) -> Result<Json<Page<ShopPage>>, ServiceError> {
    let shop = state.services.catalog.shop(&query).await?;
    page(&state, &key, shop).await
}

pub async fn product_detail(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
    Path(slug): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<Page<ProductDetail>>, ServiceError> {
    let detail = state
        .services
        .catalog
        .product_detail(&slug, query.variant_slug.as_deref())
        .await?;
    page(&state, &key, detail).await
}
