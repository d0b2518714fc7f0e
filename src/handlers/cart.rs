use axum::{
    extract::{Path, Query, State},
    response::Response,
    Extension, Json,
};
use uuid::Uuid;

use super::common::{page, redirect, Page};
use crate::{
    errors::ServiceError,
    services::commerce::{CartAction, CartView, QuantityQuery},
    session::SessionKey,
    AppState,
};

pub const CART_PATH: &str = "/cart/";

pub async fn cart_page(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
) -> Result<Json<Page<CartView>>, ServiceError> {
    let cart = state.services.cart.view(&key).await?;
    page(&state, &key, cart).await
}

/// Puts `quantity` of the variation at `slug` in the cart, replacing any
/// quantity already there
pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
    Path(slug): Path<String>,
    Query(query): Query<QuantityQuery>,
) -> Result<Response, ServiceError> {
    state
        .services
        .cart
        .add_by_slug(&key, &slug, query.quantity())
        .await?;
    Ok(redirect(CART_PATH))
}

pub async fn update_cart(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Response, ServiceError> {
    let variation_id = Uuid::parse_str(&id)
        .map_err(|_| ServiceError::NotFound(format!("Variation {} not found", id)))?;
    let action: CartAction = action.parse()?;
    state
        .services
        .cart
        .update(&key, variation_id, action)
        .await?;
    Ok(redirect(CART_PATH))
}

pub async fn reset_cart(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
) -> Result<Response, ServiceError> {
    state.services.cart.reset(&key).await?;
    Ok(redirect(CART_PATH))
}
