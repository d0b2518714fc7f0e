use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::ServiceError;
use crate::services::commerce::product_catalog_service::LayoutContext;
use crate::session::SessionKey;
use crate::AppState;

/// `302 Found` to `location`
pub fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => ServiceError::InternalError(format!("unencodable redirect target {}", location))
            .into_response(),
    }
}

/// A storefront page: the shared layout data plus the page's own content
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub layout: LayoutContext,
    #[serde(flatten)]
    pub content: T,
}

/// Wraps `content` with the layout context for the visitor's session
pub async fn page<T: Serialize>(
    state: &AppState,
    key: &SessionKey,
    content: T,
) -> Result<Json<Page<T>>, ServiceError> {
    let session = state.services.cart.load(key).await?;
    let layout = state.services.catalog.layout(&session.cart).await?;
    Ok(Json(Page { layout, content }))
}
