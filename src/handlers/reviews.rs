use axum::{
    extract::{Path, State},
    response::Response,
    Form,
};

use super::common::redirect;
use crate::{
    auth::MaybeUser, errors::ServiceError, models::forms::ReviewForm, AppState,
};

/// Stores a review and returns to the product page
pub async fn submit_review(
    State(state): State<AppState>,
    MaybeUser(reviewer): MaybeUser,
    Path(slug): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Result<Response, ServiceError> {
    state
        .services
        .reviews
        .submit(&slug, reviewer.as_ref(), &form)
        .await?;
    Ok(redirect(&format!("/{}/", slug)))
}
