use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{product, review, user};
use crate::errors::ServiceError;
use crate::models::forms::{validate_review_form, ReviewForm};

/// A review as shown on the product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewView {
    pub id: Uuid,
    pub rating: i32,
    pub review: String,
    pub username: Option<String>,
    pub from_user: bool,
    pub created_at: DateTime<Utc>,
}

/// Product reviews from signed-in and anonymous customers
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Validates and stores a review for the product at `product_slug`.
    /// Signed-in reviewers are linked to the review; the anonymous name and
    /// email are still stored but no longer used for display.
    #[instrument(skip(self, reviewer, form), fields(reviewer = ?reviewer.map(|u| u.id)))]
    pub async fn submit(
        &self,
        product_slug: &str,
        reviewer: Option<&user::Model>,
        form: &ReviewForm,
    ) -> Result<review::Model, ServiceError> {
        let product = product::Entity::find()
            .filter(product::Column::Slug.eq(product_slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_slug)))?;

        let valid = validate_review_form(form)?;
        let now = Utc::now();

        let saved = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            user_id: Set(reviewer.map(|u| u.id)),
            rating: Set(valid.rating),
            review: Set(valid.review),
            name: Set(valid.name),
            email: Set(valid.email),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(review_id = %saved.id, product = %product.slug, rating = saved.rating, "Review submitted");
        Ok(saved)
    }

    /// Reviews of a product, newest first
    pub async fn list_for_product(&self, product_id: Uuid) -> Result<Vec<ReviewView>, ServiceError> {
        review_views(&self.db, product_id).await
    }
}

pub(crate) async fn review_views(
    db: &DatabaseConnection,
    product_id: Uuid,
) -> Result<Vec<ReviewView>, ServiceError> {
    let reviews = review::Entity::find()
        .filter(review::Column::ProductId.eq(product_id))
        .order_by_desc(review::Column::CreatedAt)
        .all(db)
        .await?;

    let user_ids: Vec<Uuid> = reviews.iter().filter_map(|r| r.user_id).collect();
    let users: HashMap<Uuid, user::Model> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };

    Ok(reviews
        .into_iter()
        .map(|r| {
            let author = r.user_id.and_then(|id| users.get(&id));
            ReviewView {
                id: r.id,
                rating: r.rating,
                username: r.username(author),
                from_user: r.from_user(),
                created_at: r.created_at,
                review: r.review,
            }
        })
        .collect())
}
