use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::cart::CartLine,
    services::commerce::product_catalog_service::CatalogLookup,
    session::{SessionData, SessionKey, SessionStore},
};

pub const MIN_ADD_QUANTITY: i64 = 1;
pub const MAX_ADD_QUANTITY: i64 = 10;

/// Quantity selector on the product page. Anything missing, unparsable or
/// outside 1..=10 falls back to a quantity of one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuantityQuery {
    pub quantity: Option<String>,
}

impl QuantityQuery {
    pub fn quantity(&self) -> i64 {
        self.quantity
            .as_deref()
            .and_then(|q| q.trim().parse::<i64>().ok())
            .filter(|q| (MIN_ADD_QUANTITY..=MAX_ADD_QUANTITY).contains(q))
            .unwrap_or(MIN_ADD_QUANTITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    Increment,
    Decrement,
}

impl FromStr for CartAction {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "increment" => Ok(CartAction::Increment),
            "decrement" => Ok(CartAction::Decrement),
            other => Err(ServiceError::NotFound(format!(
                "Unknown cart action {}",
                other
            ))),
        }
    }
}

/// The cart page payload
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub length: i64,
    pub total_cost: Decimal,
}

/// Binds the session cart to the session store and the catalog
#[derive(Clone)]
pub struct CartService {
    sessions: Arc<dyn SessionStore>,
    catalog: Arc<dyn CatalogLookup>,
}

impl CartService {
    pub fn new(sessions: Arc<dyn SessionStore>, catalog: Arc<dyn CatalogLookup>) -> Self {
        Self { sessions, catalog }
    }

    pub async fn load(&self, key: &SessionKey) -> Result<SessionData, ServiceError> {
        self.sessions.load(key).await
    }

    /// Current cart enriched with live catalog data
    pub async fn view(&self, key: &SessionKey) -> Result<CartView, ServiceError> {
        let session = self.sessions.load(key).await?;
        let summaries = self
            .catalog
            .variation_summaries(&session.cart.variation_ids())
            .await?;
        Ok(CartView {
            items: session.cart.hydrate(&summaries),
            length: session.cart.len(),
            total_cost: session.cart.total_cost(),
        })
    }

    /// Sets the quantity of the variation at `slug`
    #[instrument(skip(self, key))]
    pub async fn add_by_slug(
        &self,
        key: &SessionKey,
        slug: &str,
        quantity: i64,
    ) -> Result<(), ServiceError> {
        let variation = self
            .catalog
            .find_variation_by_slug(slug)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variation {} not found", slug)))?;

        let mut session = self.sessions.load(key).await?;
        if let Err(e) = session.cart.add(&variation, quantity, true) {
            warn!(variation_id = %variation.id, quantity, "Add to cart rejected: {}", e);
            return Err(e);
        }
        self.persist(key, &session).await?;

        info!(variation_id = %variation.id, quantity, "Cart quantity set");
        Ok(())
    }

    /// Steps a cart entry up or down by one. Entries not in the cart are a 404.
    #[instrument(skip(self, key))]
    pub async fn update(
        &self,
        key: &SessionKey,
        variation_id: Uuid,
        action: CartAction,
    ) -> Result<(), ServiceError> {
        let variation = self
            .catalog
            .find_variation(variation_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variation {} not found", variation_id))
            })?;

        let mut session = self.sessions.load(key).await?;
        if session.cart.get(variation_id).is_none() {
            return Err(ServiceError::NotFound(format!(
                "Variation {} is not in the cart",
                variation_id
            )));
        }

        let delta = match action {
            CartAction::Increment => 1,
            CartAction::Decrement => -1,
        };
        if let Err(e) = session.cart.add(&variation, delta, false) {
            warn!(%variation_id, ?action, "Cart update rejected: {}", e);
            return Err(e);
        }
        self.persist(key, &session).await?;

        debug!(%variation_id, ?action, "Cart entry updated");
        Ok(())
    }

    #[instrument(skip(self, key))]
    pub async fn reset(&self, key: &SessionKey) -> Result<(), ServiceError> {
        let mut session = self.sessions.load(key).await?;
        session.cart.clear();
        self.persist(key, &session).await?;
        info!("Cart cleared");
        Ok(())
    }

    async fn persist(&self, key: &SessionKey, session: &SessionData) -> Result<(), ServiceError> {
        if session.cart.is_modified() {
            self.sessions.save(key, session).await?;
        }
        Ok(())
    }
}
