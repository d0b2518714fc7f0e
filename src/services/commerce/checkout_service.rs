use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{city, order, order_item, product_variation, shipping_info, user, OrderStatus},
    errors::ServiceError,
    models::{
        cart::CartLine,
        forms::{validate_shipping_form, FormErrors, PhoneRegion, ShippingForm, ValidShipping},
        money::cents_to_decimal,
    },
    notifications::Notifier,
    services::commerce::product_catalog_service::CatalogLookup,
    session::{PendingOrder, SessionKey, SessionStore},
};

const UNKNOWN_CITY: &str = "Select a valid choice. That choice is not one of the available choices.";

/// What the checkout page shows
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutPage {
    /// Nothing to check out; the customer is sent back to the shop
    EmptyCart,
    Form {
        form: ShippingForm,
        cities: Vec<city::Model>,
        items: Vec<CartLine>,
        subtotal: Decimal,
        shipping_fee: Decimal,
        total: Decimal,
    },
}

#[derive(Debug, Clone)]
pub enum PlaceOrderOutcome {
    EmptyCart,
    Placed(order::Model),
}

/// Turns the session cart into an order: collects shipping details, writes
/// the order and its items, then hands over to payment.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    sessions: Arc<dyn SessionStore>,
    catalog: Arc<dyn CatalogLookup>,
    notifier: Arc<dyn Notifier>,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sessions: Arc<dyn SessionStore>,
        catalog: Arc<dyn CatalogLookup>,
        notifier: Arc<dyn Notifier>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            sessions,
            catalog,
            notifier,
            config,
        }
    }

    /// The shipping form, prefilled from the customer's last shipping
    /// details or, failing that, from their account.
    #[instrument(skip(self, customer, key), fields(user_id = %customer.id))]
    pub async fn start(
        &self,
        customer: &user::Model,
        key: &SessionKey,
    ) -> Result<CheckoutPage, ServiceError> {
        let session = self.sessions.load(key).await?;
        if session.cart.is_empty() {
            return Ok(CheckoutPage::EmptyCart);
        }

        let form = match self.last_shipping_info(customer.id).await? {
            Some(info) => ShippingForm {
                first_name: info.first_name,
                last_name: info.last_name,
                email: info.email,
                city_id: info.city_id.map(|id| id.to_string()),
                address: info.address,
                postal_code: info.postal_code,
                phone_number: info.phone_number,
            },
            None => ShippingForm {
                first_name: customer.first_name.clone(),
                last_name: customer.last_name.clone(),
                email: customer.email.clone(),
                ..Default::default()
            },
        };

        let summaries = self
            .catalog
            .variation_summaries(&session.cart.variation_ids())
            .await?;
        let subtotal_cents = session.cart.subtotal_cents();

        Ok(CheckoutPage::Form {
            form,
            cities: city::Entity::find()
                .order_by_asc(city::Column::Name)
                .all(&*self.db)
                .await?,
            items: session.cart.hydrate(&summaries),
            subtotal: cents_to_decimal(subtotal_cents),
            shipping_fee: cents_to_decimal(self.config.shipping_fee_cents),
            total: cents_to_decimal(subtotal_cents + self.config.shipping_fee_cents),
        })
    }

    /// Validates the shipping form and writes shipping info, order and order
    /// items in one transaction. On success the cart is emptied and the new
    /// order becomes the session's pending order. On failure nothing changes.
    #[instrument(skip(self, customer, key, form), fields(user_id = %customer.id))]
    pub async fn place_order(
        &self,
        customer: &user::Model,
        key: &SessionKey,
        form: &ShippingForm,
    ) -> Result<PlaceOrderOutcome, ServiceError> {
        let mut session = self.sessions.load(key).await?;
        if session.cart.is_empty() {
            return Ok(PlaceOrderOutcome::EmptyCart);
        }

        let shipping = match self.validate(form).await {
            Ok(valid) => valid,
            Err(errors) => {
                warn!(fields = ?errors.fields(), "Checkout form rejected");
                return Err(errors.into());
            }
        };

        let txn = self.db.begin().await?;

        let ids = session.cart.variation_ids();
        let known = product_variation::Entity::find()
            .filter(product_variation::Column::Id.is_in(ids.clone()))
            .count(&txn)
            .await?;
        if known != ids.len() as u64 {
            return Err(ServiceError::NotFound(
                "A product in the cart is no longer available".to_string(),
            ));
        }

        let now = Utc::now();
        let previous = shipping_info::Entity::find()
            .filter(shipping_info::Column::UserId.eq(customer.id))
            .order_by_desc(shipping_info::Column::UpdatedAt)
            .one(&txn)
            .await?;
        let shipping_info = match previous {
            Some(previous) => {
                let mut active: shipping_info::ActiveModel = previous.into();
                apply_shipping(&mut active, shipping);
                active.updated_at = Set(now);
                active.update(&txn).await?
            }
            None => {
                let mut active = shipping_info::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(customer.id),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                apply_shipping(&mut active, shipping);
                active.insert(&txn).await?
            }
        };

        let total_cents = session.cart.subtotal_cents() + self.config.shipping_fee_cents;
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(customer.id),
            shipping_info_id: Set(shipping_info.id),
            status: Set(OrderStatus::Pending),
            is_paid: Set(false),
            total_cents: Set(total_cents),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for entry in session.cart.entries() {
            let quantity = i32::try_from(entry.quantity).map_err(|_| {
                ServiceError::ValidationError(format!("Quantity {} is too large", entry.quantity))
            })?;
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                variation_id: Set(entry.id),
                quantity: Set(quantity),
                total_cents: Set(entry.total_cents()),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        info!(order_id = %order.id, total_cents, items = ids.len(), "Order created");

        if let Err(e) = self.notifier.order_created(customer, &order).await {
            error!(order_id = %order.id, "Order confirmation failed: {}", e);
        }

        session.cart.clear();
        session.order = Some(PendingOrder { order_id: order.id });
        self.sessions.save(key, &session).await?;

        Ok(PlaceOrderOutcome::Placed(order))
    }

    async fn last_shipping_info(
        &self,
        user_id: Uuid,
    ) -> Result<Option<shipping_info::Model>, ServiceError> {
        Ok(shipping_info::Entity::find()
            .filter(shipping_info::Column::UserId.eq(user_id))
            .order_by_desc(shipping_info::Column::UpdatedAt)
            .one(&*self.db)
            .await?)
    }

    /// Field checks plus the city lookup, reported together
    async fn validate(&self, form: &ShippingForm) -> Result<ValidShipping, FormErrors> {
        let region = PhoneRegion::from_code(&self.config.phone_region).unwrap_or_default();
        let city_missing = match form
            .city_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        {
            Some(id) => match city::Entity::find_by_id(id).one(&*self.db).await {
                Ok(found) => found.is_none(),
                Err(e) => {
                    error!("City lookup failed: {}", e);
                    true
                }
            },
            None => false,
        };

        match validate_shipping_form(form, region) {
            Ok(valid) if !city_missing => Ok(valid),
            Ok(_) => {
                let mut errors = FormErrors::default();
                errors.add("city_id", UNKNOWN_CITY);
                Err(errors)
            }
            Err(mut errors) => {
                if city_missing {
                    errors.add("city_id", UNKNOWN_CITY);
                }
                Err(errors)
            }
        }
    }
}

fn apply_shipping(active: &mut shipping_info::ActiveModel, shipping: ValidShipping) {
    active.first_name = Set(shipping.first_name);
    active.last_name = Set(shipping.last_name);
    active.email = Set(shipping.email);
    active.address = Set(shipping.address);
    active.city_id = Set(shipping.city_id);
    active.postal_code = Set(shipping.postal_code);
    active.phone_number = Set(shipping.phone_number);
}
