use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{order, order_item, payment, product, product_variation, OrderStatus},
    errors::ServiceError,
    services::payment_gateway::{
        CheckoutSessionHandle, CheckoutSessionRequest, LineItem, PaymentGateway,
    },
    session::{SessionKey, SessionStore},
};

pub const SHIPPING_LINE_NAME: &str = "Shipping Fee";
pub const SHIPPING_LINE_DESCRIPTION: &str = "Standard delivery";

/// Query string of the provider's success redirect
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentCallbackQuery {
    pub order_id: Option<String>,
}

/// Result of the success callback
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub total: Decimal,
    pub payment_id: Uuid,
    /// The payment had already been recorded by an earlier callback
    pub already_recorded: bool,
}

impl PaymentReceipt {
    fn recorded(order: &order::Model, payment: &payment::Model) -> Self {
        Self {
            order_id: order.id,
            status: order.status,
            is_paid: order.is_paid,
            total: order.total(),
            payment_id: payment.id,
            already_recorded: true,
        }
    }
}

/// Moves a placed order through the hosted payment page and records the
/// payment when the provider reports success.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    sessions: Arc<dyn SessionStore>,
    gateway: Arc<dyn PaymentGateway>,
    config: Arc<AppConfig>,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sessions: Arc<dyn SessionStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            sessions,
            gateway,
            config,
        }
    }

    /// Opens a provider checkout session for the session's pending order
    #[instrument(skip(self, key))]
    pub async fn begin_payment(&self, key: &SessionKey) -> Result<CheckoutSessionHandle, ServiceError> {
        let session = self.sessions.load(key).await?;
        let pending = session
            .order
            .ok_or_else(|| ServiceError::NotFound("No order is awaiting payment".to_string()))?;

        let order = order::Entity::find_by_id(pending.order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", pending.order_id))
            })?;
        if order.is_paid {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is already paid",
                order.id
            )));
        }

        let request = self.session_request(&order).await?;
        let handle = self.gateway.create_checkout_session(&request).await?;
        info!(order_id = %order.id, session_id = %handle.id, "Redirecting to payment provider");
        Ok(handle)
    }

    /// Line items for `order`: one per order item at its snapshot unit
    /// price, plus the flat shipping fee
    pub async fn session_request(
        &self,
        order: &order::Model,
    ) -> Result<CheckoutSessionRequest, ServiceError> {
        let rows = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .find_also_related(product_variation::Entity)
            .all(&*self.db)
            .await?;

        let product_ids: Vec<Uuid> = rows
            .iter()
            .filter_map(|(_, v)| v.as_ref().map(|v| v.product_id))
            .collect();
        let products: HashMap<Uuid, product::Model> = if product_ids.is_empty() {
            HashMap::new()
        } else {
            product::Entity::find()
                .filter(product::Column::Id.is_in(product_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        let mut line_items = Vec::with_capacity(rows.len() + 1);
        for (item, variation) in rows {
            let variation = variation.ok_or_else(|| {
                ServiceError::NotFound(format!("Variation {} not found", item.variation_id))
            })?;
            let product = products.get(&variation.product_id);
            line_items.push(LineItem {
                name: product
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| variation.sku.clone()),
                description: None,
                images: variation
                    .image_url(product.and_then(|p| p.base_image_url.as_deref()))
                    .into_iter()
                    .collect(),
                unit_amount_cents: item.unit_price_cents(),
                quantity: i64::from(item.quantity),
            });
        }
        line_items.push(LineItem {
            name: SHIPPING_LINE_NAME.to_string(),
            description: Some(SHIPPING_LINE_DESCRIPTION.to_string()),
            images: Vec::new(),
            unit_amount_cents: self.config.shipping_fee_cents,
            quantity: 1,
        });

        let base = self.config.public_base_url.trim_end_matches('/');
        Ok(CheckoutSessionRequest {
            order_id: order.id,
            currency: self.config.currency.clone(),
            line_items,
            success_url: format!("{}/checkout/pay/success?order_id={}", base, order.id),
            cancel_url: format!("{}/checkout/pay/cancel?order_id={}", base, order.id),
        })
    }

    /// Success callback: resolves the order from the query string, falling
    /// back to the session's pending order, records the payment and clears
    /// the pending marker. Only the session holding the pending marker can
    /// confirm an unpaid order; any other caller gets the receipt of an
    /// already recorded payment or NotFound.
    #[instrument(skip(self, key))]
    pub async fn finish_checkout(
        &self,
        key: &SessionKey,
        query: &PaymentCallbackQuery,
    ) -> Result<PaymentReceipt, ServiceError> {
        let mut session = self.sessions.load(key).await?;
        let pending = session.order.map(|p| p.order_id);

        let order_id = match query.order_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Uuid::parse_str(raw)
                .map_err(|_| ServiceError::NotFound(format!("Order {} not found", raw)))?,
            None => pending.ok_or_else(|| ServiceError::NotFound("No order to confirm".to_string()))?,
        };

        if pending != Some(order_id) {
            return match self.recorded_receipt(order_id).await? {
                Some(receipt) => Ok(receipt),
                None => {
                    warn!(order_id = %order_id, "Payment confirmation for an order this session did not place");
                    Err(ServiceError::NotFound(format!("Order {} not found", order_id)))
                }
            };
        }

        let receipt = self.complete_payment(order_id).await?;

        session.order = None;
        self.sessions.save(key, &session).await?;
        Ok(receipt)
    }

    /// Receipt of an order whose payment is already on record
    async fn recorded_receipt(&self, order_id: Uuid) -> Result<Option<PaymentReceipt>, ServiceError> {
        let Some(order) = order::Entity::find_by_id(order_id).one(&*self.db).await? else {
            return Ok(None);
        };
        let existing = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order.id))
            .one(&*self.db)
            .await?;
        Ok(existing.map(|p| PaymentReceipt::recorded(&order, &p)))
    }

    /// Marks the order paid, takes the ordered quantities out of stock and
    /// records exactly one payment, all in one transaction. Repeated calls
    /// for an order that already has a payment return it unchanged.
    #[instrument(skip(self))]
    pub async fn complete_payment(&self, order_id: Uuid) -> Result<PaymentReceipt, ServiceError> {
        let txn = self.db.begin().await?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if let Some(existing) = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order.id))
            .one(&txn)
            .await?
        {
            info!(order_id = %order.id, payment_id = %existing.id, "Payment already recorded");
            return Ok(PaymentReceipt::recorded(&order, &existing));
        }

        if !order.status.can_transition_to(OrderStatus::Processing) {
            warn!(order_id = %order.id, status = %order.status, "Payment for order that cannot be processed");
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is {} and cannot be marked paid",
                order.id, order.status
            )));
        }

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&txn)
            .await?;

        let now = Utc::now();
        for item in &items {
            let updated = product_variation::Entity::update_many()
                .col_expr(
                    product_variation::Column::Stock,
                    Expr::col(product_variation::Column::Stock).sub(item.quantity),
                )
                .col_expr(product_variation::Column::UpdatedAt, Expr::value(now))
                .filter(product_variation::Column::Id.eq(item.variation_id))
                .filter(product_variation::Column::Stock.gte(item.quantity))
                .exec(&txn)
                .await?;
            if updated.rows_affected == 0 {
                error!(
                    order_id = %order.id,
                    variation_id = %item.variation_id,
                    quantity = item.quantity,
                    "Not enough stock to fulfil paid order"
                );
                return Err(ServiceError::InsufficientStock(format!(
                    "Variation {} no longer has {} in stock",
                    item.variation_id, item.quantity
                )));
            }

            product_variation::Entity::update_many()
                .col_expr(product_variation::Column::IsActive, Expr::value(false))
                .filter(product_variation::Column::Id.eq(item.variation_id))
                .filter(product_variation::Column::Stock.lte(0))
                .exec(&txn)
                .await?;
        }

        let total = order.total();
        let total_cents = order.total_cents;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Processing);
        active.is_paid = Set(true);
        active.updated_at = Set(now);
        let order = active.update(&txn).await?;

        let payment = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            total_cents: Set(total_cents),
            provider_reference: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(order_id = %order.id, payment_id = %payment.id, items = items.len(), "Payment recorded");

        Ok(PaymentReceipt {
            order_id: order.id,
            status: order.status,
            is_paid: order.is_paid,
            total,
            payment_id: payment.id,
            already_recorded: false,
        })
    }
}
