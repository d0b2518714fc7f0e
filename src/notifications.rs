//! Customer notifications sent after checkout.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::entities::{order, user};
use crate::errors::ServiceError;
use crate::models::money::cents_to_decimal;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Confirms a freshly placed order to its customer
    async fn order_created(
        &self,
        user: &user::Model,
        order: &order::Model,
    ) -> Result<(), ServiceError>;
}

/// Writes notifications to the log instead of delivering them
pub struct LogNotifier {
    from_email: String,
}

impl LogNotifier {
    pub fn new(from_email: impl Into<String>) -> Self {
        Self {
            from_email: from_email.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_created(
        &self,
        user: &user::Model,
        order: &order::Model,
    ) -> Result<(), ServiceError> {
        info!(
            from = %self.from_email,
            to = %user.email,
            order_id = %order.id,
            total = %cents_to_decimal(order.total_cents),
            "Order confirmation: thank you for shopping with us, {}",
            user.first_name
        );
        Ok(())
    }
}

/// Keeps every notification in memory; used by tests to assert delivery
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, uuid::Uuid)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `(recipient email, order id)` pairs in send order
    pub fn sent(&self) -> Vec<(String, uuid::Uuid)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn order_created(
        &self,
        user: &user::Model,
        order: &order::Model,
    ) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .map_err(|_| ServiceError::InternalError("notification log poisoned".into()))?
            .push((user.email.clone(), order.id));
        Ok(())
    }
}
