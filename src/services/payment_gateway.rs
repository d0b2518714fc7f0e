//! Hosted checkout providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// One line on the provider's checkout page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub unit_amount_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSessionRequest {
    pub order_id: Uuid,
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutSessionRequest {
    pub fn total_cents(&self) -> i64 {
        self.line_items
            .iter()
            .map(|l| l.unit_amount_cents * l.quantity)
            .sum()
    }

    /// Form encoding of the request using bracketed keys
    /// (`line_items[0][price_data][unit_amount]=...`)
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("metadata[order_id]".to_string(), self.order_id.to_string()),
        ];
        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            form.push((
                format!("{}[price_data][currency]", prefix),
                self.currency.clone(),
            ));
            form.push((
                format!("{}[price_data][product_data][name]", prefix),
                item.name.clone(),
            ));
            if let Some(description) = &item.description {
                form.push((
                    format!("{}[price_data][product_data][description]", prefix),
                    description.clone(),
                ));
            }
            for (j, image) in item.images.iter().enumerate() {
                form.push((
                    format!("{}[price_data][product_data][images][{}]", prefix, j),
                    image.clone(),
                ));
            }
            form.push((
                format!("{}[price_data][unit_amount]", prefix),
                item.unit_amount_cents.to_string(),
            ));
            form.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
        }
        form
    }
}

/// Where to send the customer to pay
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckoutSessionHandle {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, ServiceError>;
}

/// Stripe Checkout Sessions over its form-encoded REST API
#[derive(Clone)]
pub struct StripeCheckoutGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeCheckoutGateway {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("payment client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let key = cfg.payment_secret_key.clone().ok_or_else(|| {
            ServiceError::InternalError("payment_secret_key is not configured".to_string())
        })?;
        Self::new(cfg.payment_api_base.clone(), key, cfg.payment_timeout())
    }
}

#[async_trait]
impl PaymentGateway for StripeCheckoutGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, ServiceError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&request.to_form())
            .send()
            .await
            .map_err(|e| {
                error!("Payment provider request failed: {}", e);
                ServiceError::ExternalServiceError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Payment provider rejected checkout session: {}", body);
            return Err(ServiceError::ExternalServiceError(format!(
                "provider returned {}",
                status
            )));
        }

        let handle = response
            .json::<CheckoutSessionHandle>()
            .await
            .map_err(|e| {
                error!("Unreadable payment provider response: {}", e);
                ServiceError::ExternalServiceError(e.to_string())
            })?;
        info!(session_id = %handle.id, "Created checkout session");
        Ok(handle)
    }
}

/// Development stand-in that skips the provider and points straight at the
/// success callback
#[derive(Debug, Clone, Default)]
pub struct LocalGateway;

#[async_trait]
impl PaymentGateway for LocalGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, ServiceError> {
        info!(order_id = %request.order_id, total_cents = request.total_cents(), "Local payment session");
        Ok(CheckoutSessionHandle {
            id: format!("local_{}", request.order_id.simple()),
            url: request.success_url.clone(),
        })
    }
}
