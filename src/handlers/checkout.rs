use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use tracing::info;

use super::common::{page, redirect};
use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    models::forms::ShippingForm,
    services::{
        commerce::{CheckoutPage, PlaceOrderOutcome},
        payments::{PaymentCallbackQuery, PaymentReceipt},
    },
    session::SessionKey,
    AppState,
};

pub const SHOP_PATH: &str = "/shop";
pub const PAY_PATH: &str = "/checkout/pay/";

/// Shipping form for a signed-in customer; an empty cart goes back to the shop
pub async fn checkout_page(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
    CurrentUser(customer): CurrentUser,
) -> Result<Response, ServiceError> {
    match state.services.checkout.start(&customer, &key).await? {
        CheckoutPage::EmptyCart => Ok(redirect(SHOP_PATH)),
        form => Ok(page(&state, &key, form).await?.into_response()),
    }
}

pub async fn place_order(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
    CurrentUser(customer): CurrentUser,
    Form(form): Form<ShippingForm>,
) -> Result<Response, ServiceError> {
    match state
        .services
        .checkout
        .place_order(&customer, &key, &form)
        .await?
    {
        PlaceOrderOutcome::EmptyCart => Ok(redirect(SHOP_PATH)),
        PlaceOrderOutcome::Placed(order) => {
            info!(order_id = %order.id, "Order placed, continuing to payment");
            Ok(redirect(PAY_PATH))
        }
    }
}

/// Sends the customer to the payment provider's hosted page
pub async fn pay(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
) -> Result<Response, ServiceError> {
    let handle = state.services.payments.begin_payment(&key).await?;
    Ok(redirect(&handle.url))
}

pub async fn payment_success(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
    Query(query): Query<PaymentCallbackQuery>,
) -> Result<Json<PaymentReceipt>, ServiceError> {
    let receipt = state
        .services
        .payments
        .finish_checkout(&key, &query)
        .await?;
    Ok(Json(receipt))
}

/// The customer backed out at the provider; the order stays pending
pub async fn payment_cancel() -> Response {
    redirect(PAY_PATH)
}
