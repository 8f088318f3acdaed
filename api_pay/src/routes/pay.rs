use std::sync::Arc;

use actix_web::{HttpResponse, Responder, get, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::{Success, read_body},
    stripe::PaymentProcessor,
};

use crate::{
    dtos::pay::{BookingRequest, CatalogResponse},
    models::pricing::to_major_units,
    services,
};

/// Creates a payment intent for a booking, or updates the one the checkout
/// already holds.
///
/// # Input
/// - `body`: JSON payload:
///   - `amount`: Total shown to the customer, in dollars (must be > 0)
///   - `customerDetails`: (Optional) Contact and booking details
///   - `paymentIntentId`: (Optional) Intent returned by an earlier call
///   - `includeCprSign`: (Optional) Adds the CPR sign to the booking
///
/// # Output
/// - Success: `{ clientSecret, paymentIntentId }`
/// - Error: 400 for a bad body or amount, 413 for a body over the
///   configured limit, 500 when Stripe rejects the call,
///   504 when Stripe does not answer in time
///
/// The charged total always comes from the server-side catalog.
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/create-payment-intent', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({
///     amount: 240,
///     includeCprSign: true,
///     paymentIntentId: existingId, // omit on the first call
///     customerDetails: { firstName, lastName, email, phone, address,
///                        suburb, postcode, preferredDate, notes },
///   })
/// });
/// const { clientSecret, paymentIntentId } = await response.json();
/// ```
pub async fn post_payment_intent(
    payload: web::Payload,
    processor: web::Data<dyn PaymentProcessor>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let body = read_body(payload, config.max_body_bytes).await?;
    let req = BookingRequest::parse(&body)?;
    log::info!("Payment intent request: {}", req.summary());

    let intent = services::pay::create_or_update_intent(
        processor.get_ref(),
        &config.catalog,
        config.processor_timeout,
        &req,
    )
    .await?;

    Success::ok(intent)
}

/// CORS preflight. The CORS headers are added by the surrounding middleware.
pub async fn preflight() -> Res<impl Responder> {
    Success::no_content()
}

pub async fn method_not_allowed() -> Res<HttpResponse> {
    Err(AppError::MethodNotAllowed)
}

/// Current prices, so the checkout page shows what will be charged.
#[get("/catalog")]
pub async fn get_catalog(config: web::Data<Arc<Config>>) -> Res<impl Responder> {
    Success::ok(CatalogResponse {
        currency: "AUD".to_string(),
        base_amount: to_major_units(config.catalog.base),
        cpr_sign_amount: to_major_units(config.catalog.cpr_sign),
    })
}
