use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use common::{
    env_config::PriceCatalog,
    error::{AppError, Res},
    stripe::{IntentParams, PaymentProcessor},
};

use crate::{
    dtos::pay::{BookingRequest, CustomerDetails, PaymentIntentResponse},
    models::pricing::{Quote, format_major, to_minor_units},
};

/// Service label stored on every intent.
pub const SERVICE_NAME: &str = "Pool Compliance Inspection";

/// When the metadata snapshot was taken.
#[derive(Debug, Clone, Copy)]
pub enum Stamp {
    Created(DateTime<Utc>),
    Updated(DateTime<Utc>),
}

/// Checks the client-echoed amount and returns it in minor units.
pub fn validate(req: &BookingRequest) -> Res<i64> {
    req.amount
        .and_then(to_minor_units)
        .filter(|minor| *minor > 0)
        .ok_or(AppError::InvalidAmount)
}

/// Flattens customer details and pricing into processor metadata.
///
/// Absent customer fields become empty strings so every intent has the
/// same set of keys. A created intent carries `timestamp` and `updatedAt`;
/// an update refreshes `updatedAt` only.
pub fn build_metadata(
    details: Option<&CustomerDetails>,
    quote: &Quote,
    stamp: Stamp,
) -> HashMap<String, String> {
    let empty = CustomerDetails::default();
    let d = details.unwrap_or(&empty);
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    let mut metadata: HashMap<String, String> = [
        ("service", SERVICE_NAME.to_string()),
        ("firstName", text(&d.first_name)),
        ("lastName", text(&d.last_name)),
        ("email", text(&d.email)),
        ("phone", text(&d.phone)),
        ("address", text(&d.address)),
        ("suburb", text(&d.suburb)),
        ("postcode", text(&d.postcode)),
        ("preferredDate", text(&d.preferred_date)),
        ("notes", text(&d.notes)),
        (
            "includeCprSign",
            if quote.include_cpr_sign { "yes" } else { "no" }.to_string(),
        ),
        ("baseAmount", format_major(quote.base)),
        ("cprSignAmount", format_major(quote.cpr_sign)),
        ("totalAmount", format_major(quote.total)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    // creates stamp both keys; updates leave `timestamp` to the processor's
    // metadata merge, sending it blank would delete it
    let stamp_keys: &[&str] = match stamp {
        Stamp::Created(_) => &["timestamp", "updatedAt"],
        Stamp::Updated(_) => &["updatedAt"],
    };
    let (Stamp::Created(at) | Stamp::Updated(at)) = stamp;
    let at = at.to_rfc3339_opts(SecondsFormat::Millis, true);
    for key in stamp_keys {
        metadata.insert(key.to_string(), at.clone());
    }

    metadata
}

/// Creates a new intent, or updates the one named by `paymentIntentId`.
///
/// Validation happens before any remote call. Exactly one processor call is
/// made, bounded by `budget`. When the budget runs out the call is abandoned
/// and `AppError::Timeout` is returned; the processor may still have applied
/// it, so the caller must treat the outcome as unknown.
///
/// Two updates for the same id are not ordered here: whichever the processor
/// applies last wins.
pub async fn create_or_update_intent(
    processor: &dyn PaymentProcessor,
    catalog: &PriceCatalog,
    budget: Duration,
    req: &BookingRequest,
) -> Res<PaymentIntentResponse> {
    let client_amount = validate(req)?;
    let quote = Quote::from_catalog(catalog, req.includes_cpr_sign());

    if client_amount != quote.total {
        log::warn!(
            "Client amount {} differs from quoted total {}, charging the quote",
            format_major(client_amount),
            format_major(quote.total)
        );
    }
    log::info!(
        "Payment calculation: base={} cpr_sign={} total={}",
        format_major(quote.base),
        format_major(quote.cpr_sign),
        format_major(quote.total)
    );

    let now = Utc::now();
    let call = async {
        match req.intent_id() {
            Some(id) => {
                let params = IntentParams {
                    amount_minor: quote.total,
                    metadata: build_metadata(
                        req.customer_details.as_ref(),
                        &quote,
                        Stamp::Updated(now),
                    ),
                };
                processor.update_intent(id, params).await
            }
            None => {
                let params = IntentParams {
                    amount_minor: quote.total,
                    metadata: build_metadata(
                        req.customer_details.as_ref(),
                        &quote,
                        Stamp::Created(now),
                    ),
                };
                processor.create_intent(params).await
            }
        }
    };

    let handle = tokio::time::timeout(budget, call)
        .await
        .map_err(|_| AppError::Timeout)??;

    log::info!("Payment intent ready: {}", handle.id);

    Ok(PaymentIntentResponse {
        client_secret: handle.client_secret,
        payment_intent_id: handle.id,
    })
}
