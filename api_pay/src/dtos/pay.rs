use std::fmt;

use common::error::{AppError, Res};
use serde::{Deserialize, Serialize};

/// Customer details typed into the checkout form. Every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub suburb: Option<String>,
    pub postcode: Option<String>,
    pub preferred_date: Option<String>,
    pub notes: Option<String>,
}

/// Body of a create/update call from the checkout UI.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Client-echoed total in major units (dollars).
    pub amount: Option<f64>,
    pub customer_details: Option<CustomerDetails>,
    /// Intent created earlier in the same checkout session.
    pub payment_intent_id: Option<String>,
    pub include_cpr_sign: Option<bool>,
}

impl BookingRequest {
    /// Parses a raw request body. A blank body reads as `{}`; JSON that is
    /// not an object (`42`, `null`, `[]`) is an invalid body.
    pub fn parse(body: &[u8]) -> Res<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| {
            log::debug!("Rejected request body: {}", e);
            AppError::InvalidRequestBody
        })
    }

    /// The intent id, if the client sent a non-blank one.
    pub fn intent_id(&self) -> Option<&str> {
        self.payment_intent_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn includes_cpr_sign(&self) -> bool {
        self.include_cpr_sign.unwrap_or(false)
    }

    /// Log-safe view of the request. Names, contact details and notes are left out.
    pub fn summary(&self) -> BookingSummary<'_> {
        BookingSummary(self)
    }
}

pub struct BookingSummary<'a>(&'a BookingRequest);

impl fmt::Display for BookingSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let req = self.0;
        let details = req.customer_details.as_ref();
        write!(
            f,
            "amount={} intent={} cpr_sign={} suburb={} postcode={} preferred_date={}",
            req.amount.map_or("-".to_string(), |a| a.to_string()),
            req.intent_id().unwrap_or("-"),
            req.includes_cpr_sign(),
            or_dash(details.and_then(|d| d.suburb.as_deref())),
            or_dash(details.and_then(|d| d.postcode.as_deref())),
            or_dash(details.and_then(|d| d.preferred_date.as_deref())),
        )
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

/// Prices shown by the checkout UI, in major units.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub currency: String,
    pub base_amount: f64,
    pub cpr_sign_amount: f64,
}
