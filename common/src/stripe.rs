use std::collections::HashMap;

use async_trait::async_trait;
use stripe::{
    Client, CreatePaymentIntent, CreatePaymentIntentAutomaticPaymentMethods, Currency,
    PaymentIntent, PaymentIntentId, UpdatePaymentIntent,
};

use crate::error::{AppError, Res};

/// What is sent to the processor for a single intent.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentParams {
    /// Amount in minor units (cents).
    pub amount_minor: i64,
    pub metadata: HashMap<String, String>,
}

/// What the checkout UI needs back to confirm the payment.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentHandle {
    pub id: String,
    pub client_secret: String,
}

/// Remote payment processor holding the intent records.
///
/// The processor is the only source of truth for intents; implementations
/// issue exactly one remote call per method invocation.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a new AUD intent with automatic payment methods enabled.
    async fn create_intent(&self, params: IntentParams) -> Res<IntentHandle>;

    /// Replaces amount and metadata of an existing intent.
    async fn update_intent(&self, id: &str, params: IntentParams) -> Res<IntentHandle>;
}

pub fn create_client(secret_key: &str) -> Client {
    Client::new(secret_key)
}

/// `PaymentProcessor` backed by the Stripe API.
pub struct StripeProcessor {
    client: Client,
}

impl StripeProcessor {
    pub fn new(secret_key: &str) -> Self {
        StripeProcessor {
            client: create_client(secret_key),
        }
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn create_intent(&self, params: IntentParams) -> Res<IntentHandle> {
        let mut create = CreatePaymentIntent::new(params.amount_minor, Currency::AUD);
        create.automatic_payment_methods = Some(CreatePaymentIntentAutomaticPaymentMethods {
            enabled: true,
            allow_redirects: None,
        });
        create.metadata = Some(params.metadata);

        let intent = PaymentIntent::create(&self.client, create)
            .await
            .map_err(AppError::from)?;
        to_handle(intent)
    }

    async fn update_intent(&self, id: &str, params: IntentParams) -> Res<IntentHandle> {
        let intent_id = id.parse::<PaymentIntentId>().map_err(|e| {
            AppError::Processor(format!("Failed to parse payment intent id: {}. {}", id, e))
        })?;

        let update = UpdatePaymentIntent {
            amount: Some(params.amount_minor),
            metadata: Some(params.metadata),
            ..Default::default()
        };

        let intent = PaymentIntent::update(&self.client, &intent_id, update)
            .await
            .map_err(AppError::from)?;
        to_handle(intent)
    }
}

fn to_handle(intent: PaymentIntent) -> Res<IntentHandle> {
    let client_secret = intent.client_secret.ok_or_else(|| {
        AppError::Processor(format!("Payment intent {} has no client secret", intent.id))
    })?;

    Ok(IntentHandle {
        id: intent.id.to_string(),
        client_secret,
    })
}
