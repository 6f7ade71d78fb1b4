//! Payment processor abstraction.
//!
//! Checkouts never move money locally: a provider creates a charge or subscription and returns
//! a redirect URL plus an opaque reference. Local state changes only when a signed webhook
//! confirms the payment (see [`crate::reconciliation`]).
//!
//! - [`http::HttpProvider`]: a hosted-checkout REST gateway
//! - [`dummy::DummyProvider`]: completes nothing by itself; for development and tests

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{config::PaymentConfig, errors::Error};

pub mod dummy;
pub mod http;
pub mod signing;

/// Create a payment provider from configuration
pub fn create_provider(config: PaymentConfig) -> Box<dyn PaymentProvider> {
    match config {
        PaymentConfig::Http(http_config) => Box::new(http::HttpProvider::from(http_config)),
        PaymentConfig::Dummy(dummy_config) => Box::new(dummy::DummyProvider::from(dummy_config)),
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider API error: {0}")]
    ProviderApi(String),

    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
}

impl From<PaymentError> for Error {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::ProviderApi(message) => Error::Upstream {
                service: "Payment processor".to_string(),
                message,
            },
            PaymentError::Declined(message) => Error::BadRequest {
                message: format!("Payment declined: {message}"),
            },
            PaymentError::InvalidData(message) => Error::BadRequest { message },
            PaymentError::InvalidSignature(_) => Error::BadRequest {
                message: "Invalid webhook signature".to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::ProviderApi(err.to_string())
    }
}

/// A one-time hosted checkout
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub amount: Decimal,
    pub description: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChargeCreated {
    pub payment_id: String,
    pub checkout_url: String,
}

/// A recurring plan billed by the processor
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRequest {
    pub plan: String,
    pub amount: Decimal,
    pub interval_days: i64,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscriptionCreated {
    pub subscription_id: String,
    pub checkout_url: String,
}

/// A charge against a saved payment method, no redirect
#[derive(Debug, Clone, Serialize)]
pub struct TokenChargeRequest {
    pub token: String,
    pub amount: Decimal,
    pub description: String,
    pub customer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenCharge {
    pub payment_id: String,
    /// Settled synchronously; otherwise the webhook confirms it later
    pub paid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PaymentEventType {
    #[serde(rename = "payment.completed")]
    PaymentCompleted,
    #[serde(rename = "payment.failed")]
    PaymentFailed,
    #[serde(rename = "subscription.renewed")]
    SubscriptionRenewed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentEventData {
    /// Payment id, or subscription id for subscription events
    pub payment_id: String,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// A verified webhook event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: PaymentEventType,
    pub data: PaymentEventData,
}

/// Verify a Standard Webhooks delivery and parse the event body
pub fn parse_signed_event(headers: &HeaderMap, body: &str, secret: &str) -> Result<WebhookEvent> {
    signing::verify_request(headers, body, secret, Utc::now())?;
    serde_json::from_str(body).map_err(|e| PaymentError::InvalidData(format!("malformed event: {e}")))
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted checkout for a one-time payment
    async fn create_one_time_charge(&self, request: &ChargeRequest) -> Result<ChargeCreated>;

    /// Create a subscription; the first period is paid through the returned checkout
    async fn create_subscription(&self, request: &SubscriptionRequest) -> Result<SubscriptionCreated>;

    /// Charge a saved payment method (one-click purchase)
    async fn charge_with_token(&self, request: &TokenChargeRequest) -> Result<TokenCharge>;

    /// Verify the signature of a webhook delivery and extract the event
    async fn validate_webhook(&self, headers: &HeaderMap, body: &str) -> Result<WebhookEvent>;
}
