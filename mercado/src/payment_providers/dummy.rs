//! Dummy payment provider.
//!
//! Hands out references without contacting anyone; the "checkout" redirects straight back to
//! the success URL. Payments still only complete through a signed webhook, which development
//! tooling can produce with [`super::signing::signed_headers`].

use async_trait::async_trait;
use axum::http::HeaderMap;
use tracing::info;
use uuid::Uuid;

use super::{
    ChargeCreated, ChargeRequest, PaymentError, PaymentProvider, Result, SubscriptionCreated, SubscriptionRequest, TokenCharge,
    TokenChargeRequest, WebhookEvent, parse_signed_event,
};
use crate::config::DummyPaymentConfig;

/// Token that the dummy provider always declines
pub const DECLINED_TOKEN: &str = "tok_declined";

pub struct DummyProvider {
    webhook_secret: String,
}

impl From<DummyPaymentConfig> for DummyProvider {
    fn from(config: DummyPaymentConfig) -> Self {
        Self {
            webhook_secret: config.webhook_secret,
        }
    }
}

fn with_reference(url: &str, key: &str, reference: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{key}={reference}")
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    async fn create_one_time_charge(&self, request: &ChargeRequest) -> Result<ChargeCreated> {
        let payment_id = format!("dummy_pay_{}", Uuid::new_v4().simple());
        info!("Dummy provider created charge {} for {}", payment_id, request.amount);
        Ok(ChargeCreated {
            checkout_url: with_reference(&request.success_url, "payment_id", &payment_id),
            payment_id,
        })
    }

    async fn create_subscription(&self, request: &SubscriptionRequest) -> Result<SubscriptionCreated> {
        let subscription_id = format!("dummy_sub_{}", Uuid::new_v4().simple());
        info!("Dummy provider created subscription {} for plan {}", subscription_id, request.plan);
        Ok(SubscriptionCreated {
            checkout_url: with_reference(&request.success_url, "subscription_id", &subscription_id),
            subscription_id,
        })
    }

    async fn charge_with_token(&self, request: &TokenChargeRequest) -> Result<TokenCharge> {
        if request.token == DECLINED_TOKEN {
            return Err(PaymentError::Declined("card declined".to_string()));
        }
        Ok(TokenCharge {
            payment_id: format!("dummy_pay_{}", Uuid::new_v4().simple()),
            paid: true,
        })
    }

    async fn validate_webhook(&self, headers: &HeaderMap, body: &str) -> Result<WebhookEvent> {
        parse_signed_event(headers, body, &self.webhook_secret)
    }
}
