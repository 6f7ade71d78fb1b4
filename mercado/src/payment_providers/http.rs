//! Hosted-checkout REST gateway.
//!
//! Speaks a small JSON API under `api_base`, authenticated with a bearer API key:
//!
//! - `POST charges` returns `{ "id", "checkout_url" }`
//! - `POST subscriptions` returns `{ "id", "checkout_url" }`
//! - `POST charges/token` returns `{ "id", "status": "succeeded" | "pending" | "failed", "failure_reason"? }`
//!
//! Amounts are decimal strings in the configured currency.

use async_trait::async_trait;
use axum::http::HeaderMap;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, error, instrument};
use url::Url;

use super::{
    ChargeCreated, ChargeRequest, PaymentError, PaymentProvider, Result, SubscriptionCreated, SubscriptionRequest, TokenCharge,
    TokenChargeRequest, WebhookEvent, parse_signed_event,
};
use crate::config::HttpPaymentConfig;

pub struct HttpProvider {
    client: Client,
    api_base: Url,
    api_key: String,
    webhook_secret: String,
    currency: String,
}

impl From<HttpPaymentConfig> for HttpProvider {
    fn from(config: HttpPaymentConfig) -> Self {
        let client = Client::builder().timeout(config.timeout).build().unwrap_or_default();
        Self {
            client,
            api_base: ensure_slash(&config.api_base),
            api_key: config.api_key,
            webhook_secret: config.webhook_secret,
            currency: config.currency,
        }
    }
}

/// `Url::join` replaces the last path segment unless the base ends in a slash
fn ensure_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[derive(Serialize)]
struct CurrencyAmount<'a, T: Serialize> {
    #[serde(flatten)]
    body: &'a T,
    currency: &'a str,
}

#[derive(Deserialize)]
struct CreatedResponse {
    id: String,
    checkout_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenChargeStatus {
    Succeeded,
    Pending,
    Failed,
}

#[derive(Deserialize)]
struct TokenChargeResponse {
    id: String,
    status: TokenChargeStatus,
    #[serde(default)]
    failure_reason: Option<String>,
}

impl HttpProvider {
    async fn post<B: Serialize, R: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<R> {
        let url = self
            .api_base
            .join(endpoint)
            .map_err(|e| PaymentError::ProviderApi(format!("invalid endpoint URL: {e}")))?;
        debug!("Payment gateway request to {}", url);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&CurrencyAmount {
                body,
                currency: &self.currency,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::InvalidData(format!("gateway rejected request ({status}): {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Payment gateway error {}: {}", status, body);
            return Err(PaymentError::ProviderApi(format!("HTTP {status}")));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| PaymentError::ProviderApi(format!("error decoding response body: {e}")))
    }
}

fn require_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidData("amount must be positive".to_string()));
    }
    Ok(())
}

#[async_trait]
impl PaymentProvider for HttpProvider {
    #[instrument(skip(self, request), fields(amount = %request.amount), err)]
    async fn create_one_time_charge(&self, request: &ChargeRequest) -> Result<ChargeCreated> {
        require_positive(request.amount)?;
        let created: CreatedResponse = self.post("charges", request).await?;
        Ok(ChargeCreated {
            payment_id: created.id,
            checkout_url: created.checkout_url,
        })
    }

    #[instrument(skip(self, request), fields(plan = %request.plan), err)]
    async fn create_subscription(&self, request: &SubscriptionRequest) -> Result<SubscriptionCreated> {
        require_positive(request.amount)?;
        let created: CreatedResponse = self.post("subscriptions", request).await?;
        Ok(SubscriptionCreated {
            subscription_id: created.id,
            checkout_url: created.checkout_url,
        })
    }

    #[instrument(skip(self, request), fields(amount = %request.amount), err)]
    async fn charge_with_token(&self, request: &TokenChargeRequest) -> Result<TokenCharge> {
        require_positive(request.amount)?;
        let charge: TokenChargeResponse = self.post("charges/token", request).await?;
        match charge.status {
            TokenChargeStatus::Succeeded => Ok(TokenCharge {
                payment_id: charge.id,
                paid: true,
            }),
            TokenChargeStatus::Pending => Ok(TokenCharge {
                payment_id: charge.id,
                paid: false,
            }),
            TokenChargeStatus::Failed => Err(PaymentError::Declined(
                charge.failure_reason.unwrap_or_else(|| "payment failed".to_string()),
            )),
        }
    }

    async fn validate_webhook(&self, headers: &HeaderMap, body: &str) -> Result<WebhookEvent> {
        parse_signed_event(headers, body, &self.webhook_secret)
    }
}
