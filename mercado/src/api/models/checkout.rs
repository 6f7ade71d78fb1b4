//! Checkout bodies: purchases paid through the external payment processor.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{db::models::checkouts::CheckoutStatus, types::ListingId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditsCheckoutRequest {
    /// Key in the credit package catalog
    pub package: String,
    /// Required for guests; ignored when signed in
    pub email: Option<String>,
    /// Saved payment method; charges immediately instead of redirecting
    pub payment_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProCheckoutRequest {
    pub plan: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TurboCheckoutRequest {
    #[schema(value_type = String, format = "uuid")]
    pub listing_id: ListingId,
    pub boost_type: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    /// Where to send the buyer; absent for one-click charges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    pub status: Option<CheckoutStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}
