//! Value-moving transaction views.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::transactions::{TransactionDBResponse, TransactionType},
    types::{ListingId, PayoutRequestId, TransactionId, UserId},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TransactionId,
    pub transaction_type: TransactionType,
    pub amount_credits: i64,
    #[schema(value_type = String)]
    pub amount_cash: Decimal,
    #[schema(value_type = String)]
    pub platform_fee: Decimal,
    #[schema(value_type = String)]
    pub provider_amount: Decimal,
    #[schema(value_type = String, format = "uuid")]
    pub provider_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub client_id: UserId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub listing_id: Option<ListingId>,
    /// Null while the amount is still owed to the provider
    #[schema(value_type = Option<String>, format = "uuid")]
    pub payout_request_id: Option<PayoutRequestId>,
    pub created_at: DateTime<Utc>,
}

impl From<TransactionDBResponse> for TransactionResponse {
    fn from(db: TransactionDBResponse) -> Self {
        Self {
            id: db.id,
            transaction_type: db.transaction_type,
            amount_credits: db.amount_credits,
            amount_cash: db.amount_cash,
            platform_fee: db.platform_fee,
            provider_amount: db.provider_amount,
            provider_id: db.provider_id,
            client_id: db.client_id,
            listing_id: db.listing_id,
            payout_request_id: db.payout_request_id,
            created_at: db.created_at,
        }
    }
}
