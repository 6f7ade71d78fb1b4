//! Database models for value-moving transactions (money owed to providers).

use crate::types::{ListingId, PayoutRequestId, TransactionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Premium video unlocked with credits
    VodUnlock,
}

#[derive(Debug, Clone)]
pub struct TransactionCreateDBRequest {
    pub transaction_type: TransactionType,
    pub amount_credits: i64,
    pub amount_cash: Decimal,
    pub platform_fee: Decimal,
    pub provider_amount: Decimal,
    pub provider_id: UserId,
    pub client_id: UserId,
    pub listing_id: Option<ListingId>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TransactionDBResponse {
    pub id: TransactionId,
    pub transaction_type: TransactionType,
    pub amount_credits: i64,
    pub amount_cash: Decimal,
    pub platform_fee: Decimal,
    pub provider_amount: Decimal,
    pub provider_id: UserId,
    pub client_id: UserId,
    pub listing_id: Option<ListingId>,
    /// `None` while unpaid
    pub payout_request_id: Option<PayoutRequestId>,
    pub created_at: DateTime<Utc>,
}

/// Platform-wide money totals for the admin report
#[derive(Debug, Clone, Default, FromRow)]
pub struct TransactionTotals {
    pub gross_cash: Decimal,
    pub platform_fees: Decimal,
    pub unpaid_cash: Decimal,
    pub requested_cash: Decimal,
}
