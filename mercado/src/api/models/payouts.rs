//! Payout request bodies and views.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::{PaginatedResponse, Pagination};
use crate::{
    db::models::payouts::{PayoutRequestDBResponse, PayoutStatus},
    ledger::payouts::PayoutInput,
    types::{PayoutRequestId, UserId},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayoutRequestCreate {
    #[schema(value_type = String, example = "50.00")]
    pub amount: Decimal,
    /// e.g. "bank_transfer", "mbway"
    pub method: String,
    /// IBAN, phone number or similar
    #[serde(default)]
    pub details: String,
}

impl From<PayoutRequestCreate> for PayoutInput {
    fn from(request: PayoutRequestCreate) -> Self {
        Self {
            amount: request.amount,
            method: request.method,
            details: request.details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayoutResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PayoutRequestId,
    #[schema(value_type = String, format = "uuid")]
    pub provider_id: UserId,
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// Sum of the transactions covered; may fall short of `amount`
    #[schema(value_type = String)]
    pub attached_amount: Decimal,
    pub method: String,
    pub details: String,
    pub status: PayoutStatus,
    pub rejection_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<PayoutRequestDBResponse> for PayoutResponse {
    fn from(db: PayoutRequestDBResponse) -> Self {
        Self {
            id: db.id,
            provider_id: db.provider_id,
            amount: db.amount,
            attached_amount: db.attached_amount,
            method: db.method,
            details: db.details,
            status: db.status,
            rejection_reason: db.rejection_reason,
            processed_at: db.processed_at,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayoutOverview {
    /// Cash owed and not yet attached to any payout request
    #[schema(value_type = String)]
    pub available_balance: Decimal,
    pub requests: PaginatedResponse<PayoutResponse>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListPayoutsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub status: Option<PayoutStatus>,
}
