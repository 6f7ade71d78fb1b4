//! Database models for payout requests.

use crate::types::{PayoutRequestId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// `REQUESTED` is the only non-terminal status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Requested,
    Completed,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct PayoutRequestCreateDBRequest {
    pub provider_id: UserId,
    pub amount: Decimal,
    pub attached_amount: Decimal,
    pub method: String,
    pub details: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct PayoutRequestDBResponse {
    pub id: PayoutRequestId,
    pub provider_id: UserId,
    pub amount: Decimal,
    pub attached_amount: Decimal,
    pub method: String,
    pub details: String,
    pub status: PayoutStatus,
    pub processed_by: Option<UserId>,
    pub processed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
