//! Database models for the credit balance audit trail.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// What caused a balance change. Stored as TEXT.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditTransactionType {
    /// Credit pack bought through checkout
    Purchase,
    AdminGrant,
    AdminRemoval,
    BoostPurchase,
    VodUnlock,
    ListingFee,
}

/// Database request for appending an audit record.
#[derive(Debug, Clone)]
pub struct CreditTransactionCreateDBRequest {
    pub user_id: UserId,
    pub transaction_type: CreditTransactionType,
    /// Signed: positive for credits added, negative for credits spent
    pub amount: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    /// External payment id; unique when present
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CreditTransactionDBResponse {
    pub id: Uuid,
    pub user_id: UserId,
    pub transaction_type: CreditTransactionType,
    pub amount: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}
