//! Credit balance and audit trail views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::pagination::PaginatedResponse;
use crate::db::models::credits::{CreditTransactionDBResponse, CreditTransactionType};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditTransactionResponse {
    pub id: Uuid,
    pub transaction_type: CreditTransactionType,
    /// Signed: negative for debits
    pub amount: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransactionDBResponse> for CreditTransactionResponse {
    fn from(db: CreditTransactionDBResponse) -> Self {
        Self {
            id: db.id,
            transaction_type: db.transaction_type,
            amount: db.amount,
            balance_after: db.balance_after,
            description: db.description,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditsResponse {
    pub balance: i64,
    pub history: PaginatedResponse<CreditTransactionResponse>,
}

/// Admin balance adjustment. Positive grants, negative removes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditAdjustment {
    pub amount: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub balance: i64,
}
