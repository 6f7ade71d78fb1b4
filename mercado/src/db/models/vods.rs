//! Database models for premium videos and their unlocks.

use crate::types::{TransactionId, UserId, VodId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct VodCreateDBRequest {
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub price_credits: i64,
    pub media_url: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct VodDBResponse {
    pub id: VodId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub price_credits: i64,
    pub media_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct VodUnlockDBResponse {
    pub vod_id: VodId,
    pub user_id: UserId,
    pub transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
}
