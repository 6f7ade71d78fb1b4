//! Database models for paid subscriptions.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::UserId;

#[derive(Debug, Clone)]
pub struct SubscriptionUpsertDBRequest {
    pub user_id: UserId,
    pub plan: String,
    pub provider_subscription_id: String,
    pub current_period_end: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionDBResponse {
    pub id: Uuid,
    pub user_id: UserId,
    pub plan: String,
    pub provider_subscription_id: String,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
