//! Database models for contests (paid-entry raffles) and their entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::types::{ContestId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone)]
pub struct ContestCreateDBRequest {
    pub creator_id: UserId,
    pub title: String,
    pub description: String,
    pub prize: String,
    pub total_slots: i32,
    pub slot_price: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct ContestDBResponse {
    pub id: ContestId,
    pub creator_id: UserId,
    pub title: String,
    pub description: String,
    pub prize: String,
    pub total_slots: i32,
    pub slot_price: Decimal,
    pub status: ContestStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ContestEntryDBResponse {
    pub id: Uuid,
    pub contest_id: ContestId,
    pub participant_id: UserId,
    pub payment_reference: String,
    pub is_winner: bool,
    pub created_at: DateTime<Utc>,
}
