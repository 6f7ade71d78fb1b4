//! Database models for classified listings.

use crate::types::{ListingId, Locale, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Moderation status. Only `PENDING` listings may be approved or rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct ListingCreateDBRequest {
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub price: Option<Decimal>,
    pub category: String,
    pub locale: Locale,
}

#[derive(Debug, Clone, FromRow)]
pub struct ListingDBResponse {
    pub id: ListingId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub price: Option<Decimal>,
    pub category: String,
    pub locale: Locale,
    pub status: ListingStatus,
    pub moderation_note: Option<String>,
    pub moderated_by: Option<UserId>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Has a boost that is flagged active and has not reached its end date
    pub is_boosted: bool,
}
