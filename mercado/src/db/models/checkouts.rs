//! Database models for pending external payments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{CheckoutId, ContestId, ListingId, UserId};

/// What a completed payment buys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutKind {
    Credits,
    Subscription,
    Turbo,
    ContestEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStatus {
    Pending,
    Completed,
    Discarded,
}

#[derive(Debug, Clone)]
pub struct CheckoutCreateDBRequest {
    pub kind: CheckoutKind,
    /// Package, plan or boost type key; the contest id for entries
    pub item_key: String,
    pub amount: Decimal,
    pub credits: i64,
    pub user_id: Option<UserId>,
    pub email: String,
    pub listing_id: Option<ListingId>,
    pub contest_id: Option<ContestId>,
    /// Provider payment or subscription id
    pub payment_reference: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct CheckoutDBResponse {
    pub id: CheckoutId,
    pub kind: CheckoutKind,
    pub item_key: String,
    pub amount: Decimal,
    pub credits: i64,
    pub user_id: Option<UserId>,
    pub email: String,
    pub listing_id: Option<ListingId>,
    pub contest_id: Option<ContestId>,
    pub payment_reference: String,
    pub status: CheckoutStatus,
    pub status_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
